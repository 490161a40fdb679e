//! Shared read/write helpers for JSON documents on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use prefill_core::StoreError;
use serde::Serialize;
use serde::de::DeserializeOwned;

fn storage_error(path: &Path, err: impl std::fmt::Display) -> StoreError {
    StoreError::Storage {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Read a document, returning `None` if the file does not exist.
///
/// An empty file is treated the same as a missing one.
pub async fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(storage_error(path, e)),
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))
}

/// Replace a document atomically.
///
/// The value is written to a sibling temp file which is then renamed over
/// the target, so readers see either the old document or the new one.
pub async fn write_atomic<T: Serialize + Sync>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| storage_error(parent, e))?;
    }

    let tmp = temp_path(path);
    tokio::fs::write(&tmp, &json)
        .await
        .map_err(|e| storage_error(&tmp, e))?;

    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(storage_error(path, e));
    }

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let temp = tempfile::tempdir().unwrap();
        let value: Option<BTreeMap<String, u32>> =
            read_optional(&temp.path().join("absent.json")).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn write_creates_parent_and_leaves_no_temp_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested").join("doc.json");

        write_atomic(&path, &vec![1u32, 2, 3]).await.unwrap();

        let read: Option<Vec<u32>> = read_optional(&path).await.unwrap();
        assert_eq!(read, Some(vec![1, 2, 3]));
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn corrupt_document_is_a_serialization_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();

        let result: Result<Option<Vec<u32>>, _> = read_optional(&path).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
