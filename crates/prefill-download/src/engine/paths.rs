//! On-disk chunk cache.
//!
//! Chunks live at `<cache>/Depots/<depot>/<chunk>.bin`. Writes go to a
//! `.part` sibling first and are renamed into place, so a chunk file that
//! exists always holds a complete payload.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use prefill_core::paths::chunk_path;
use prefill_core::{ChunkFetchError, QueuedRequest};

/// Final location of a request's chunk.
pub fn chunk_file(cache_root: &Path, request: &QueuedRequest) -> PathBuf {
    chunk_path(cache_root, request.depot_id, &request.chunk_id)
}

/// Whether the chunk is already on disk with its expected length.
pub async fn is_cached(cache_root: &Path, request: &QueuedRequest) -> bool {
    fs::metadata(chunk_file(cache_root, request))
        .await
        .is_ok_and(|meta| meta.is_file() && meta.len() == request.compressed_length)
}

/// Write a chunk payload into the cache.
pub async fn write_chunk(
    cache_root: &Path,
    request: &QueuedRequest,
    payload: &[u8],
) -> Result<PathBuf, ChunkFetchError> {
    let path = chunk_file(cache_root, request);
    let io = |e: std::io::Error| ChunkFetchError::Io(format!("{}: {e}", path.display()));

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(io)?;
    }

    let partial = path.with_extension("bin.part");
    let mut file = fs::File::create(&partial).await.map_err(io)?;
    file.write_all(payload).await.map_err(io)?;
    file.flush().await.map_err(io)?;
    drop(file);

    fs::rename(&partial, &path).await.map_err(io)?;
    Ok(path)
}
