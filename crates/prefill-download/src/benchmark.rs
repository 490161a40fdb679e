//! Portable benchmark workloads.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use prefill_core::paths::BENCHMARK_FILE;
use prefill_core::{AppId, PrefillError, PrefillResult, QueuedRequest, StoreError};

/// A frozen chunk plan that can be replayed against a cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkWorkload {
    pub created_at: DateTime<Utc>,
    pub app_ids: Vec<AppId>,
    pub requests: Vec<QueuedRequest>,
    /// Sum of compressed lengths of `requests`.
    pub total_bytes: u64,
}

impl BenchmarkWorkload {
    pub fn new(app_ids: Vec<AppId>, requests: Vec<QueuedRequest>) -> Self {
        let total_bytes = requests.iter().map(|r| r.compressed_length).sum();
        Self {
            created_at: Utc::now(),
            app_ids,
            requests,
            total_bytes,
        }
    }

    /// Where the workload lives inside a cache directory.
    pub fn default_path(cache_root: &Path) -> PathBuf {
        cache_root.join(BENCHMARK_FILE)
    }

    pub async fn save(&self, path: &Path) -> PrefillResult<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, json).await?;
        Ok(())
    }

    pub async fn load(path: &Path) -> PrefillResult<Self> {
        let bytes = fs::read(path).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| PrefillError::Storage(StoreError::Serialization(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::chunk;
    use prefill_core::{DepotId, ManifestId};
    use tempfile::TempDir;

    #[tokio::test]
    async fn workload_survives_a_save_and_load() {
        let dir = TempDir::new().unwrap();
        let requests = vec![
            QueuedRequest::new(AppId(730), DepotId(731), ManifestId(1), &chunk("aa", 100)),
            QueuedRequest::new(AppId(730), DepotId(731), ManifestId(1), &chunk("bb", 28)),
        ];
        let workload = BenchmarkWorkload::new(vec![AppId(730)], requests);
        assert_eq!(workload.total_bytes, 128);

        let path = BenchmarkWorkload::default_path(dir.path());
        workload.save(&path).await.unwrap();

        assert!(path.ends_with("benchmark.json"));
        assert_eq!(BenchmarkWorkload::load(&path).await.unwrap(), workload);
    }
}
