//! A single chunk to fetch.

use serde::{Deserialize, Serialize};

use super::ids::{AppId, ChunkId, DepotId, ManifestId};
use super::manifest::ChunkData;

/// One chunk in a download plan.
///
/// Created when manifests are flattened into a plan and dropped once the
/// chunk is on disk or its retry budget is spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRequest {
    pub app_id: AppId,
    pub depot_id: DepotId,
    pub manifest_id: ManifestId,
    pub chunk_id: ChunkId,
    pub compressed_length: u64,
    /// Reason for the most recent failed attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<String>,
}

impl QueuedRequest {
    pub fn new(
        app_id: AppId,
        depot_id: DepotId,
        manifest_id: ManifestId,
        chunk: &ChunkData,
    ) -> Self {
        Self {
            app_id,
            depot_id,
            manifest_id,
            chunk_id: chunk.id.clone(),
            compressed_length: chunk.compressed_length,
            last_failure: None,
        }
    }

    /// Record why the latest attempt failed.
    pub fn record_failure(&mut self, reason: impl Into<String>) {
        self.last_failure = Some(reason.into());
    }
}
