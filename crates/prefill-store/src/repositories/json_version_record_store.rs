//! JSON implementation of the `VersionRecordRepository` trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use prefill_core::{StoreError, VersionRecord, VersionRecordRepository};

use crate::json_file;

/// Stores the depot version record in
/// `<cacheDir>/successfullyDownloadedDepots.json` as a `{depotId: manifestId}` map.
pub struct JsonVersionRecordStore {
    path: PathBuf,
}

impl JsonVersionRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl VersionRecordRepository for JsonVersionRecordStore {
    async fn load(&self) -> Result<VersionRecord, StoreError> {
        let record = json_file::read_optional(&self.path).await?;
        Ok(record.unwrap_or_default())
    }

    async fn save(&self, record: &VersionRecord) -> Result<(), StoreError> {
        json_file::write_atomic(&self.path, record).await?;
        debug!(
            target: "prefill.store",
            depots = record.len(),
            "Saved version record"
        );
        Ok(())
    }
}
