//! Version record repository port.

use async_trait::async_trait;

use crate::domain::VersionRecord;
use crate::error::StoreError;

/// Durable storage for the depot version record.
///
/// `save` must replace the stored record atomically: a reader never
/// observes a partially written record.
#[async_trait]
pub trait VersionRecordRepository: Send + Sync {
    /// Load the record, or an empty one if nothing is stored yet.
    async fn load(&self) -> Result<VersionRecord, StoreError>;

    async fn save(&self, record: &VersionRecord) -> Result<(), StoreError>;
}
