//! Selected apps repository port.

use async_trait::async_trait;

use crate::domain::AppId;
use crate::error::StoreError;

/// The user's ordered selection of apps to prefill.
#[async_trait]
pub trait SelectedAppsRepository: Send + Sync {
    /// Load the selection in saved order. Empty if nothing is saved.
    async fn load(&self) -> Result<Vec<AppId>, StoreError>;

    /// Replace the selection. Duplicates are dropped, first occurrence wins.
    async fn save(&self, apps: &[AppId]) -> Result<(), StoreError>;
}
