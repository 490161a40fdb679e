//! JSON implementation of the `SelectedAppsRepository` trait.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use prefill_core::{AppId, SelectedAppsRepository, StoreError};

use crate::json_file;

/// Stores the selection in `<dataDir>/selectedAppsToPrefill.json` as a JSON array.
pub struct JsonSelectedAppsStore {
    path: PathBuf,
}

impl JsonSelectedAppsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn dedup_in_order(apps: &[AppId]) -> Vec<AppId> {
    let mut seen = HashSet::with_capacity(apps.len());
    apps.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[async_trait]
impl SelectedAppsRepository for JsonSelectedAppsStore {
    async fn load(&self) -> Result<Vec<AppId>, StoreError> {
        let apps: Option<Vec<AppId>> = json_file::read_optional(&self.path).await?;
        Ok(apps.map(|a| dedup_in_order(&a)).unwrap_or_default())
    }

    async fn save(&self, apps: &[AppId]) -> Result<(), StoreError> {
        let apps = dedup_in_order(apps);
        json_file::write_atomic(&self.path, &apps).await?;
        debug!(target: "prefill.store", count = apps.len(), "Saved app selection");
        Ok(())
    }
}
