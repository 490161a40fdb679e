//! Composition utilities for building the JSON-backed stores.
//!
//! Construction only; no domain logic.

use std::path::Path;
use std::sync::Arc;

use prefill_core::paths::{ACCOUNT_FILE, SELECTED_APPS_FILE, VERSION_RECORD_FILE};
use prefill_core::{CredentialStore, SelectedAppsRepository, VersionRecordRepository};

use crate::repositories::{JsonCredentialStore, JsonSelectedAppsStore, JsonVersionRecordStore};

/// Trait-object-wrapped stores, ready to hand to the session and orchestrator.
#[derive(Clone)]
pub struct Stores {
    pub credentials: Arc<dyn CredentialStore>,
    pub version_record: Arc<dyn VersionRecordRepository>,
    pub selected_apps: Arc<dyn SelectedAppsRepository>,
}

/// Factory for the JSON store set.
pub struct StoreFactory;

impl StoreFactory {
    /// Build all stores.
    ///
    /// * `data_root` - holds the account and the app selection
    /// * `cache_root` - holds the version record, next to the chunk files it describes
    pub fn build(data_root: &Path, cache_root: &Path) -> Stores {
        Stores {
            credentials: Arc::new(JsonCredentialStore::new(data_root.join(ACCOUNT_FILE))),
            version_record: Arc::new(JsonVersionRecordStore::new(
                cache_root.join(VERSION_RECORD_FILE),
            )),
            selected_apps: Arc::new(JsonSelectedAppsStore::new(
                data_root.join(SELECTED_APPS_FILE),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prefill_core::{Account, AppId};

    #[tokio::test]
    async fn stores_write_to_their_roots() {
        let data = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        let stores = StoreFactory::build(data.path(), cache.path());

        stores.credentials.save(&Account::default()).await.unwrap();
        stores
            .version_record
            .save(&prefill_core::VersionRecord::new())
            .await
            .unwrap();
        stores.selected_apps.save(&[AppId(730)]).await.unwrap();

        assert!(data.path().join(ACCOUNT_FILE).is_file());
        assert!(data.path().join(SELECTED_APPS_FILE).is_file());
        assert!(cache.path().join(VERSION_RECORD_FILE).is_file());
    }
}
