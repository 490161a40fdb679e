//! JSON implementation of the `CredentialStore` trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use prefill_core::{Account, CredentialStore, StoreError};

use crate::json_file;

/// Stores the account in `<dataDir>/account.json`.
pub struct JsonCredentialStore {
    path: PathBuf,
}

impl JsonCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for JsonCredentialStore {
    async fn load_account(&self) -> Result<Account, StoreError> {
        let account = json_file::read_optional(&self.path).await?;
        Ok(account.unwrap_or_default())
    }

    async fn save(&self, account: &Account) -> Result<(), StoreError> {
        json_file::write_atomic(&self.path, account).await?;
        debug!(target: "prefill.store", path = %self.path.display(), "Saved account");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_without_file_returns_empty_account() {
        let temp = tempfile::tempdir().unwrap();
        let store = JsonCredentialStore::new(temp.path().join("account.json"));

        let account = store.load_account().await.unwrap();
        assert_eq!(account, Account::default());
    }

    #[tokio::test]
    async fn saved_account_is_reloaded() {
        let temp = tempfile::tempdir().unwrap();
        let store = JsonCredentialStore::new(temp.path().join("account.json"));

        let mut account = Account {
            username: Some("gabe".to_string()),
            session_key: Some("key-1".to_string()),
            ..Account::default()
        };
        account
            .sentry_tokens
            .insert("gabe".to_string(), "sentry".to_string());
        store.save(&account).await.unwrap();

        let reopened = JsonCredentialStore::new(store.path());
        assert_eq!(reopened.load_account().await.unwrap(), account);
    }

    #[tokio::test]
    async fn cleared_session_key_is_persisted() {
        let temp = tempfile::tempdir().unwrap();
        let store = JsonCredentialStore::new(temp.path().join("account.json"));

        let mut account = Account {
            username: Some("gabe".to_string()),
            session_key: Some("stale".to_string()),
            ..Account::default()
        };
        store.save(&account).await.unwrap();

        account.session_key = None;
        store.save(&account).await.unwrap();

        assert!(store.load_account().await.unwrap().session_key.is_none());
    }
}
