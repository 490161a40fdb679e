//! Credential store port.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::session::Account;

/// Persists the account used for logon.
///
/// Holds the username, the cached session key and machine-auth tokens.
/// Passwords are never stored.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the saved account, or an empty one if nothing is saved.
    async fn load_account(&self) -> Result<Account, StoreError>;

    async fn save(&self, account: &Account) -> Result<(), StoreError>;
}
