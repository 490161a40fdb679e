//! Interactive input port.

use async_trait::async_trait;

use crate::error::PrefillError;

/// Source of credentials and one-time codes typed by the user.
///
/// The session never reads from a terminal directly.
#[async_trait]
pub trait InteractivePrompt: Send + Sync {
    async fn read_username(&self) -> Result<String, PrefillError>;

    /// Read a secret such as a password.
    async fn read_secret(&self, prompt: &str) -> Result<String, PrefillError>;

    /// Read a one-time code (two-factor or email guard).
    async fn read_code(&self, prompt: &str) -> Result<String, PrefillError>;
}
