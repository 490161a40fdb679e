//! Terminal implementation of the interactive prompt port.

use async_trait::async_trait;

use prefill_core::{InteractivePrompt, PrefillError};

use super::input::prompt_string;

/// Reads credentials and guard codes from stdin.
///
/// Reads block, so each one runs on the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

async fn ask(prompt: String) -> Result<String, PrefillError> {
    tokio::task::spawn_blocking(move || prompt_string(&prompt))
        .await
        .map_err(|e| PrefillError::Prompt(e.to_string()))?
        .map_err(|e| PrefillError::Prompt(format!("{e:#}")))
}

#[async_trait]
impl InteractivePrompt for TerminalPrompt {
    async fn read_username(&self) -> Result<String, PrefillError> {
        loop {
            let username = ask("Steam username".to_string()).await?;
            if !username.is_empty() {
                return Ok(username);
            }
        }
    }

    async fn read_secret(&self, prompt: &str) -> Result<String, PrefillError> {
        ask(prompt.to_string()).await
    }

    async fn read_code(&self, prompt: &str) -> Result<String, PrefillError> {
        ask(prompt.to_string())
            .await
            .map(|code| code.to_ascii_uppercase())
    }
}
