//! Shared reqwest plumbing for the gateway and CDN adapters.
//!
//! reqwest types stay inside this crate; failures leave as `TransportError`.

use reqwest::{Client, Response};

use prefill_core::TransportError;

use crate::config::SteamClientConfig;

/// Build the HTTP client both adapters share.
pub fn build_client(config: &SteamClientConfig) -> Result<Client, TransportError> {
    Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| TransportError::Network(format!("failed to create HTTP client: {e}")))
}

pub fn network_error(err: &reqwest::Error) -> TransportError {
    if err.is_decode() {
        TransportError::Decode(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

/// Pass 2xx responses through; anything else becomes `TransportError::Status`.
pub fn ensure_success(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(TransportError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}
