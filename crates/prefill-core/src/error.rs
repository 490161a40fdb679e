//! Error taxonomy for the prefill pipeline.
//!
//! Errors split into two classes. Identity and connection errors stop the
//! whole process, since nothing can proceed without a session. Content-fetch
//! errors are retried per chunk and only ever fail the app they belong to.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AppId, ChunkId, DepotId};
use crate::session::ResultCode;

/// Convenience result type for pipeline operations.
pub type PrefillResult<T> = Result<T, PrefillError>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum PrefillError {
    /// The transport did not report a connection before the deadline.
    #[error("Timed out after {seconds}s waiting for a connection")]
    ConnectionTimeout { seconds: u64 },

    /// Credentials were rejected too many times.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The cached session key was rejected; a password is required.
    #[error("Session key for '{username}' has expired")]
    SessionExpired { username: String },

    /// Logon ended with a non-retryable result.
    #[error("Logon failed: {result}")]
    LoginFailed { result: ResultCode },

    /// An operation that requires an authenticated session was attempted without one.
    #[error("Not logged on")]
    NotLoggedOn,

    /// The owned-license enumeration failed or never arrived.
    #[error("License query failed: {0}")]
    LicenseQueryFailed(String),

    /// Every CDN endpoint is failing; the distribution network is unreachable.
    #[error("No CDN servers available")]
    NoServersAvailable,

    /// A chunk exhausted its retry budget.
    #[error("Chunk {chunk_id} of depot {depot_id} failed: {reason}")]
    ChunkFetchFailed {
        depot_id: DepotId,
        chunk_id: ChunkId,
        reason: String,
    },

    /// The LAN cache itself cannot be reached.
    #[error("Lancache unreachable: {0}")]
    CacheUnreachable(String),

    /// Pending chunks waited on cooling servers longer than allowed.
    #[error("Retry loop detected: {pending} chunks stalled {stalled_secs}s waiting for a content server")]
    InfiniteRetryLoop { pending: usize, stalled_secs: u64 },

    /// App metadata or manifest could not be resolved.
    #[error("Metadata for app {app_id} unavailable: {message}")]
    Metadata { app_id: AppId, message: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(String),

    /// Interactive input could not be read.
    #[error("Prompt failed: {0}")]
    Prompt(String),
}

impl PrefillError {
    pub fn metadata(app_id: AppId, message: impl Into<String>) -> Self {
        Self::Metadata {
            app_id,
            message: message.into(),
        }
    }

    /// Whether this error must abort a multi-app run instead of failing one app.
    pub const fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoServersAvailable
                | Self::CacheUnreachable(_)
                | Self::InfiniteRetryLoop { .. }
                | Self::ConnectionTimeout { .. }
                | Self::AuthenticationFailed(_)
                | Self::LoginFailed { .. }
                | Self::NotLoggedOn
                | Self::LicenseQueryFailed(_)
        )
    }
}

impl From<std::io::Error> for PrefillError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Why a single chunk attempt failed.
///
/// Serializable so the reason can be recorded on the queued request.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChunkFetchError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    #[error("connection error: {0}")]
    Connection(String),

    /// The request never reached the LAN cache.
    #[error("cache unreachable: {0}")]
    CacheUnreachable(String),

    /// No endpoint could be handed out for this attempt.
    #[error("no CDN servers available")]
    NoServers,

    #[error("write failed: {0}")]
    Io(String),
}

impl ChunkFetchError {
    /// Whether another attempt against a different endpoint may succeed.
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::CacheUnreachable(_) | Self::NoServers)
    }
}

/// Errors raised by session and CDN transports.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request to {url} failed with status {status}")]
    Status { status: u16, url: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    /// The transport has no open connection.
    #[error("Transport is not connected")]
    NotConnected,
}

/// Errors raised by persistence adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error at {path}: {reason}")]
    Storage { path: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_fatal_classification() {
        assert!(PrefillError::NoServersAvailable.is_run_fatal());
        assert!(PrefillError::CacheUnreachable("dns".into()).is_run_fatal());
        assert!(
            PrefillError::InfiniteRetryLoop {
                pending: 4,
                stalled_secs: 900
            }
            .is_run_fatal()
        );
        assert!(!PrefillError::metadata(AppId(730), "missing").is_run_fatal());
        assert!(
            !PrefillError::ChunkFetchFailed {
                depot_id: DepotId(731),
                chunk_id: ChunkId::new("aa"),
                reason: "timeout".into(),
            }
            .is_run_fatal()
        );
    }

    #[test]
    fn chunk_errors_are_retryable_except_fatal_ones() {
        assert!(ChunkFetchError::Timeout.is_retryable());
        assert!(ChunkFetchError::Status(503).is_retryable());
        assert!(
            ChunkFetchError::LengthMismatch {
                expected: 10,
                actual: 3
            }
            .is_retryable()
        );
        assert!(!ChunkFetchError::CacheUnreachable("refused".into()).is_retryable());
        assert!(!ChunkFetchError::NoServers.is_retryable());
    }

    #[test]
    fn chunk_error_round_trips_through_json() {
        let err = ChunkFetchError::LengthMismatch {
            expected: 1024,
            actual: 512,
        };
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(serde_json::from_str::<ChunkFetchError>(&json).unwrap(), err);
    }
}
