//! CLI-specific error types and exit codes.

use prefill_core::paths::PathError;
use prefill_core::{PrefillError, StoreError, TransportError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Nothing to prefill, detected before any network connection.
    #[error(
        "No apps selected. Run `steam-prefill select-apps --add <ids>`, or pass --all or --recent"
    )]
    NothingSelected,

    /// Pipeline error (session, catalog or download).
    #[error(transparent)]
    Prefill(#[from] PrefillError),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CliError {
    /// Map error to the process exit code.
    ///
    /// - 1: validation failure or pipeline error
    /// - 74: IO error (EX_IOERR)
    /// - 78: configuration error (EX_CONFIG)
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::NothingSelected | Self::Prefill(_) => 1,
            Self::Io(_) => 74,
            Self::Config(_) => 78,
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self::Prefill(err.into())
    }
}

impl From<TransportError> for CliError {
    fn from(err: TransportError) -> Self {
        Self::Prefill(err.into())
    }
}

impl From<PathError> for CliError {
    fn from(err: PathError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
