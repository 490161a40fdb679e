//! Core domain types and port definitions for steam-prefill.
//!
//! This crate has no network or filesystem adapters. It defines:
//!
//! - `domain` - apps, depots, manifests, queued chunk requests, version records
//! - `session` - connection states, server-pushed events and logon outcomes
//! - `ports` - traits implemented by adapter crates (`prefill-steam`, `prefill-store`)
//! - `error` - the error taxonomy shared by every crate
//! - `config` - run configuration and its defaults
//! - `paths` - data/cache directory resolution and the chunk cache layout

pub mod config;
pub mod domain;
pub mod error;
pub mod paths;
pub mod ports;
pub mod session;

// Re-export commonly used types for convenience
pub use config::PrefillConfig;
pub use domain::{
    AppId, AppMetadata, AppType, Architecture, ChunkData, ChunkId, Depot, DepotId, FileEntry,
    Manifest, ManifestId, OperatingSystem, PlatformFilter, QueuedRequest, VersionRecord,
};
pub use error::{ChunkFetchError, PrefillError, PrefillResult, StoreError, TransportError};
pub use ports::{
    CacheEndpoint, CacheProbe, CdnTransport, CredentialStore, InteractivePrompt,
    SelectedAppsRepository, SessionTransport, VersionRecordRepository,
};
pub use session::{
    Account, CdnServer, ConnectionState, LogonDetails, MachineAuthAck, ResultCode, SessionEvent,
};
