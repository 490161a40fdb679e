//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the prefill pipeline expects from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No `reqwest` or filesystem types in any signature
//! - Transports map their failures to `TransportError` / `ChunkFetchError`
//! - Stores map their failures to `StoreError`

mod cdn;
mod credentials;
mod prompt;
mod selected_apps;
mod session_transport;
mod version_record;

pub use cdn::{CacheEndpoint, CacheProbe, CdnTransport};
pub use credentials::CredentialStore;
pub use prompt::InteractivePrompt;
pub use selected_apps::SelectedAppsRepository;
pub use session_transport::SessionTransport;
pub use version_record::VersionRecordRepository;
