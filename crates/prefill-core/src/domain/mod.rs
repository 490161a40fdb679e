//! Domain types for the prefill pipeline.
//!
//! These are pure data types with no infrastructure dependencies.

mod app;
mod ids;
mod manifest;
mod request;
mod version;

pub use app::{AppMetadata, AppType, Architecture, Depot, OperatingSystem, PlatformFilter};
pub use ids::{AppId, ChunkId, DepotId, ManifestId};
pub use manifest::{ChunkData, FileEntry, Manifest};
pub use request::QueuedRequest;
pub use version::VersionRecord;
