//! CDN and lancache ports.

use std::net::IpAddr;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{DepotId, Manifest, ManifestId, QueuedRequest};
use crate::error::{ChunkFetchError, PrefillError, TransportError};
use crate::session::CdnServer;

/// Content transport for manifests and chunks.
#[async_trait]
pub trait CdnTransport: Send + Sync {
    /// Fetch and decode a depot manifest from `server`.
    async fn fetch_manifest(
        &self,
        server: &CdnServer,
        depot_id: DepotId,
        manifest_id: ManifestId,
    ) -> Result<Manifest, TransportError>;

    /// Fetch the raw bytes of one chunk from `server`.
    async fn fetch_chunk(
        &self,
        server: &CdnServer,
        request: &QueuedRequest,
    ) -> Result<Bytes, ChunkFetchError>;
}

/// Where the LAN cache answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEndpoint {
    pub address: IpAddr,
}

/// Checks that a LAN cache is reachable before any content is requested.
#[async_trait]
pub trait CacheProbe: Send + Sync {
    /// Returns the cache address, or `PrefillError::CacheUnreachable`.
    async fn probe(&self) -> Result<CacheEndpoint, PrefillError>;
}
