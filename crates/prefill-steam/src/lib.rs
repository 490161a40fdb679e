//! Steam session, CDN server pool and catalog for steam-prefill.
//!
//! - [`SessionClient`] - connect/logon state machine over a [`SessionTransport`](prefill_core::SessionTransport)
//! - [`ServerPool`] - ranked CDN endpoints with failure cool-down
//! - [`CatalogResolver`] - memoized app metadata and manifests
//! - Adapters: [`GatewayTransport`], [`ReqwestCdnClient`], [`DnsCacheProbe`]

#![deny(unsafe_code)]

mod catalog;
mod cdn;
mod config;
mod gateway;
mod http;
mod pool;
mod probe;
mod session;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// ============================================================================
// Public API
// ============================================================================

pub use catalog::{CatalogResolver, MANIFEST_FAILOVER_ATTEMPTS};
pub use cdn::{JsonManifestDecoder, ManifestDecoder, ReqwestCdnClient};
pub use config::{DEFAULT_GATEWAY_URL, DEFAULT_LANCACHE_HOST, SteamClientConfig};
pub use gateway::GatewayTransport;
pub use pool::{DEFAULT_COOLDOWN, ServerPool};
pub use probe::{DnsCacheProbe, is_lan_address};
pub use session::{LogonResult, MAX_PASSWORD_ATTEMPTS, SessionClient, SessionTimeouts};

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
