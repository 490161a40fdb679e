//! Public configuration for the Steam HTTP adapters.

use std::time::Duration;

/// Default address of the session gateway.
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:27080";

/// Hostname the LAN cache answers for when it intercepts Steam content.
pub const DEFAULT_LANCACHE_HOST: &str = "lancache.steamcontent.com";

/// Configuration for the gateway transport and the CDN client.
///
/// # Example
///
/// ```
/// use prefill_steam::SteamClientConfig;
/// use std::time::Duration;
///
/// let config = SteamClientConfig::new()
///     .with_gateway_url("http://10.0.0.5:27080")
///     .with_timeout(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct SteamClientConfig {
    pub(crate) gateway_url: String,
    pub(crate) user_agent: String,
    /// Per-request timeout for HTTP calls
    pub(crate) timeout: Duration,
    /// Content cell override
    pub(crate) cell_id: Option<u32>,
    pub(crate) lancache_host: String,
}

impl Default for SteamClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            user_agent: concat!("steam-prefill/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            cell_id: None,
            lancache_host: DEFAULT_LANCACHE_HOST.to_string(),
        }
    }
}

impl SteamClientConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session gateway base URL.
    ///
    /// Defaults to [`DEFAULT_GATEWAY_URL`].
    #[must_use]
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    ///
    /// Defaults to 30 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pin the content cell instead of using the one assigned at logon.
    #[must_use]
    pub const fn with_cell_id(mut self, cell_id: Option<u32>) -> Self {
        self.cell_id = cell_id;
        self
    }

    /// Set the hostname probed for the LAN cache.
    #[must_use]
    pub fn with_lancache_host(mut self, host: impl Into<String>) -> Self {
        self.lancache_host = host.into();
        self
    }

    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    pub const fn cell_id(&self) -> Option<u32> {
        self.cell_id
    }

    pub fn lancache_host(&self) -> &str {
        &self.lancache_host
    }
}
