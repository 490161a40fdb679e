//! LAN cache detection.

use std::net::IpAddr;

use async_trait::async_trait;
use tracing::{debug, info};

use prefill_core::{CacheEndpoint, CacheProbe, PrefillError};

use crate::config::SteamClientConfig;

/// Resolves the lancache hostname and requires it to point into the LAN.
pub struct DnsCacheProbe {
    host: String,
}

impl DnsCacheProbe {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn from_config(config: &SteamClientConfig) -> Self {
        Self::new(config.lancache_host.clone())
    }
}

/// Whether `ip` is a private, loopback or unique-local address.
pub fn is_lan_address(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || v6.to_ipv4_mapped().is_some_and(|v4| is_lan_address(IpAddr::V4(v4)))
        }
    }
}

#[async_trait]
impl CacheProbe for DnsCacheProbe {
    async fn probe(&self) -> Result<CacheEndpoint, PrefillError> {
        let addrs: Vec<IpAddr> = tokio::net::lookup_host((self.host.as_str(), 80))
            .await
            .map_err(|e| {
                PrefillError::CacheUnreachable(format!("could not resolve {}: {e}", self.host))
            })?
            .map(|addr| addr.ip())
            .collect();

        debug!(target: "prefill.probe", host = %self.host, ?addrs, "Resolved lancache host");

        let address = addrs
            .iter()
            .copied()
            .find(|ip| is_lan_address(*ip))
            .ok_or_else(|| {
                PrefillError::CacheUnreachable(format!(
                    "{} does not resolve to a LAN address ({addrs:?}); is DNS pointed at the lancache?",
                    self.host
                ))
            })?;

        info!(target: "prefill.probe", %address, "Lancache detected");
        Ok(CacheEndpoint { address })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn private_addresses_are_lan() {
        assert!(is_lan_address(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 5))));
        assert!(is_lan_address(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
        assert!(is_lan_address(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert!(is_lan_address(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert!(is_lan_address("fd12:3456::1".parse().unwrap()));
    }

    #[test]
    fn public_addresses_are_not_lan() {
        assert!(!is_lan_address(IpAddr::V4(Ipv4Addr::new(23, 67, 33, 10))));
        assert!(!is_lan_address("2a02:26f0::1".parse().unwrap()));
    }

    #[tokio::test]
    async fn localhost_probe_succeeds() {
        let endpoint = DnsCacheProbe::new("localhost").probe().await.unwrap();
        assert!(endpoint.address.is_loopback());
    }

    #[tokio::test]
    async fn unresolvable_host_is_unreachable() {
        let err = DnsCacheProbe::new("lancache.invalid").probe().await.unwrap_err();
        assert!(matches!(err, PrefillError::CacheUnreachable(_)));
    }
}
