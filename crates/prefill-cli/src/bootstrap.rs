//! CLI bootstrap - the composition root.
//!
//! This is the only place where adapters are wired together:
//! - JSON stores (via prefill-store)
//! - Session gateway, CDN client, lancache probe (via prefill-steam)
//! - Engine and orchestrator (via prefill-download)
//!
//! Once [`log_on`] succeeds, callers run the rest through
//! [`disconnect_after`] so every exit path closes the session.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use prefill_core::paths::{cache_root, data_root, ensure_directory};
use prefill_core::{CacheProbe, PrefillConfig};
use prefill_download::{ChunkDownloadEngine, PrefillOrchestrator};
use prefill_steam::{
    CatalogResolver, DEFAULT_GATEWAY_URL, DnsCacheProbe, GatewayTransport, ReqwestCdnClient,
    ServerPool, SessionClient, SteamClientConfig,
};
use prefill_store::{StoreFactory, Stores};

use crate::error::CliError;
use crate::utils::TerminalPrompt;

/// Overrides the session gateway address.
pub const GATEWAY_URL_ENV: &str = "STEAM_PREFILL_GATEWAY_URL";

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Account and app selection.
    pub data_root: PathBuf,
    /// Chunk files, version record and benchmark workloads.
    pub cache_root: PathBuf,
    pub gateway_url: String,
}

impl CliConfig {
    /// Resolve directories and the gateway from the environment.
    pub fn from_env() -> Result<Self, CliError> {
        let gateway_url = std::env::var(GATEWAY_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());

        Ok(Self {
            data_root: data_root()?,
            cache_root: cache_root()?,
            gateway_url,
        })
    }

    pub fn steam_config(&self) -> SteamClientConfig {
        SteamClientConfig::new().with_gateway_url(&self.gateway_url)
    }

    /// Create both roots and build the stores inside them.
    pub fn stores(&self) -> Result<Stores, CliError> {
        ensure_directory(&self.data_root)?;
        ensure_directory(&self.cache_root)?;
        Ok(StoreFactory::build(&self.data_root, &self.cache_root))
    }
}

/// Connect and log on through the configured gateway.
///
/// A failed logon still disconnects the transport.
pub async fn log_on(config: &CliConfig, stores: &Stores) -> Result<Arc<SessionClient>, CliError> {
    let steam = config.steam_config();
    let transport = GatewayTransport::new(&steam)?;
    let session = Arc::new(
        SessionClient::new(
            Arc::new(transport),
            stores.credentials.clone(),
            Arc::new(TerminalPrompt),
        )
        .with_cell_id(steam.cell_id()),
    );

    if let Err(e) = session.log_on().await {
        return disconnect_after(&session, async { Err(e.into()) }).await;
    }
    Ok(session)
}

/// Wait for licenses, locate the lancache, and assemble the pipeline on a
/// logged-on session.
pub async fn bootstrap(
    config: &CliConfig,
    stores: &Stores,
    session: Arc<SessionClient>,
    prefill: PrefillConfig,
) -> Result<PrefillOrchestrator, CliError> {
    let licenses = session.wait_for_licenses().await?;
    info!(target: "prefill.cli", licenses, "Logged on");

    let steam = config.steam_config();
    let probe = Arc::new(DnsCacheProbe::from_config(&steam));
    let lancache = probe.probe().await?;

    let cdn = Arc::new(ReqwestCdnClient::new(&steam, Some(lancache.address))?);
    let pool = Arc::new(ServerPool::new());
    let catalog = Arc::new(CatalogResolver::new(session, cdn.clone(), pool.clone()));
    let engine = ChunkDownloadEngine::new(cdn, pool, config.cache_root.clone())
        .with_retry_budget(prefill.effective_retry_budget());

    Ok(PrefillOrchestrator::new(
        catalog,
        engine,
        probe,
        stores.version_record.clone(),
        prefill,
    ))
}

/// Run `work`, then disconnect `session` whether it succeeded or not.
///
/// A failed disconnect is only logged; the outcome of `work` wins.
pub async fn disconnect_after<T>(
    session: &SessionClient,
    work: impl Future<Output = Result<T, CliError>>,
) -> Result<T, CliError> {
    let result = work.await;
    if let Err(e) = session.disconnect().await {
        warn!(target: "prefill.cli", error = %e, "Disconnect failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use prefill_core::session::{ResultCode, SessionEvent};
    use prefill_core::{AppId, PrefillError};
    use prefill_steam::testing::{
        MemoryCredentialStore, ScriptedTransport, StaticPrompt, logged_on_session,
    };
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> CliConfig {
        CliConfig {
            data_root: dir.path().join("data"),
            cache_root: dir.path().join("cache"),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
        }
    }

    #[test]
    fn stores_create_both_roots() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);

        config.stores().unwrap();

        assert!(config.data_root.is_dir());
        assert!(config.cache_root.is_dir());
        assert_eq!(config.steam_config().gateway_url(), DEFAULT_GATEWAY_URL);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_work_still_disconnects() {
        let transport = Arc::new(ScriptedTransport::logged_on_owning(&[AppId(730)]));
        let session = logged_on_session(transport.clone()).await.unwrap();

        let result = disconnect_after(&session, async {
            Err::<(), _>(CliError::from(PrefillError::NotLoggedOn))
        })
        .await;

        assert!(matches!(result, Err(CliError::Prefill(PrefillError::NotLoggedOn))));
        assert_eq!(transport.disconnect_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn license_failure_after_logon_disconnects() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let stores = config.stores().unwrap();
        let transport = Arc::new(ScriptedTransport::new().on_logon(vec![
            SessionEvent::LoggedOn {
                result: ResultCode::Ok,
                cell_id: Some(0),
            },
            SessionEvent::SessionKey {
                key: "session-key".to_string(),
            },
            SessionEvent::LicenseList {
                result: ResultCode::ServiceUnavailable,
                apps: Vec::new(),
            },
        ]));
        let session = Arc::new(SessionClient::new(
            transport.clone(),
            Arc::new(MemoryCredentialStore::default()),
            Arc::new(StaticPrompt::default()),
        ));
        session.log_on().await.unwrap();

        let result = disconnect_after(
            &session,
            bootstrap(&config, &stores, session.clone(), PrefillConfig::default()),
        )
        .await;

        assert!(matches!(
            result,
            Err(CliError::Prefill(PrefillError::LicenseQueryFailed(_)))
        ));
        assert_eq!(transport.disconnect_calls(), 1);
    }
}
