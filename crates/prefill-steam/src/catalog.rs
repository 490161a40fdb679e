//! App metadata and manifest resolution with per-run memoization.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use prefill_core::{
    AppId, AppMetadata, CdnTransport, Depot, DepotId, Manifest, ManifestId, PrefillError,
    PrefillResult, TransportError,
};

use crate::pool::ServerPool;
use crate::session::SessionClient;

/// Endpoints tried for one manifest before giving up.
pub const MANIFEST_FAILOVER_ATTEMPTS: usize = 3;

/// Resolves app ids to metadata and depots to manifests.
///
/// Both lookups are cached for the lifetime of the resolver, which is one run.
pub struct CatalogResolver {
    session: Arc<SessionClient>,
    cdn: Arc<dyn CdnTransport>,
    pool: Arc<ServerPool>,
    apps: Mutex<HashMap<AppId, AppMetadata>>,
    manifests: Mutex<HashMap<(DepotId, ManifestId), Arc<Manifest>>>,
}

impl CatalogResolver {
    pub fn new(
        session: Arc<SessionClient>,
        cdn: Arc<dyn CdnTransport>,
        pool: Arc<ServerPool>,
    ) -> Self {
        Self {
            session,
            cdn,
            pool,
            apps: Mutex::new(HashMap::new()),
            manifests: Mutex::new(HashMap::new()),
        }
    }

    pub const fn session(&self) -> &Arc<SessionClient> {
        &self.session
    }

    pub const fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    /// Metadata for one app.
    pub async fn resolve_app(&self, app_id: AppId) -> PrefillResult<AppMetadata> {
        if let Some(app) = self.apps.lock().await.get(&app_id) {
            return Ok(app.clone());
        }

        self.resolve_apps(&[app_id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PrefillError::metadata(app_id, "unknown app"))
    }

    /// Metadata for many apps, in input order.
    ///
    /// Cache misses go to the session in a single query. Ids the network
    /// does not know are left out.
    pub async fn resolve_apps(&self, app_ids: &[AppId]) -> PrefillResult<Vec<AppMetadata>> {
        let misses: Vec<AppId> = {
            let cache = self.apps.lock().await;
            let mut misses: Vec<AppId> = app_ids
                .iter()
                .copied()
                .filter(|id| !cache.contains_key(id))
                .collect();
            misses.sort_unstable();
            misses.dedup();
            misses
        };

        if !misses.is_empty() {
            debug!(target: "prefill.catalog", count = misses.len(), "Querying app info");
            let fetched = self.session.app_info(&misses).await?;
            let mut cache = self.apps.lock().await;
            for app in fetched {
                cache.insert(app.id, app);
            }
        }

        let cache = self.apps.lock().await;
        Ok(app_ids
            .iter()
            .filter_map(|id| {
                let app = cache.get(id).cloned();
                if app.is_none() {
                    warn!(target: "prefill.catalog", app_id = %id, "No metadata for app");
                }
                app
            })
            .collect())
    }

    /// The manifest a depot currently points at.
    ///
    /// Fetched through pool-selected endpoints, failing over to the next
    /// one up to [`MANIFEST_FAILOVER_ATTEMPTS`] times. A failover waits out
    /// the cool-down when no other endpoint is left.
    pub async fn resolve_manifest(&self, depot: &Depot) -> PrefillResult<Arc<Manifest>> {
        let manifest_id = depot.manifest_id.ok_or_else(|| {
            PrefillError::metadata(depot.app_id, format!("depot {} has no manifest", depot.id))
        })?;
        let key = (depot.id, manifest_id);

        if let Some(manifest) = self.manifests.lock().await.get(&key) {
            return Ok(Arc::clone(manifest));
        }

        self.pool.ensure_populated(&self.session).await?;

        let mut last_error: Option<TransportError> = None;
        for attempt in 1..=MANIFEST_FAILOVER_ATTEMPTS {
            let server = self.pool.acquire_within(self.pool.cooldown()).await?;
            match self.cdn.fetch_manifest(&server, depot.id, manifest_id).await {
                Ok(manifest) => {
                    self.pool.report_success(&server).await;
                    let manifest = Arc::new(manifest);
                    self.manifests
                        .lock()
                        .await
                        .insert(key, Arc::clone(&manifest));
                    debug!(
                        target: "prefill.catalog",
                        depot_id = %depot.id,
                        manifest_id = %manifest_id,
                        chunks = manifest.chunks().count(),
                        "Manifest resolved"
                    );
                    return Ok(manifest);
                }
                Err(e) => {
                    warn!(
                        target: "prefill.catalog",
                        depot_id = %depot.id,
                        host = %server.host,
                        attempt,
                        error = %e,
                        "Manifest fetch failed"
                    );
                    self.pool.report_failure(&server).await;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.map_or_else(
            || PrefillError::metadata(depot.app_id, "manifest unavailable"),
            PrefillError::Transport,
        ))
    }
}
