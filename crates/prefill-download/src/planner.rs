//! Depot version diffing and download planning.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use prefill_core::{AppMetadata, Depot, PlatformFilter, PrefillResult, QueuedRequest, VersionRecord};
use prefill_steam::CatalogResolver;

/// Decides what an app needs and flattens it into chunk requests.
pub struct DepotPlanner {
    catalog: Arc<CatalogResolver>,
}

impl DepotPlanner {
    pub const fn new(catalog: Arc<CatalogResolver>) -> Self {
        Self { catalog }
    }

    /// Depots of `app` that match `filter`, each with an effective manifest.
    ///
    /// Delta depots without a manifest of their own take their base depot's.
    /// Depots still without a manifest after that are dropped.
    pub fn filter_depots(app: &AppMetadata, filter: &PlatformFilter) -> Vec<Depot> {
        app.depots
            .iter()
            .filter(|depot| filter.matches(depot))
            .filter_map(|depot| {
                let manifest_id = depot.manifest_id.or_else(|| {
                    let base = depot.base_depot_id?;
                    app.depots
                        .iter()
                        .find(|d| d.id == base)
                        .and_then(|d| d.manifest_id)
                });

                match manifest_id {
                    Some(manifest_id) => Some(Depot {
                        manifest_id: Some(manifest_id),
                        ..depot.clone()
                    }),
                    None => {
                        debug!(
                            target: "prefill.planner",
                            app_id = %app.id,
                            depot_id = %depot.id,
                            "Depot has no manifest, skipping"
                        );
                        None
                    }
                }
            })
            .collect()
    }

    /// Whether every depot's manifest matches the recorded one.
    pub fn is_up_to_date(depots: &[Depot], record: &VersionRecord) -> bool {
        depots.iter().all(|depot| {
            depot
                .manifest_id
                .is_some_and(|manifest| record.is_current(depot.id, manifest))
        })
    }

    /// Depots whose manifest differs from the recorded one.
    pub fn stale_depots(depots: &[Depot], record: &VersionRecord) -> Vec<Depot> {
        depots
            .iter()
            .filter(|depot| !Self::is_up_to_date(std::slice::from_ref(depot), record))
            .cloned()
            .collect()
    }

    /// Resolve each depot's manifest and flatten it into chunk requests.
    ///
    /// A chunk id appears at most once in the plan, even when several
    /// depots or files share it. Order follows depots, files, then chunks.
    pub async fn build_download_plan(
        &self,
        depots: &[Depot],
    ) -> PrefillResult<Vec<QueuedRequest>> {
        let mut seen = HashSet::new();
        let mut plan = Vec::new();

        for depot in depots {
            let manifest = self.catalog.resolve_manifest(depot).await?;
            let before = plan.len();
            for chunk in manifest.chunks() {
                if seen.insert(chunk.id.clone()) {
                    plan.push(QueuedRequest::new(
                        depot.app_id,
                        depot.id,
                        manifest.manifest_id,
                        chunk,
                    ));
                }
            }
            debug!(
                target: "prefill.planner",
                depot_id = %depot.id,
                chunks = plan.len() - before,
                "Depot planned"
            );
        }

        Ok(plan)
    }
}
