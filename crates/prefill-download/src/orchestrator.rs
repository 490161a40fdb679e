//! Per-app prefill driver.
//!
//! Apps are processed one at a time: resolve metadata, filter depots, diff
//! against the version record, plan, download, and advance the record only
//! when every chunk landed. Run-fatal errors stop everything; anything else
//! fails the current app and moves on.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use prefill_core::{
    AppId, CacheProbe, Depot, DepotId, ManifestId, PrefillConfig, PrefillError, PrefillResult,
    VersionRecord, VersionRecordRepository,
};
use prefill_steam::CatalogResolver;

use crate::benchmark::BenchmarkWorkload;
use crate::engine::ChunkDownloadEngine;
use crate::planner::DepotPlanner;

/// What happened to one app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppOutcome {
    Updated { bytes_transferred: u64 },
    AlreadyUpToDate,
    NotOwned,
    Failed { reason: String },
}

impl fmt::Display for AppOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Updated { .. } => f.write_str("updated"),
            Self::AlreadyUpToDate => f.write_str("up to date"),
            Self::NotOwned => f.write_str("not owned"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppReport {
    pub app_id: AppId,
    /// Display name, when metadata was resolved.
    pub name: Option<String>,
    pub outcome: AppOutcome,
}

/// Totals for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefillSummary {
    pub updated: usize,
    pub up_to_date: usize,
    pub failed: usize,
    pub unowned_skipped: usize,
    pub bytes_transferred: u64,
    /// One entry per requested app, in processing order.
    pub apps: Vec<AppReport>,
}

impl PrefillSummary {
    fn record(&mut self, report: AppReport) {
        match &report.outcome {
            AppOutcome::Updated { bytes_transferred } => {
                self.updated += 1;
                self.bytes_transferred += bytes_transferred;
            }
            AppOutcome::AlreadyUpToDate => self.up_to_date += 1,
            AppOutcome::NotOwned => self.unowned_skipped += 1,
            AppOutcome::Failed { .. } => self.failed += 1,
        }
        self.apps.push(report);
    }
}

/// Drives prefill runs over a list of apps.
pub struct PrefillOrchestrator {
    catalog: Arc<CatalogResolver>,
    planner: DepotPlanner,
    engine: ChunkDownloadEngine,
    probe: Arc<dyn CacheProbe>,
    versions: Arc<dyn VersionRecordRepository>,
    config: PrefillConfig,
}

impl PrefillOrchestrator {
    pub fn new(
        catalog: Arc<CatalogResolver>,
        engine: ChunkDownloadEngine,
        probe: Arc<dyn CacheProbe>,
        versions: Arc<dyn VersionRecordRepository>,
        config: PrefillConfig,
    ) -> Self {
        Self {
            planner: DepotPlanner::new(catalog.clone()),
            catalog,
            engine,
            probe,
            versions,
            config,
        }
    }

    pub const fn config(&self) -> &PrefillConfig {
        &self.config
    }

    /// Prefill `app_ids` in order.
    pub async fn run(&self, app_ids: &[AppId]) -> PrefillResult<PrefillSummary> {
        let endpoint = self.probe.probe().await?;
        info!(
            target: "prefill.orchestrator",
            lancache = %endpoint.address,
            apps = app_ids.len(),
            "Starting prefill"
        );

        let mut record = self.versions.load().await?;
        if let Err(e) = self.catalog.resolve_apps(app_ids).await {
            if e.is_run_fatal() {
                return Err(e);
            }
            warn!(target: "prefill.orchestrator", error = %e, "Batch metadata lookup failed");
        }

        let mut summary = PrefillSummary::default();
        for &app_id in app_ids {
            let name = self
                .catalog
                .resolve_app(app_id)
                .await
                .ok()
                .map(|app| app.name);

            let outcome = match self.prefill_app(app_id, &mut record).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_run_fatal() => {
                    error!(
                        target: "prefill.orchestrator",
                        app_id = %app_id,
                        error = %e,
                        "Run aborted"
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        target: "prefill.orchestrator",
                        app_id = %app_id,
                        error = %e,
                        "App failed"
                    );
                    AppOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            summary.record(AppReport {
                app_id,
                name,
                outcome,
            });
        }

        info!(
            target: "prefill.orchestrator",
            updated = summary.updated,
            up_to_date = summary.up_to_date,
            failed = summary.failed,
            unowned = summary.unowned_skipped,
            bytes = summary.bytes_transferred,
            "Prefill finished"
        );
        Ok(summary)
    }

    async fn prefill_app(
        &self,
        app_id: AppId,
        record: &mut VersionRecord,
    ) -> PrefillResult<AppOutcome> {
        let session = self.catalog.session();
        if !session.is_owned(app_id).await {
            info!(target: "prefill.orchestrator", app_id = %app_id, "Not owned, skipping");
            return Ok(AppOutcome::NotOwned);
        }

        let app = self.catalog.resolve_app(app_id).await?;
        if !app.is_available {
            info!(
                target: "prefill.orchestrator",
                app = %app,
                "Not available, nothing to download"
            );
            return Ok(AppOutcome::AlreadyUpToDate);
        }

        let depots = DepotPlanner::filter_depots(&app, &self.config.platform);
        if !self.config.force && DepotPlanner::is_up_to_date(&depots, record) {
            info!(target: "prefill.orchestrator", app = %app, "Already up to date");
            return Ok(AppOutcome::AlreadyUpToDate);
        }

        let planned = if self.config.force {
            depots.clone()
        } else {
            DepotPlanner::stale_depots(&depots, record)
        };

        self.catalog.pool().ensure_populated(session).await?;
        let plan = self.planner.build_download_plan(&planned).await?;
        info!(
            target: "prefill.orchestrator",
            app = %app,
            depots = planned.len(),
            chunks = plan.len(),
            bytes = plan.iter().map(|r| r.compressed_length).sum::<u64>(),
            "Downloading"
        );

        let report = self
            .engine
            .download(
                plan,
                self.config.effective_concurrency(),
                self.config.force || self.config.no_local_cache,
            )
            .await?;

        if let Some(failed) = report.failed.into_iter().next() {
            return Err(PrefillError::ChunkFetchFailed {
                depot_id: failed.depot_id,
                chunk_id: failed.chunk_id,
                reason: failed
                    .last_failure
                    .unwrap_or_else(|| "retry budget exhausted".to_string()),
            });
        }

        let mut next = record.clone();
        next.advance(manifest_versions(&depots));
        self.versions.save(&next).await?;
        *record = next;

        info!(
            target: "prefill.orchestrator",
            app = %app,
            bytes = report.bytes_transferred,
            reused = report.chunks_reused,
            "App updated"
        );
        Ok(AppOutcome::Updated {
            bytes_transferred: report.bytes_transferred,
        })
    }

    /// Plan `app_ids` regardless of version records and save the plan as a
    /// benchmark workload under the cache directory.
    pub async fn build_benchmark_workload(
        &self,
        app_ids: &[AppId],
    ) -> PrefillResult<BenchmarkWorkload> {
        let session = self.catalog.session();
        let mut depots = Vec::new();
        let mut included = Vec::new();

        for app in self.catalog.resolve_apps(app_ids).await? {
            if !session.is_owned(app.id).await {
                warn!(
                    target: "prefill.orchestrator",
                    app = %app,
                    "Not owned, left out of workload"
                );
                continue;
            }
            depots.extend(DepotPlanner::filter_depots(&app, &self.config.platform));
            included.push(app.id);
        }

        self.catalog.pool().ensure_populated(session).await?;
        let plan = self.planner.build_download_plan(&depots).await?;
        let workload = BenchmarkWorkload::new(included, plan);

        let path = BenchmarkWorkload::default_path(self.engine.cache_root());
        workload.save(&path).await?;
        info!(
            target: "prefill.orchestrator",
            path = %path.display(),
            chunks = workload.requests.len(),
            bytes = workload.total_bytes,
            "Benchmark workload written"
        );
        Ok(workload)
    }
}

fn manifest_versions(depots: &[Depot]) -> impl Iterator<Item = (DepotId, ManifestId)> + '_ {
    depots
        .iter()
        .filter_map(|d| d.manifest_id.map(|manifest| (d.id, manifest)))
}
