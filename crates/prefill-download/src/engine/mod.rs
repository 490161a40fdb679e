//! Bounded-concurrency chunk download engine.
//!
//! A plan is processed in rounds. Each round runs every pending request
//! through [`worker::fetch_chunk`] with at most `max_parallelism` in flight;
//! requests that fail transiently are requeued for the next round until their
//! retry budget is spent. When every content server is cooling down, the
//! untried requests wait for the earliest one to come back. Fatal failures end
//! the download with an error.

mod paths;
mod worker;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use prefill_core::config::DEFAULT_RETRY_BUDGET;
use prefill_core::{CdnTransport, PrefillError, PrefillResult, QueuedRequest};
use prefill_steam::ServerPool;

pub use paths::chunk_file;
use worker::{ChunkFailure, ChunkOutcome, WorkerDeps, fetch_chunk};

/// Longest a download may wait on cooling servers without any chunk making
/// progress before it is treated as a retry loop.
pub const DEFAULT_MAX_STALL: Duration = Duration::from_secs(120);

/// Outcome of downloading one plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    /// True only when every chunk ended up on disk within budget.
    pub success: bool,
    pub bytes_transferred: u64,
    pub chunks_fetched: usize,
    /// Chunks already on disk that needed no fetch.
    pub chunks_reused: usize,
    pub chunks_failed: usize,
    /// Requests that spent their budget, with their last failure reason.
    pub failed: Vec<QueuedRequest>,
    /// Network attempts made, successful or not.
    pub attempts: usize,
}

struct Pending {
    request: QueuedRequest,
    attempts: u32,
}

/// Fetches chunk plans into the cache directory.
pub struct ChunkDownloadEngine {
    deps: WorkerDeps,
    retry_budget: u32,
    max_stall: Duration,
}

impl ChunkDownloadEngine {
    pub fn new(
        cdn: Arc<dyn CdnTransport>,
        pool: Arc<ServerPool>,
        cache_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            deps: WorkerDeps {
                cdn,
                pool,
                cache_root: Arc::new(cache_root.into()),
            },
            retry_budget: DEFAULT_RETRY_BUDGET,
            max_stall: DEFAULT_MAX_STALL,
        }
    }

    /// Attempts allowed per chunk. Clamped to at least one.
    #[must_use]
    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget.max(1);
        self
    }

    #[must_use]
    pub const fn with_max_stall(mut self, max_stall: Duration) -> Self {
        self.max_stall = max_stall;
        self
    }

    pub fn cache_root(&self) -> &Path {
        &self.deps.cache_root
    }

    pub const fn retry_budget(&self) -> u32 {
        self.retry_budget
    }

    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.deps.pool
    }

    /// Download every request of `plan`.
    ///
    /// Chunks that exhaust their budget make the report unsuccessful but are
    /// not an error. `NoServersAvailable` (empty pool), `CacheUnreachable`
    /// and `InfiniteRetryLoop` (stalled past the limit) are returned as
    /// errors.
    pub async fn download(
        &self,
        plan: Vec<QueuedRequest>,
        max_parallelism: usize,
        force: bool,
    ) -> PrefillResult<DownloadReport> {
        let parallelism = max_parallelism.max(1);
        let mut stalled = Duration::ZERO;
        let mut report = DownloadReport::default();
        let mut pending: Vec<Pending> = plan
            .into_iter()
            .map(|request| Pending {
                request,
                attempts: 0,
            })
            .collect();

        info!(
            target: "prefill.download",
            chunks = pending.len(),
            parallelism,
            force,
            "Starting chunk download"
        );

        while !pending.is_empty() {
            let results: Vec<(Pending, Result<ChunkOutcome, ChunkFailure>)> =
                stream::iter(pending.drain(..).map(|job| {
                    let deps = self.deps.clone();
                    let reuse_cached = !force && job.attempts == 0;
                    async move {
                        let result = fetch_chunk(&job.request, &deps, reuse_cached).await;
                        (job, result)
                    }
                }))
                .buffer_unordered(parallelism)
                .collect()
                .await;

            let mut fatal = None;
            let mut deferred = 0;
            let mut progressed = false;
            for (mut job, result) in results {
                if !matches!(result, Err(ChunkFailure::Deferred)) {
                    progressed = true;
                }
                match result {
                    Ok(ChunkOutcome::Reused) => report.chunks_reused += 1,
                    Ok(ChunkOutcome::Fetched(bytes)) => {
                        report.attempts += 1;
                        report.chunks_fetched += 1;
                        report.bytes_transferred += bytes;
                    }
                    Err(ChunkFailure::Retryable(err)) => {
                        report.attempts += 1;
                        job.attempts += 1;
                        job.request.record_failure(err.to_string());
                        if job.attempts >= self.retry_budget {
                            warn!(
                                target: "prefill.download",
                                depot_id = %job.request.depot_id,
                                chunk_id = %job.request.chunk_id,
                                error = %err,
                                "Chunk failed after {} attempts",
                                job.attempts
                            );
                            report.failed.push(job.request);
                        } else {
                            debug!(
                                target: "prefill.download",
                                chunk_id = %job.request.chunk_id,
                                attempt = job.attempts,
                                error = %err,
                                "Retrying chunk"
                            );
                            pending.push(job);
                        }
                    }
                    Err(ChunkFailure::Deferred) => {
                        deferred += 1;
                        pending.push(job);
                    }
                    Err(ChunkFailure::Fatal(err)) => {
                        fatal.get_or_insert(err);
                    }
                }
            }

            if let Some(err) = fatal {
                warn!(target: "prefill.download", error = %err, "Chunk download aborted");
                return Err(err);
            }

            if progressed {
                stalled = Duration::ZERO;
            }
            if deferred > 0 {
                self.wait_for_server(&mut stalled, pending.len()).await?;
            }
        }

        report.chunks_failed = report.failed.len();
        report.success = report.failed.is_empty();

        info!(
            target: "prefill.download",
            fetched = report.chunks_fetched,
            reused = report.chunks_reused,
            failed = report.chunks_failed,
            bytes = report.bytes_transferred,
            "Chunk download finished"
        );
        Ok(report)
    }

    /// Sleep until the earliest cooling server is back.
    async fn wait_for_server(&self, stalled: &mut Duration, pending: usize) -> PrefillResult<()> {
        let Some(resume_at) = self.deps.pool.earliest_available().await else {
            return Err(PrefillError::NoServersAvailable);
        };
        let wait = resume_at.saturating_duration_since(Instant::now());
        *stalled += wait;
        if *stalled > self.max_stall {
            warn!(
                target: "prefill.download",
                pending,
                stalled_secs = stalled.as_secs(),
                "Content servers did not recover"
            );
            return Err(PrefillError::InfiniteRetryLoop {
                pending,
                stalled_secs: stalled.as_secs(),
            });
        }

        debug!(
            target: "prefill.download",
            pending,
            wait_secs = wait.as_secs(),
            "Every content server is cooling down, waiting"
        );
        tokio::time::sleep_until(resume_at).await;
        Ok(())
    }
}
