//! Single-chunk fetch pipeline.
//!
//! A worker takes one [`QueuedRequest`] and cloned dependencies, and has no
//! view of the round it belongs to. Requeueing and budget accounting stay in
//! the engine.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use prefill_core::{CdnTransport, ChunkFetchError, PrefillError, QueuedRequest};
use prefill_steam::ServerPool;

use super::paths::{is_cached, write_chunk};

/// Dependencies shared by every worker of an engine.
#[derive(Clone)]
pub struct WorkerDeps {
    pub cdn: Arc<dyn CdnTransport>,
    pub pool: Arc<ServerPool>,
    pub cache_root: Arc<PathBuf>,
}

/// How a chunk was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Fetched from the network; carries the payload length.
    Fetched(u64),
    /// Already on disk with the right length.
    Reused,
}

/// Why a chunk attempt did not complete.
#[derive(Debug)]
pub enum ChunkFailure {
    /// Worth another attempt, possibly on another endpoint.
    Retryable(ChunkFetchError),
    /// Not attempted: every endpoint is cooling down. Costs no budget.
    Deferred,
    /// Stops the whole run.
    Fatal(PrefillError),
}

impl From<ChunkFetchError> for ChunkFailure {
    fn from(err: ChunkFetchError) -> Self {
        match err {
            ChunkFetchError::CacheUnreachable(reason) => {
                Self::Fatal(PrefillError::CacheUnreachable(reason))
            }
            ChunkFetchError::NoServers => Self::Fatal(PrefillError::NoServersAvailable),
            other => Self::Retryable(other),
        }
    }
}

/// Make one attempt at `request`.
///
/// With `reuse_cached`, a chunk already on disk is satisfied without touching
/// the network.
pub async fn fetch_chunk(
    request: &QueuedRequest,
    deps: &WorkerDeps,
    reuse_cached: bool,
) -> Result<ChunkOutcome, ChunkFailure> {
    if reuse_cached && is_cached(&deps.cache_root, request).await {
        return Ok(ChunkOutcome::Reused);
    }

    let server = match deps.pool.acquire().await {
        Ok(server) => server,
        Err(PrefillError::NoServersAvailable) if !deps.pool.is_empty().await => {
            return Err(ChunkFailure::Deferred);
        }
        Err(err) => return Err(ChunkFailure::Fatal(err)),
    };

    let payload = match deps.cdn.fetch_chunk(&server, request).await {
        Ok(payload) => payload,
        Err(err) => {
            if err.is_retryable() {
                deps.pool.report_failure(&server).await;
            }
            return Err(err.into());
        }
    };

    let actual = payload.len() as u64;
    if actual != request.compressed_length {
        deps.pool.report_failure(&server).await;
        return Err(ChunkFailure::Retryable(ChunkFetchError::LengthMismatch {
            expected: request.compressed_length,
            actual,
        }));
    }

    write_chunk(&deps.cache_root, request, &payload).await?;
    deps.pool.report_success(&server).await;

    debug!(
        target: "prefill.download",
        depot_id = %request.depot_id,
        chunk_id = %request.chunk_id,
        host = %server.host,
        bytes = actual,
        "Chunk stored"
    );
    Ok(ChunkOutcome::Fetched(actual))
}
