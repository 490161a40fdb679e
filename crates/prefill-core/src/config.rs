//! Run configuration.

use serde::{Deserialize, Serialize};

use crate::domain::PlatformFilter;

/// Default number of chunk fetches in flight.
pub const DEFAULT_MAX_CONCURRENCY: usize = 30;

/// Attempts allowed per chunk before the app is marked failed.
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

/// Options for one prefill run.
///
/// Every flag is a plain value with a documented default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefillConfig {
    /// Download apps even when the version record says they are current. Default `false`.
    pub force: bool,
    /// Ignore chunks already in the local chunk directory. Default `false`.
    pub no_local_cache: bool,
    /// Surface per-chunk retries in the log. Default `false`.
    pub verbose: bool,
    /// Which depots to download. Default Windows / 64-bit / English.
    pub platform: PlatformFilter,
    /// Concurrent chunk fetches. Default [`DEFAULT_MAX_CONCURRENCY`].
    pub max_concurrency: usize,
    /// Attempts per chunk. Default [`DEFAULT_RETRY_BUDGET`].
    pub retry_budget: u32,
}

impl Default for PrefillConfig {
    fn default() -> Self {
        Self {
            force: false,
            no_local_cache: false,
            verbose: false,
            platform: PlatformFilter::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }
}

impl PrefillConfig {
    /// Concurrency clamped to at least one worker.
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }

    /// Retry budget clamped to at least one attempt.
    pub fn effective_retry_budget(&self) -> u32 {
        self.retry_budget.max(1)
    }
}
