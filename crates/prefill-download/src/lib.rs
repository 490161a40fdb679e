//! Depot planning, chunk downloads and prefill runs.
//!
//! - `planner` - platform filtering, version diffing and de-duplicated chunk plans
//! - `engine` - bounded-concurrency chunk fetching with retry and failover
//! - `orchestrator` - per-app driver that advances the version record
//! - `benchmark` - portable workloads built from a fixed app set

#![deny(unsafe_code)]

mod benchmark;
mod engine;
mod orchestrator;
mod planner;

#[cfg(test)]
mod test_fixtures;

pub use benchmark::BenchmarkWorkload;
pub use engine::{ChunkDownloadEngine, DEFAULT_MAX_STALL, DownloadReport, chunk_file};
pub use orchestrator::{AppOutcome, AppReport, PrefillOrchestrator, PrefillSummary};
pub use planner::DepotPlanner;
