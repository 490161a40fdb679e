//! Path utilities for steam-prefill data and cache directories.
//!
//! - Data root: account, selected apps
//! - Cache root: chunk files, version record, benchmark workload
//!
//! Both roots can be overridden through environment variables.

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::{ChunkId, DepotId};

/// Environment override for the data root.
pub const DATA_DIR_ENV: &str = "STEAM_PREFILL_DATA_DIR";

/// Environment override for the cache root.
pub const CACHE_DIR_ENV: &str = "STEAM_PREFILL_CACHE_DIR";

const APP_DIR_NAME: &str = "steam-prefill";

pub const ACCOUNT_FILE: &str = "account.json";
pub const SELECTED_APPS_FILE: &str = "selectedAppsToPrefill.json";
pub const VERSION_RECORD_FILE: &str = "successfullyDownloadedDepots.json";
pub const BENCHMARK_FILE: &str = "benchmark.json";

/// Errors resolving directories.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("Cannot determine system data directory")]
    NoDataDir,

    #[error("Cannot determine system cache directory")]
    NoCacheDir,

    #[error("Failed to create directory {path}: {reason}")]
    CreateFailed { path: PathBuf, reason: String },
}

/// Root directory for application data.
///
/// Resolution order:
/// 1. `STEAM_PREFILL_DATA_DIR`
/// 2. System data directory (e.g. `~/.local/share/steam-prefill`)
pub fn data_root() -> Result<PathBuf, PathError> {
    if let Some(dir) = env_dir(DATA_DIR_ENV) {
        return Ok(dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .ok_or(PathError::NoDataDir)
}

/// Root directory for downloaded chunks and the version record.
///
/// Resolution order:
/// 1. `STEAM_PREFILL_CACHE_DIR`
/// 2. System cache directory (e.g. `~/.cache/steam-prefill`)
pub fn cache_root() -> Result<PathBuf, PathError> {
    if let Some(dir) = env_dir(CACHE_DIR_ENV) {
        return Ok(dir);
    }
    dirs::cache_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .ok_or(PathError::NoCacheDir)
}

fn env_dir(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// `<cache>/Depots/<depotId>`
pub fn depot_dir(cache_root: &Path, depot_id: DepotId) -> PathBuf {
    cache_root.join("Depots").join(depot_id.to_string())
}

/// `<cache>/Depots/<depotId>/<chunkId>.bin`
pub fn chunk_path(cache_root: &Path, depot_id: DepotId, chunk_id: &ChunkId) -> PathBuf {
    depot_dir(cache_root, depot_id).join(format!("{chunk_id}.bin"))
}

/// Create a directory and its parents if missing.
pub fn ensure_directory(path: &Path) -> Result<(), PathError> {
    std::fs::create_dir_all(path).map_err(|e| PathError::CreateFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
