//! `benchmark` commands.

use prefill_core::paths::BENCHMARK_FILE;
use prefill_core::{AppId, PrefillConfig};

use crate::bootstrap::{CliConfig, bootstrap, disconnect_after, log_on};
use crate::error::CliError;
use crate::presentation::format_bytes;

/// Plan `app_ids` and write the workload into the cache directory.
pub async fn setup(config: &CliConfig, app_ids: &[AppId], verbose: bool) -> Result<(), CliError> {
    let stores = config.stores()?;
    let prefill = PrefillConfig {
        verbose,
        ..PrefillConfig::default()
    };
    let session = log_on(config, &stores).await?;
    let workload = disconnect_after(&session, async {
        let orchestrator = bootstrap(config, &stores, session.clone(), prefill).await?;
        Ok(orchestrator.build_benchmark_workload(app_ids).await?)
    })
    .await?;

    println!(
        "Benchmark workload: {} apps, {} chunks, {}",
        workload.app_ids.len(),
        workload.requests.len(),
        format_bytes(workload.total_bytes)
    );
    println!("Saved to {}", config.cache_root.join(BENCHMARK_FILE).display());
    Ok(())
}
