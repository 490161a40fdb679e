//! `prefill` command.

use prefill_core::{AppId, PlatformFilter, PrefillConfig, SelectedAppsRepository};

use crate::bootstrap::{CliConfig, bootstrap, disconnect_after, log_on};
use crate::commands::PrefillArgs;
use crate::error::CliError;
use crate::presentation::render_summary;

/// Apps named on the command line, or else the saved selection.
///
/// Fails when that leaves nothing and neither `--all` nor `--recent` can
/// add apps after logon.
pub fn explicit_apps(args: &PrefillArgs, saved: Vec<AppId>) -> Result<Vec<AppId>, CliError> {
    let apps = if args.app_ids.is_empty() {
        saved
    } else {
        args.app_ids.clone()
    };

    if apps.is_empty() && !args.all && !args.recent {
        return Err(CliError::NothingSelected);
    }
    Ok(apps)
}

pub fn prefill_config(args: &PrefillArgs, verbose: bool) -> PrefillConfig {
    let mut platform = PlatformFilter::default();
    if !args.os.is_empty() {
        platform.operating_systems.clone_from(&args.os);
    }

    PrefillConfig {
        force: args.force,
        no_local_cache: args.no_local_cache,
        verbose,
        platform,
        ..PrefillConfig::default()
    }
}

fn push_unique(apps: &mut Vec<AppId>, more: impl IntoIterator<Item = AppId>) {
    for app in more {
        if !apps.contains(&app) {
            apps.push(app);
        }
    }
}

pub async fn execute(config: &CliConfig, args: PrefillArgs, verbose: bool) -> Result<(), CliError> {
    let stores = config.stores()?;
    let saved = stores.selected_apps.load().await?;
    let mut apps = Vec::new();
    push_unique(&mut apps, explicit_apps(&args, saved)?);

    let session = log_on(config, &stores).await?;
    let summary = disconnect_after(&session, async {
        let orchestrator = bootstrap(
            config,
            &stores,
            session.clone(),
            prefill_config(&args, verbose),
        )
        .await?;
        if args.all {
            push_unique(&mut apps, session.owned_apps().await);
        }
        if args.recent {
            push_unique(&mut apps, session.recently_played().await?);
        }
        Ok(orchestrator.run(&apps).await?)
    })
    .await?;
    println!();
    print!("{}", render_summary(&summary));
    Ok(())
}
