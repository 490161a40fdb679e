//! `select-apps` command.

use prefill_core::{AppId, SelectedAppsRepository};

use crate::bootstrap::CliConfig;
use crate::error::CliError;
use crate::presentation::print_separator;

/// Apply `--clear`, `--remove` and `--add`, in that order, keeping order.
pub fn apply_changes(
    mut current: Vec<AppId>,
    add: &[AppId],
    remove: &[AppId],
    clear: bool,
) -> Vec<AppId> {
    if clear {
        current.clear();
    }
    current.retain(|app| !remove.contains(app));
    for app in add {
        if !current.contains(app) {
            current.push(*app);
        }
    }
    current
}

pub async fn execute(
    config: &CliConfig,
    add: &[AppId],
    remove: &[AppId],
    clear: bool,
) -> Result<(), CliError> {
    let stores = config.stores()?;
    let current = stores.selected_apps.load().await?;
    let updated = apply_changes(current.clone(), add, remove, clear);

    if updated != current {
        stores.selected_apps.save(&updated).await?;
    }

    if updated.is_empty() {
        println!("No apps selected.");
        return Ok(());
    }

    println!("Selected apps ({}):", updated.len());
    print_separator(24);
    for app in &updated {
        println!("{app}");
    }
    Ok(())
}
