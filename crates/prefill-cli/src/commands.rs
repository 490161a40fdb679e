//! Commands and their arguments.

use clap::{Args, Subcommand};

use prefill_core::{AppId, OperatingSystem};

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Download selected apps into the lancache
    Prefill(PrefillArgs),

    /// Show or edit the apps that `prefill` downloads
    SelectApps {
        /// App ids to add to the selection
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        add: Vec<AppId>,
        /// App ids to remove from the selection
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        remove: Vec<AppId>,
        /// Remove every app from the selection
        #[arg(long, conflicts_with_all = ["add", "remove"])]
        clear: bool,
    },

    /// Benchmark workload management
    Benchmark {
        #[command(subcommand)]
        command: BenchmarkCommand,
    },
}

#[derive(Subcommand)]
pub enum BenchmarkCommand {
    /// Plan a fixed set of apps and save it as a replayable workload
    Setup {
        /// Apps to include
        #[arg(long, value_delimiter = ',', num_args = 1.., required = true)]
        app_ids: Vec<AppId>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct PrefillArgs {
    /// Prefill these apps instead of the saved selection
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub app_ids: Vec<AppId>,
    /// Prefill every owned app
    #[arg(long)]
    pub all: bool,
    /// Also prefill recently played apps
    #[arg(long)]
    pub recent: bool,
    /// Download even when the app is recorded as up to date
    #[arg(short, long)]
    pub force: bool,
    /// Refetch chunks already present in the local chunk directory
    #[arg(long)]
    pub no_local_cache: bool,
    /// Operating systems to download depots for (default windows)
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub os: Vec<OperatingSystem>,
}
