//! Main CLI parser and top-level argument handling.

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for warming a lancache with Steam content.
#[derive(Parser)]
#[command(name = "steam-prefill")]
#[command(about = "Prefill a lancache with Steam game content")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_verbose() {
        let cli = Cli::parse_from(["steam-prefill", "prefill", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Prefill(_))));
    }
}
