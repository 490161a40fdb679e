//! CLI entry point.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use prefill_cli::{BenchmarkCommand, Cli, CliConfig, CliError, Commands, handlers};

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = CliConfig::from_env()?;
    match command {
        Commands::Prefill(args) => handlers::prefill::execute(&config, args, cli.verbose).await,
        Commands::SelectApps { add, remove, clear } => {
            handlers::select_apps::execute(&config, &add, &remove, clear).await
        }
        Commands::Benchmark { command } => match command {
            BenchmarkCommand::Setup { app_ids } => {
                handlers::benchmark::setup(&config, &app_ids, cli.verbose).await
            }
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
