//! `steam-prefill` command-line interface.
//!
//! The binary in `main.rs` parses arguments and dispatches to `handlers`,
//! which build the pipeline through `bootstrap`.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary only
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;
pub mod utils;

pub use bootstrap::{CliConfig, bootstrap, disconnect_after, log_on};
pub use commands::{BenchmarkCommand, Commands, PrefillArgs};
pub use error::CliError;
pub use parser::Cli;
