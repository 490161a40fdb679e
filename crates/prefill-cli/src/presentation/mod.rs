//! Terminal output formatting.

pub mod tables;

pub use tables::{format_bytes, print_separator, render_summary, truncate_string};
