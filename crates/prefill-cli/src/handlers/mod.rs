//! Command handlers.

pub mod benchmark;
pub mod prefill;
pub mod select_apps;
