//! JSON file repositories for steam-prefill.
//!
//! Each port from `prefill-core` that needs durable state is backed by a
//! single JSON file. Writes go through a temp file and a rename so a crash
//! never leaves a truncated document behind.

#![deny(unsafe_code)]

pub mod factory;
mod json_file;
pub mod repositories;

pub use factory::{StoreFactory, Stores};

pub use repositories::{JsonCredentialStore, JsonSelectedAppsStore, JsonVersionRecordStore};
