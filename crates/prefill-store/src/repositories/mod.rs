//! Repository implementations backed by JSON files.
//!
//! File paths are confined to this module and never exposed through the
//! port trait signatures.

mod json_credential_store;
mod json_selected_apps_store;
mod json_version_record_store;

pub use json_credential_store::JsonCredentialStore;
pub use json_selected_apps_store::JsonSelectedAppsStore;
pub use json_version_record_store::JsonVersionRecordStore;
