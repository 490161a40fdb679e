//! Interactive input helpers.

pub mod input;
pub mod prompt;

pub use prompt::TerminalPrompt;
