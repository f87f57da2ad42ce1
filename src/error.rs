//! Error types for the page context registry.
//!
//! Only selector resolution and malformed input surface as errors. Version
//! mismatches, unknown context ids and stalled loaders are reported through
//! logging and never returned to the caller.

use thiserror::Error;

/// Registry-related errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("No context in scope: no current script, no selector, and nothing registered yet")]
    UnresolvedSelector,

    #[error("Invalid context: {0}")]
    InvalidContext(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No async runtime available to drive template loaders")]
    NoRuntime,

    #[error("A global registry is already installed for this process")]
    GlobalAlreadyInstalled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<config::ConfigError> for RegistryError {
    fn from(err: config::ConfigError) -> Self {
        RegistryError::ConfigError(err.to_string())
    }
}
