//! Configuration System
//!
//! Layered configuration for the registry and its logging: built-in defaults,
//! then an optional TOML/JSON/YAML file, then `PAGECTX_*` environment
//! variables (nested keys separated by `__`, e.g. `PAGECTX_REGISTRY__LOG_TAG`).

use crate::error::RegistryError;
use crate::logging::LoggingConfig;
use crate::query::DEFAULT_CONTEXT_ATTRIBUTE;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;
mod sources;

/// Version the registry expects registered contexts to carry.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageCtxConfig {
    /// Registry behavior
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Tag printed at the start of every diagnostics line
    #[serde(default = "default_log_tag")]
    pub log_tag: String,

    /// Attribute marking a script element with its context id
    #[serde(default = "default_element_attribute")]
    pub element_attribute: String,

    /// Emit diagnostics even if no context asks for them
    #[serde(default)]
    pub force_diagnostics: bool,

    /// Version compared against each registered context
    #[serde(default = "default_expected_version")]
    pub expected_version: String,
}

fn default_log_tag() -> String {
    "pagectx".to_string()
}

fn default_element_attribute() -> String {
    DEFAULT_CONTEXT_ATTRIBUTE.to_string()
}

fn default_expected_version() -> String {
    VERSION.to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            log_tag: default_log_tag(),
            element_attribute: default_element_attribute(),
            force_diagnostics: false,
            expected_version: default_expected_version(),
        }
    }
}

impl RegistryConfig {
    /// Validate registry configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.log_tag.trim().is_empty() {
            return Err("Log tag cannot be empty".to_string());
        }
        if self.element_attribute.trim().is_empty() {
            return Err("Element attribute cannot be empty".to_string());
        }
        if self.expected_version.trim().is_empty() {
            return Err("Expected version cannot be empty".to_string());
        }
        Ok(())
    }
}

impl PageCtxConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), RegistryError> {
        self.registry
            .validate()
            .map_err(|e| RegistryError::ConfigError(format!("registry: {}", e)))?;
        self.logging
            .validate()
            .map_err(|e| RegistryError::ConfigError(format!("logging: {}", e)))?;
        Ok(())
    }
}

/// Loads [`PageCtxConfig`] from its layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults overlaid with environment variables.
    pub fn load() -> Result<PageCtxConfig, RegistryError> {
        Self::build(None)
    }

    /// Defaults, then `path`, then environment variables. The file must exist.
    pub fn load_from_file(path: &Path) -> Result<PageCtxConfig, RegistryError> {
        Self::build(Some(path))
    }

    fn build(path: Option<&Path>) -> Result<PageCtxConfig, RegistryError> {
        let mut builder = defaults::builder_with_defaults()?;
        if let Some(path) = path {
            builder = sources::add_file(builder, path)?;
        }
        builder = sources::add_environment(builder);

        let config: PageCtxConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
