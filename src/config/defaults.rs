//! Built-in defaults, applied before any file or environment source.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

use crate::config::VERSION;
use crate::query::DEFAULT_CONTEXT_ATTRIBUTE;

/// Create a Config builder with registry and logging defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("registry.log_tag", "pagectx")?
        .set_default("registry.element_attribute", DEFAULT_CONTEXT_ATTRIBUTE)?
        .set_default("registry.force_diagnostics", false)?
        .set_default("registry.expected_version", VERSION)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}
