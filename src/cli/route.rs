//! CLI route: run context and command dispatch.

use std::path::PathBuf;

use tracing::info;

use crate::cli::parse::Commands;
use crate::config::{ConfigLoader, PageCtxConfig};
use crate::error::RegistryError;
use crate::registry::Registry;
use crate::replay::{self, ReplayScript};

/// Runtime context for CLI execution: the loaded configuration.
pub struct RunContext {
    config: PageCtxConfig,
    verbose: bool,
}

impl RunContext {
    /// Load configuration from `config_path`, or defaults plus environment.
    pub fn new(config_path: Option<PathBuf>, verbose: bool) -> Result<Self, RegistryError> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(&path)?,
            None => ConfigLoader::load()?,
        };
        Ok(Self { config, verbose })
    }

    pub fn from_config(config: PageCtxConfig, verbose: bool) -> Self {
        Self { config, verbose }
    }

    pub fn config(&self) -> &PageCtxConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> Result<String, RegistryError> {
        match command {
            Commands::Replay {
                script,
                settle_ms,
                json,
            } => {
                let raw = std::fs::read_to_string(script)?;
                let mut script = ReplayScript::from_json(&raw)?;
                if let Some(ms) = settle_ms {
                    script.settle_ms = *ms;
                }
                let lines = self.replay(&script)?;
                if *json {
                    Ok(serde_json::to_string_pretty(&lines)?)
                } else {
                    Ok(lines.join("\n"))
                }
            }
            Commands::Version => Ok(self.config.registry.expected_version.clone()),
        }
    }

    fn replay(&self, script: &ReplayScript) -> Result<Vec<String>, RegistryError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let mut registry_config = self.config.registry.clone();
        registry_config.force_diagnostics |= self.verbose;

        runtime.block_on(async {
            let registry = Registry::builder().config(registry_config).build()?;
            info!(events = script.events.len(), "Replaying event script");
            replay::run(&registry, script).await
        })
    }
}
