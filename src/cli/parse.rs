//! CLI parse: clap types for pagectx. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pagectx CLI - replay page events against a context registry
#[derive(Parser)]
#[command(name = "pagectx")]
#[command(about = "Template context registry with bundle readiness coordination")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (TOML, JSON or YAML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging, including registry diagnostics
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a JSON event script and print the resulting trace
    Replay {
        /// Path to the event script
        script: PathBuf,

        /// Override the script's settle time (milliseconds)
        #[arg(long)]
        settle_ms: Option<u64>,

        /// Print the trace as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Print the registry version contexts are checked against
    Version,
}
