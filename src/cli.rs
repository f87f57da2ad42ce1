//! CLI domain: parse and route only. Registry behavior lives in the library.

mod parse;
mod route;

pub use parse::{Cli, Commands};
pub use route::RunContext;

/// Render an error for the terminal.
pub fn map_error(e: &crate::error::RegistryError) -> String {
    e.to_string()
}
