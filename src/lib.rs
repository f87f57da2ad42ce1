//! pagectx: Template Context Registry
//!
//! Reconciles three events that reach a rendered page in no particular
//! order: a template instance registering its data context, a bundle
//! installing loader functions for template code, and an inserted script
//! element asking for that code to run. Module imports happen once per
//! template; module code runs once per invocation request, in template-chain
//! order, after every template in the chain has loaded.

pub mod cli;
pub mod config;
pub mod context;
pub mod diagnostics;
mod dispatch;
pub mod error;
pub mod logging;
pub mod query;
pub mod registry;
pub mod replay;
mod scope;
pub mod spawn;
pub mod template;

pub use config::{PageCtxConfig, RegistryConfig, VERSION};
pub use context::{Context, ContextPayload, InvocationStats, RouterInfo, Values};
pub use error::RegistryError;
pub use query::{ScriptElement, Selector};
pub use registry::{global, install_global, Registry, RegistryBuilder};
pub use scope::ScriptScope;
pub use template::{Bundle, Module, ReadyTemplate, ReadyWaiter, TemplateState};
