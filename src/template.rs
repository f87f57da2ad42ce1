//! Template domain: loaded modules, bundles, and the readiness tracker.

pub mod module;
pub mod tracker;
pub mod waiter;

pub use module::{Bundle, Entrypoint, Loader, Module, ModuleFuture};
pub use tracker::{TemplateState, TemplateTracker};
pub use waiter::{ReadyTemplate, ReadyWaiter};
