//! Context domain: registration payloads and the id-keyed store.

pub mod payload;
pub mod store;

pub use payload::{Context, ContextPayload, RouterInfo, Values, ROUTER_KEY};
pub use store::{ContextStore, InvocationStats};
