//! Task spawning seam.
//!
//! Loader joins and chain joins run as detached tasks so `install_bundle` and
//! `request_invocation` return immediately. The registry only needs something
//! that can run a boxed future to completion.

use futures::future::BoxFuture;
use tokio::runtime::Handle;

use crate::error::RegistryError;

pub trait Spawn: Send + Sync {
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// Spawns onto a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running on.
    pub fn try_current() -> Result<Self, RegistryError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| RegistryError::NoRuntime)
    }
}

impl Spawn for TokioSpawner {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        // detached; completion is observed through waiters, never the handle
        drop(self.handle.spawn(task));
    }
}
