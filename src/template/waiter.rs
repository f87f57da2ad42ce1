//! Readiness waiters handed out by the tracker.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use tokio::sync::oneshot;

use crate::template::module::Module;

/// A template whose modules have all finished loading.
#[derive(Debug, Clone)]
pub struct ReadyTemplate {
    name: Arc<str>,
    modules: Arc<[Module]>,
}

impl ReadyTemplate {
    pub(crate) fn new(name: Arc<str>, modules: Arc<[Module]>) -> Self {
        Self { name, modules }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }
}

pub(crate) type WaiterTx = oneshot::Sender<ReadyTemplate>;

/// Resolves once the template is ready.
///
/// There is no timeout: a template whose bundle never arrives, or whose
/// imports never settle, leaves this pending forever. Wrap it in
/// `tokio::time::timeout` when that matters. Resolves to `None` only if the
/// registry itself was dropped.
#[derive(Debug)]
pub struct ReadyWaiter {
    rx: oneshot::Receiver<ReadyTemplate>,
}

impl ReadyWaiter {
    pub(crate) fn channel() -> (WaiterTx, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    #[cfg(test)]
    pub(crate) fn try_take(&mut self) -> Option<ReadyTemplate> {
        self.rx.try_recv().ok()
    }
}

impl Future for ReadyWaiter {
    type Output = Option<ReadyTemplate>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}
