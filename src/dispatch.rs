//! Invocation counting and dispatch.
//!
//! Module imports happen once per template, but module code has to run once
//! per inclusion of the template in a render. Each script element that loads
//! asks for one invocation; the request bumps the context's pending counter
//! and waits for every template in the chain. When the chain is ready the
//! drain runs the whole chain, in chain order, once per pending request.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, trace};

use crate::context::Context;
use crate::registry::Registry;
use crate::template::{ReadyTemplate, ReadyWaiter};

impl Registry {
    /// Ask for one run of `context_id`'s template chain. Unknown ids are
    /// ignored: nothing on the page was rendered with them.
    pub fn request_invocation(&self, context_id: &str) {
        let context = {
            let mut state = self.inner.state.lock();
            let Some(entry) = state.contexts.entry_mut(context_id) else {
                trace!(context_id, "Invocation requested for unknown context; ignoring");
                return;
            };
            entry.stats.requested += 1;
            entry.stats.pending += 1;
            Arc::clone(&entry.context)
        };
        debug!(context_id, "Invocation requested");
        self.attempt_readiness(context);
    }

    /// Wait for every template in the chain, then drain. Returns immediately;
    /// the join runs as a detached task.
    fn attempt_readiness(&self, context: Arc<Context>) {
        let waiters: Vec<ReadyWaiter> = context
            .templates()
            .iter()
            .map(|name| self.wait_ready(name))
            .collect();

        let this = self.clone();
        self.inner.spawner.spawn(Box::pin(async move {
            let ready: Option<Vec<ReadyTemplate>> = join_all(waiters).await.into_iter().collect();
            match ready {
                Some(chain) => this.drain(&context, &chain),
                None => debug!(context_id = context.id(), "Readiness waiter dropped; skipping drain"),
            }
        }));
    }

    /// Run the chain once per pending invocation. The counter is decremented
    /// before each pass so a request arriving mid-drain is picked up by this
    /// loop or by its own drain, never both.
    fn drain(&self, context: &Context, chain: &[ReadyTemplate]) {
        let diag = &self.inner.diagnostics;
        loop {
            {
                let mut state = self.inner.state.lock();
                let Some(entry) = state.contexts.entry_mut(context.id()) else {
                    return;
                };
                if entry.stats.pending == 0 {
                    return;
                }
                entry.stats.pending -= 1;
                entry.stats.executed += 1;
            }

            let _scope = self.bind_script(context.id().to_string());
            for template in chain {
                diag.context(context, Some(template.name()), "calling");
                for module in template.modules() {
                    module.call(context);
                }
            }
        }
    }
}
