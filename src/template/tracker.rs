//! Per-template readiness state machine.
//!
//! Every template name gets one [`TemplateRecord`], created on first
//! reference by either a context registration or a bundle. The record moves
//! through [`Phase`] monotonically:
//!
//! ```text
//! NoLoader -> LoaderPending -> LoaderRunning -> Ready
//! ```
//!
//! The tracker itself never runs user code or awaits anything. [`TemplateTracker::next_step`]
//! decides what the readiness check should do and hands back a [`Step`] for
//! the caller to carry out after releasing the registry lock.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::template::module::{Loader, Module};
use crate::template::waiter::{ReadyTemplate, ReadyWaiter, WaiterTx};

/// Observable readiness state of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateState {
    /// No bundle has supplied a loader yet
    NoLoader,
    /// Loader installed but nobody has asked for the template
    LoaderPending,
    /// Loader called; waiting on its modules
    LoaderRunning,
    /// Modules loaded
    Ready,
}

impl TemplateState {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateState::NoLoader => "no_loader",
            TemplateState::LoaderPending => "loader_pending",
            TemplateState::LoaderRunning => "loader_running",
            TemplateState::Ready => "ready",
        }
    }
}

impl fmt::Display for TemplateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) enum Phase {
    NoLoader,
    LoaderPending(Loader),
    LoaderRunning,
    Ready(Arc<[Module]>),
}

impl Phase {
    fn state(&self) -> TemplateState {
        match self {
            Phase::NoLoader => TemplateState::NoLoader,
            Phase::LoaderPending(_) => TemplateState::LoaderPending,
            Phase::LoaderRunning => TemplateState::LoaderRunning,
            Phase::Ready(_) => TemplateState::Ready,
        }
    }
}

/// What a readiness check should do once the lock is released.
pub(crate) enum Step {
    /// Nobody is waiting; nothing to do
    Idle,
    /// No loader yet; waiters stay parked
    WaitingForBundle,
    /// Call this loader and join its modules
    InvokeLoader(Loader),
    /// Loader already running
    WaitingOnImports,
    /// Resolve these waiters, oldest first
    Notify(ReadyTemplate, Vec<WaiterTx>),
}

pub(crate) struct TemplateRecord {
    name: Arc<str>,
    contexts: Vec<Arc<Context>>,
    phase: Phase,
    waiters: VecDeque<WaiterTx>,
}

impl TemplateRecord {
    fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            contexts: Vec::new(),
            phase: Phase::NoLoader,
            waiters: VecDeque::new(),
        }
    }

    pub(crate) fn contexts(&self) -> &[Arc<Context>] {
        &self.contexts
    }

    pub(crate) fn state(&self) -> TemplateState {
        self.phase.state()
    }
}

/// All template records, keyed by name.
#[derive(Default)]
pub struct TemplateTracker {
    templates: HashMap<String, TemplateRecord>,
    order: Vec<String>,
}

impl TemplateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, name: &str) -> Option<&TemplateRecord> {
        self.templates.get(name)
    }

    fn entry(&mut self, name: &str) -> &mut TemplateRecord {
        if !self.templates.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.templates
            .entry(name.to_string())
            .or_insert_with(|| TemplateRecord::new(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn state(&self, name: &str) -> Option<TemplateState> {
        self.templates.get(name).map(TemplateRecord::state)
    }

    /// Template names in first-reference order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Number of parked waiters for `name`.
    pub fn waiting(&self, name: &str) -> usize {
        self.templates.get(name).map_or(0, |t| t.waiters.len())
    }

    /// Append `context` to the association list of `name`.
    pub(crate) fn associate(&mut self, name: &str, context: Arc<Context>) {
        self.entry(name).contexts.push(context);
    }

    /// Install a loader. Returns false if one was already installed; the
    /// first loader always wins.
    pub(crate) fn install(&mut self, name: &str, loader: Loader) -> bool {
        let record = self.entry(name);
        match record.phase {
            Phase::NoLoader => {
                record.phase = Phase::LoaderPending(loader);
                true
            }
            _ => false,
        }
    }

    /// Park a new waiter at the back of the queue for `name`.
    pub(crate) fn enqueue_waiter(&mut self, name: &str) -> ReadyWaiter {
        let (tx, waiter) = ReadyWaiter::channel();
        self.entry(name).waiters.push_back(tx);
        waiter
    }

    /// Record the loaded modules. Only the first completion is kept.
    pub(crate) fn complete(&mut self, name: &str, modules: Vec<Module>) -> bool {
        let Some(record) = self.templates.get_mut(name) else {
            return false;
        };
        match record.phase {
            Phase::LoaderRunning => {
                record.phase = Phase::Ready(modules.into());
                true
            }
            _ => false,
        }
    }

    /// The readiness decision. Transitions `LoaderPending` to `LoaderRunning`
    /// when there is someone waiting, and drains the whole queue once ready.
    pub(crate) fn next_step(&mut self, name: &str) -> Step {
        let Some(record) = self.templates.get_mut(name) else {
            return Step::Idle;
        };

        if matches!(record.phase, Phase::NoLoader) {
            return Step::WaitingForBundle;
        }
        // not every template in a bundle is needed on this page
        if record.waiters.is_empty() {
            return Step::Idle;
        }

        match std::mem::replace(&mut record.phase, Phase::LoaderRunning) {
            Phase::LoaderPending(loader) => Step::InvokeLoader(loader),
            Phase::LoaderRunning => Step::WaitingOnImports,
            Phase::Ready(modules) => {
                let ready = ReadyTemplate::new(Arc::clone(&record.name), Arc::clone(&modules));
                record.phase = Phase::Ready(modules);
                Step::Notify(ready, record.waiters.drain(..).collect())
            }
            Phase::NoLoader => {
                record.phase = Phase::NoLoader;
                Step::WaitingForBundle
            }
        }
    }
}
