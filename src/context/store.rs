//! In-memory context store.
//!
//! Holds every registered context by id together with its invocation
//! counters, plus the most recently registered context. Contexts are never
//! removed; the store lives as long as the page.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::payload::Context;

/// Invocation bookkeeping for one context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvocationStats {
    /// Total invocation requests received
    pub requested: u64,
    /// Drain passes that actually ran the template chain
    pub executed: u64,
    /// Requests not yet drained
    pub pending: u64,
}

#[derive(Debug)]
pub(crate) struct ContextEntry {
    pub(crate) context: Arc<Context>,
    pub(crate) stats: InvocationStats,
}

/// Context store keyed by context id.
#[derive(Debug, Default)]
pub struct ContextStore {
    entries: HashMap<String, ContextEntry>,
    order: Vec<String>,
    last: Option<Arc<Context>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a context and mark it as the most recent. A context with the
    /// same id replaces the stored payload but keeps its counters; the
    /// replaced context is returned.
    pub fn insert(&mut self, context: Arc<Context>) -> Option<Arc<Context>> {
        self.last = Some(Arc::clone(&context));
        match self.entries.get_mut(context.id()) {
            Some(entry) => Some(std::mem::replace(&mut entry.context, context)),
            None => {
                self.order.push(context.id().to_string());
                self.entries.insert(
                    context.id().to_string(),
                    ContextEntry {
                        context,
                        stats: InvocationStats::default(),
                    },
                );
                None
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Context>> {
        self.entries.get(id).map(|e| &e.context)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn last(&self) -> Option<&Arc<Context>> {
        self.last.as_ref()
    }

    pub fn stats(&self, id: &str) -> Option<InvocationStats> {
        self.entries.get(id).map(|e| e.stats)
    }

    /// Contexts in first-registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Context>> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(|e| &e.context)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entry_mut(&mut self, id: &str) -> Option<&mut ContextEntry> {
        self.entries.get_mut(id)
    }
}
