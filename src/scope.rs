//! Current-script bindings.
//!
//! A binding belongs to the thread that made it. Module code runs
//! synchronously inside a drain, so a per-thread stack is enough for
//! `Selector::Current` to see the context being executed while other drains
//! run on other worker threads.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id, used for registries and scope tokens.
pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

struct Binding {
    registry: u64,
    token: u64,
    context_id: String,
}

thread_local! {
    static BINDINGS: RefCell<Vec<Binding>> = RefCell::new(Vec::new());
}

pub(crate) fn bind(registry: u64, context_id: String) -> ScriptScope {
    let token = next_id();
    BINDINGS.with(|bindings| {
        bindings.borrow_mut().push(Binding {
            registry,
            token,
            context_id,
        })
    });
    ScriptScope {
        token: Some(token),
        _thread: PhantomData,
    }
}

pub(crate) fn unbound() -> ScriptScope {
    ScriptScope {
        token: None,
        _thread: PhantomData,
    }
}

/// Innermost context id bound for `registry` on this thread.
pub(crate) fn current(registry: u64) -> Option<String> {
    BINDINGS.with(|bindings| {
        bindings
            .borrow()
            .iter()
            .rev()
            .find(|b| b.registry == registry)
            .map(|b| b.context_id.clone())
    })
}

/// Keeps a script binding alive on the current thread. Dropping it removes
/// exactly this binding, whatever order scopes are dropped in.
#[derive(Debug)]
#[must_use = "the script binding ends when the scope is dropped"]
pub struct ScriptScope {
    token: Option<u64>,
    // bindings are per thread; the guard must not move to another one
    _thread: PhantomData<*const ()>,
}

impl ScriptScope {
    pub fn is_bound(&self) -> bool {
        self.token.is_some()
    }
}

impl Drop for ScriptScope {
    fn drop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };
        // the thread-local may already be gone during thread teardown
        let _ = BINDINGS.try_with(|bindings| {
            let mut bindings = bindings.borrow_mut();
            if let Some(pos) = bindings.iter().rposition(|b| b.token == token) {
                bindings.remove(pos);
            }
        });
    }
}
