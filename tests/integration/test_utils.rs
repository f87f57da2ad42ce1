//! Shared test utilities for integration tests
//!
//! Module entrypoints report every run through an unbounded channel so tests
//! can await executions instead of sleeping.

use futures::future::BoxFuture;
use pagectx::template::ModuleFuture;
use pagectx::{ContextPayload, Module, Registry, Values, VERSION};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// One observed run of a module's default export.
#[derive(Debug, Clone)]
pub struct Run {
    pub label: String,
    pub context_id: String,
    pub values: Values,
}

pub struct Recorder {
    tx: UnboundedSender<Run>,
    rx: UnboundedReceiver<Run>,
}

impl Recorder {
    pub fn new() -> Self {
        let (tx, rx) = unbounded_channel();
        Self { tx, rx }
    }

    /// A module whose default export reports to this recorder.
    pub fn module(&self, label: &str) -> Module {
        let tx = self.tx.clone();
        let label = label.to_string();
        Module::with_default(format!("{}.js", label), move |ctx, values| {
            let _ = tx.send(Run {
                label: label.clone(),
                context_id: ctx.id().to_string(),
                values: values.clone(),
            });
        })
    }

    /// Next run, failing the test if none arrives within a second.
    pub async fn next(&mut self) -> Run {
        tokio::time::timeout(Duration::from_secs(1), self.rx.recv())
            .await
            .expect("timed out waiting for a module run")
            .expect("recorder channel closed")
    }

    pub async fn take(&mut self, n: usize) -> Vec<Run> {
        let mut runs = Vec::with_capacity(n);
        for _ in 0..n {
            runs.push(self.next().await);
        }
        runs
    }

    /// Assert nothing else runs within a short window.
    pub async fn assert_quiet(&mut self) {
        let extra = tokio::time::timeout(Duration::from_millis(50), self.rx.recv()).await;
        assert!(extra.is_err(), "unexpected module run: {:?}", extra);
    }
}

/// Counts how many times loaders built from it are called.
#[derive(Clone, Default)]
pub struct LoaderCounter {
    calls: Arc<AtomicUsize>,
}

impl LoaderCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A loader that resolves immediately to `modules`.
    pub fn loader(&self, modules: Vec<Module>) -> impl FnOnce() -> Vec<ModuleFuture> + Send + 'static {
        let calls = Arc::clone(&self.calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            modules.into_iter().map(Module::ready).collect()
        }
    }

    /// A loader whose modules never finish loading.
    pub fn stalled_loader(&self) -> impl FnOnce() -> Vec<ModuleFuture> + Send + 'static {
        let calls = Arc::clone(&self.calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let never: BoxFuture<'static, Module> = Box::pin(futures::future::pending());
            vec![never]
        }
    }
}

pub fn payload(id: &str, templates: &[&str]) -> ContextPayload {
    ContextPayload::new(id, VERSION, templates.iter().copied())
}

pub fn values(pairs: &[(&str, serde_json::Value)]) -> Values {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Registry whose diagnostics lines are captured.
pub fn registry_with_log() -> (Registry, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink_lines = Arc::clone(&lines);
    let registry = Registry::builder()
        .diagnostics_sink(move |line| sink_lines.lock().push(line.to_string()))
        .build()
        .unwrap();
    (registry, lines)
}
