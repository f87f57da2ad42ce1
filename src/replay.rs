//! Scripted replay of page events.
//!
//! A replay script is a JSON list of the three page events (context
//! registration, bundle arrival, invocation request) plus lookups and
//! pauses, in whatever order a page might see them. Running it drives a real
//! [`Registry`] and records what module code ran and what lookups returned.
//!
//! ```json
//! {
//!   "events": [
//!     {"op": "register", "context": {"id": "c1", "version": "1.1.0", "templates": ["app/index"]}},
//!     {"op": "invoke", "context": "c1"},
//!     {"op": "bundle", "templates": [{"name": "app/index", "modules": [{"specifier": "index.js", "delay_ms": 5}]}]},
//!     {"op": "get", "selector": "app/index"}
//!   ]
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::ContextPayload;
use crate::error::RegistryError;
use crate::query::Selector;
use crate::registry::Registry;
use crate::template::{Bundle, Module, ModuleFuture};

fn default_true() -> bool {
    true
}

fn default_settle_ms() -> u64 {
    100
}

/// One simulated module of a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayModule {
    pub specifier: String,

    /// Simulated fetch time
    #[serde(default)]
    pub delay_ms: u64,

    /// Whether the module exports a default function
    #[serde(default = "default_true")]
    pub default_export: bool,
}

/// One template entry of a simulated bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayTemplate {
    pub name: String,
    #[serde(default)]
    pub modules: Vec<ReplayModule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayEvent {
    Register { context: ContextPayload },
    Bundle { templates: Vec<ReplayTemplate> },
    Invoke { context: String },
    Get { selector: Option<String> },
    Sleep { ms: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayScript {
    pub events: Vec<ReplayEvent>,

    /// Time allowed for loaders and drains after the last event
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl ReplayScript {
    pub fn from_json(raw: &str) -> Result<Self, RegistryError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Shared, ordered record of what happened during a replay.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: impl Into<String>) {
        self.lines.lock().push(line.into());
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

fn simulated_module(module: &ReplayModule, trace: &Trace) -> ModuleFuture {
    let specifier = module.specifier.clone();
    let delay = Duration::from_millis(module.delay_ms);
    let default_export = module.default_export;
    let trace = trace.clone();

    async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if default_export {
            let label = specifier.clone();
            Module::with_default(specifier, move |ctx, _| {
                trace.push(format!("run {} for {}", label, ctx.id()));
            })
        } else {
            Module::side_effect(specifier)
        }
    }
    .boxed()
}

fn simulated_bundle(templates: &[ReplayTemplate], trace: &Trace) -> Bundle {
    templates.iter().fold(Bundle::new(), |bundle, template| {
        let modules = template.modules.clone();
        let trace = trace.clone();
        bundle.template(template.name.clone(), move || {
            let specifiers: Vec<&str> = modules.iter().map(|m| m.specifier.as_str()).collect();
            trace.push(format!("load {}", specifiers.join(",")));
            modules.iter().map(|m| simulated_module(m, &trace)).collect()
        })
    })
}

/// Play `script` against `registry`, returning the trace.
pub async fn run(registry: &Registry, script: &ReplayScript) -> Result<Vec<String>, RegistryError> {
    let trace = Trace::new();

    for event in &script.events {
        match event {
            ReplayEvent::Register { context } => {
                match registry.register(context.clone()) {
                    Ok(ctx) => trace.push(format!("register {}", ctx.id())),
                    Err(err) => trace.push(format!("reject {}: {}", context.id, err)),
                }
            }
            ReplayEvent::Bundle { templates } => {
                let names: Vec<&str> = templates.iter().map(|t| t.name.as_str()).collect();
                trace.push(format!("bundle {}", names.join(",")));
                registry.install_bundle(simulated_bundle(templates, &trace));
            }
            ReplayEvent::Invoke { context } => {
                trace.push(format!("invoke {}", context));
                registry.request_invocation(context);
            }
            ReplayEvent::Get { selector } => {
                let label = selector.as_deref().unwrap_or("<current>");
                let line = match registry.get(Selector::from(selector.as_deref())) {
                    Ok(Some(values)) => format!("get {} = {}", label, serde_json::Value::Object(values)),
                    Ok(None) => format!("get {} = <none>", label),
                    Err(err) => format!("get {} failed: {}", label, err),
                };
                trace.push(line);
            }
            ReplayEvent::Sleep { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
        }
        // let freshly spawned loader and drain tasks make progress between events
        tokio::task::yield_now().await;
    }

    tokio::time::sleep(Duration::from_millis(script.settle_ms)).await;
    let lines = trace.lines();
    info!(events = script.events.len(), lines = lines.len(), "Replay finished");
    Ok(lines)
}
