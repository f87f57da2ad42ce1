//! Page-wide context registry.
//!
//! One [`Registry`] exists per page. Rendered template instances register
//! their contexts, bundles install loader functions, and inserted script
//! elements request invocations; those three arrive in any order and the
//! registry runs each template's module code once everything it depends on
//! has loaded.
//!
//! The registry is cheap to clone (it is an `Arc` inside). State sits behind
//! a single `parking_lot::Mutex` that is never held while loaders, module
//! entrypoints, or diagnostics sinks run, so user code may call back into the
//! registry freely.

use std::fmt;
use std::sync::{Arc, OnceLock};

use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::RegistryConfig;
use crate::context::{Context, ContextPayload, ContextStore, InvocationStats, Values};
use crate::diagnostics::{Diagnostics, DiagnosticsSink};
use crate::error::RegistryError;
use crate::query::{self, ScriptElement, Selector};
use crate::scope::{self, ScriptScope};
use crate::spawn::{Spawn, TokioSpawner};
use crate::template::tracker::Step;
use crate::template::{Bundle, Module, ReadyWaiter, TemplateState, TemplateTracker};

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Install the page's registry. Fails if one is already installed.
pub fn install_global(registry: Registry) -> Result<&'static Registry, RegistryError> {
    GLOBAL
        .set(registry)
        .map_err(|_| RegistryError::GlobalAlreadyInstalled)?;
    GLOBAL.get().ok_or(RegistryError::GlobalAlreadyInstalled)
}

/// The page's registry, if one has been installed.
pub fn global() -> Option<&'static Registry> {
    GLOBAL.get()
}

pub(crate) struct RegistryState {
    pub(crate) contexts: ContextStore,
    pub(crate) templates: TemplateTracker,
}

pub(crate) struct Inner {
    /// Keys this registry's script bindings
    pub(crate) id: u64,
    pub(crate) state: Mutex<RegistryState>,
    pub(crate) spawner: Arc<dyn Spawn>,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) config: RegistryConfig,
}

#[derive(Clone)]
pub struct Registry {
    pub(crate) inner: Arc<Inner>,
}

/// Builder for [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    config: RegistryConfig,
    spawner: Option<Arc<dyn Spawn>>,
    sink: Option<DiagnosticsSink>,
}

impl RegistryBuilder {
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn spawner(mut self, spawner: Arc<dyn Spawn>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Forward every diagnostics line to `sink` in addition to `tracing`.
    pub fn diagnostics_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Build the registry. Without an explicit spawner this needs to run
    /// inside a tokio runtime.
    pub fn build(self) -> Result<Registry, RegistryError> {
        self.config.validate().map_err(RegistryError::ConfigError)?;
        let spawner = match self.spawner {
            Some(spawner) => spawner,
            None => Arc::new(TokioSpawner::try_current()?),
        };
        let diagnostics = Diagnostics::new(
            self.config.log_tag.clone(),
            self.config.force_diagnostics,
            self.sink,
        );

        Ok(Registry {
            inner: Arc::new(Inner {
                id: scope::next_id(),
                state: Mutex::new(RegistryState {
                    contexts: ContextStore::new(),
                    templates: TemplateTracker::new(),
                }),
                spawner,
                diagnostics,
                config: self.config,
            }),
        })
    }
}

impl Registry {
    /// Registry with default configuration on the current tokio runtime.
    pub fn new() -> Result<Self, RegistryError> {
        Self::builder().build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.inner.diagnostics
    }

    /// Store a rendered template instance's context.
    ///
    /// A version different from the registry's is logged and otherwise
    /// ignored. A malformed payload (empty id or chain) is logged and
    /// rejected without touching any state.
    pub fn register(&self, payload: ContextPayload) -> Result<Arc<Context>, RegistryError> {
        let diag = &self.inner.diagnostics;
        let context = match Context::from_payload(payload) {
            Ok(context) => Arc::new(context),
            Err(err) => {
                warn!(error = %err, "Rejected context registration");
                diag.general(&format!("rejected context: {}", err));
                return Err(err);
            }
        };
        if context.log_requested() {
            diag.enable();
        }

        let expected = &self.inner.config.expected_version;
        if context.version() != expected {
            warn!(
                context_id = context.id(),
                context_version = context.version(),
                expected_version = %expected,
                "Context version differs from registry version; unexpected behavior may occur"
            );
            diag.context(
                &context,
                None,
                &format!(
                    "server version {} is different from registry version {} - unexpected behavior may occur",
                    context.version(),
                    expected
                ),
            );
        }
        diag.context(&context, None, "creating context");

        let replaced = {
            let mut state = self.inner.state.lock();
            let replaced = state.contexts.insert(Arc::clone(&context));
            for name in context.templates() {
                state.templates.associate(name, Arc::clone(&context));
            }
            replaced
        };
        if replaced.is_some() {
            warn!(context_id = context.id(), "Context id registered twice; replacing payload");
        }
        debug!(context_id = context.id(), template = context.template(), "Registered context");

        Ok(context)
    }

    /// Parse and register the JSON payload the renderer emits.
    pub fn register_json(&self, raw: &str) -> Result<Arc<Context>, RegistryError> {
        self.register(ContextPayload::from_json(raw)?)
    }

    /// Install a bundle's loaders. A template that already has a loader keeps
    /// it. Every template named by the bundle gets a readiness check, so
    /// waiters parked before the bundle arrived start loading now.
    pub fn install_bundle(&self, bundle: Bundle) {
        let names: Vec<String> = bundle.names().map(str::to_string).collect();
        self.inner.diagnostics.general(&format!(
            "initializing loaders in bundle: {}",
            names.join(", ")
        ));

        {
            let mut state = self.inner.state.lock();
            for (name, loader) in bundle.into_loaders() {
                if !state.templates.install(&name, loader) {
                    debug!(template = %name, "Loader already installed; keeping the first");
                }
            }
        }

        for name in &names {
            self.check_ready(name);
        }
    }

    /// A future that resolves when `name` is ready. Creates the template
    /// record if this is its first reference.
    pub fn wait_ready(&self, name: &str) -> ReadyWaiter {
        let waiter = self.inner.state.lock().templates.enqueue_waiter(name);
        self.check_ready(name);
        waiter
    }

    /// Run one readiness check for `name` and carry out its decision.
    pub(crate) fn check_ready(&self, name: &str) {
        let step = self.inner.state.lock().templates.next_step(name);
        let diag = &self.inner.diagnostics;

        match step {
            Step::Idle => {}
            Step::WaitingForBundle => diag.template(name, "waiting for bundle"),
            Step::WaitingOnImports => diag.template(name, "waiting on dynamic imports"),
            Step::InvokeLoader(loader) => {
                diag.template(name, "calling loader");
                let pending = loader();
                let this = self.clone();
                let name = name.to_string();
                self.inner.spawner.spawn(Box::pin(async move {
                    let modules = join_all(pending).await;
                    this.finish_loading(&name, modules);
                }));
            }
            Step::Notify(ready, waiters) => {
                for tx in waiters {
                    diag.template(name, "dynamic imports loaded");
                    // a dropped waiter just means nobody is listening anymore
                    let _ = tx.send(ready.clone());
                }
            }
        }
    }

    fn finish_loading(&self, name: &str, modules: Vec<Module>) {
        let count = modules.len();
        let stored = self.inner.state.lock().templates.complete(name, modules);
        if stored {
            debug!(template = %name, modules = count, "Template modules loaded");
            self.check_ready(name);
        }
    }

    /// Values of the most recent context matching `selector`, or `None` if
    /// nothing matches.
    pub fn get(&self, selector: impl Into<Selector>) -> Result<Option<Values>, RegistryError> {
        Ok(self
            .get_all(selector)?
            .last()
            .map(|context| context.values().clone()))
    }

    /// Every context matching `selector`, oldest first.
    pub fn get_all(
        &self,
        selector: impl Into<Selector>,
    ) -> Result<Vec<Arc<Context>>, RegistryError> {
        let selector = selector.into();
        let current = scope::current(self.inner.id);
        let state = self.inner.state.lock();
        query::resolve(
            &state.contexts,
            &state.templates,
            current.as_deref(),
            &self.inner.config.element_attribute,
            &selector,
        )
    }

    /// Mark `element` as the currently executing script on this thread until
    /// the returned guard drops. Elements without a context marker leave the
    /// scope as is.
    pub fn enter_script(&self, element: &ScriptElement) -> ScriptScope {
        let id = element
            .context_id(&self.inner.config.element_attribute)
            .map(str::to_string);
        match id {
            Some(id) => self.bind_script(id),
            None => scope::unbound(),
        }
    }

    pub(crate) fn bind_script(&self, context_id: String) -> ScriptScope {
        scope::bind(self.inner.id, context_id)
    }

    pub fn context(&self, id: &str) -> Option<Arc<Context>> {
        self.inner.state.lock().contexts.get(id).cloned()
    }

    /// All contexts in registration order.
    pub fn contexts(&self) -> Vec<Arc<Context>> {
        self.inner.state.lock().contexts.iter().cloned().collect()
    }

    pub fn last_context(&self) -> Option<Arc<Context>> {
        self.inner.state.lock().contexts.last().cloned()
    }

    pub fn template_state(&self, name: &str) -> Option<TemplateState> {
        self.inner.state.lock().templates.state(name)
    }

    /// Template names in first-reference order.
    pub fn template_names(&self) -> Vec<String> {
        self.inner.state.lock().templates.names().to_vec()
    }

    pub fn invocation_stats(&self, id: &str) -> Option<InvocationStats> {
        self.inner.state.lock().contexts.stats(id)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Registry")
            .field("contexts", &state.contexts.len())
            .field("templates", &state.templates.names().len())
            .field("diagnostics", &self.inner.diagnostics)
            .finish()
    }
}
