//! Loaded modules, loader functions, and bundles.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::context::{Context, Values};

/// Default export of a module. Called once per pending invocation with the
/// context as receiver and its values as argument.
pub type Entrypoint = Arc<dyn Fn(&Context, &Values) + Send + Sync>;

/// A module that is still being fetched.
pub type ModuleFuture = BoxFuture<'static, Module>;

/// Begins loading every module of one template. Called at most once.
pub type Loader = Box<dyn FnOnce() -> Vec<ModuleFuture> + Send>;

/// A loaded module handle.
#[derive(Clone)]
pub struct Module {
    specifier: String,
    default_export: Option<Entrypoint>,
}

impl Module {
    /// A module that takes effect on import alone (stylesheets and the like).
    pub fn side_effect(specifier: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            default_export: None,
        }
    }

    pub fn with_default<F>(specifier: impl Into<String>, entry: F) -> Self
    where
        F: Fn(&Context, &Values) + Send + Sync + 'static,
    {
        Self {
            specifier: specifier.into(),
            default_export: Some(Arc::new(entry)),
        }
    }

    pub fn specifier(&self) -> &str {
        &self.specifier
    }

    pub fn default_export(&self) -> Option<&Entrypoint> {
        self.default_export.as_ref()
    }

    /// Run the default export, if any. Returns whether anything ran.
    pub fn call(&self, context: &Context) -> bool {
        match &self.default_export {
            Some(entry) => {
                entry(context, context.values());
                true
            }
            None => false,
        }
    }

    /// Wrap an already-available module as a loader result.
    pub fn ready(self) -> ModuleFuture {
        futures::future::ready(self).boxed()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("specifier", &self.specifier)
            .field("has_default", &self.default_export.is_some())
            .finish()
    }
}

/// Loader functions supplied by one bundle, in the order the bundle lists them.
#[derive(Default)]
pub struct Bundle {
    loaders: Vec<(String, Loader)>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a loader for `name`. A later entry for the same name in this bundle
    /// loses to the first, same as across bundles.
    pub fn template<F>(mut self, name: impl Into<String>, loader: F) -> Self
    where
        F: FnOnce() -> Vec<ModuleFuture> + Send + 'static,
    {
        self.loaders.push((name.into(), Box::new(loader)));
        self
    }

    /// Add a loader whose modules resolve from arbitrary futures.
    pub fn template_async<F, Fut>(self, name: impl Into<String>, loader: F) -> Self
    where
        F: FnOnce() -> Vec<Fut> + Send + 'static,
        Fut: Future<Output = Module> + Send + 'static,
    {
        self.template(name, move || loader().into_iter().map(|fut| fut.boxed()).collect())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.loaders.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    pub(crate) fn into_loaders(self) -> Vec<(String, Loader)> {
        self.loaders
    }
}

impl fmt::Debug for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
