//! Query façade: resolve a selector to contexts.
//!
//! Resolution order:
//! 1. [`Selector::Current`]: the context bound to the currently executing
//!    script, else the most recently registered context.
//! 2. [`Selector::Name`] naming a known template: every context whose chain
//!    includes it, in registration order.
//! 3. [`Selector::Name`] naming a context id: that context.
//! 4. [`Selector::Element`]: the context named by the element's marker
//!    attribute.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::{Context, ContextStore};
use crate::error::RegistryError;
use crate::template::TemplateTracker;

/// Default marker attribute placed on inserted script elements.
pub const DEFAULT_CONTEXT_ATTRIBUTE: &str = "data-context";

/// Handle to a page element, reduced to what selector resolution needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
    tag: String,
    attributes: HashMap<String, String>,
}

impl ScriptElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: HashMap::new(),
        }
    }

    /// A `<script>` element.
    pub fn script() -> Self {
        Self::new("script")
    }

    /// A `<script>` element carrying the default marker for `context_id`.
    pub fn for_context(context_id: impl Into<String>) -> Self {
        Self::script().with_attribute(DEFAULT_CONTEXT_ATTRIBUTE, context_id)
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The marked context id. Only script elements with a non-empty marker count.
    pub fn context_id(&self, attribute: &str) -> Option<&str> {
        if !self.tag.eq_ignore_ascii_case("script") {
            return None;
        }
        self.attribute(attribute).filter(|id| !id.is_empty())
    }
}

/// What to look up.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selector {
    /// Whatever is in scope right now
    #[default]
    Current,
    /// A template name, or failing that a context id
    Name(String),
    /// A script element bearing a context marker
    Element(ScriptElement),
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::Name(name.to_string())
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::Name(name)
    }
}

impl From<ScriptElement> for Selector {
    fn from(element: ScriptElement) -> Self {
        Selector::Element(element)
    }
}

impl From<Option<&str>> for Selector {
    fn from(name: Option<&str>) -> Self {
        name.map_or(Selector::Current, Selector::from)
    }
}

/// Resolve `selector` against the stores. `current_script` is the context id
/// bound to the executing script, if any.
pub(crate) fn resolve(
    contexts: &ContextStore,
    templates: &TemplateTracker,
    current_script: Option<&str>,
    attribute: &str,
    selector: &Selector,
) -> Result<Vec<Arc<Context>>, RegistryError> {
    match selector {
        Selector::Current => {
            if let Some(id) = current_script {
                return Ok(by_id(contexts, id));
            }
            contexts
                .last()
                .map(|ctx| vec![Arc::clone(ctx)])
                .ok_or(RegistryError::UnresolvedSelector)
        }
        Selector::Name(name) => {
            if let Some(template) = templates.get(name) {
                return Ok(template.contexts().to_vec());
            }
            Ok(by_id(contexts, name))
        }
        Selector::Element(element) => Ok(element
            .context_id(attribute)
            .map(|id| by_id(contexts, id))
            .unwrap_or_default()),
    }
}

fn by_id(contexts: &ContextStore, id: &str) -> Vec<Arc<Context>> {
    contexts.get(id).map(|ctx| vec![Arc::clone(ctx)]).unwrap_or_default()
}
