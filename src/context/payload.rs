//! Context payloads as emitted by the server-side renderer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RegistryError;

/// Values map handed to template code. Opaque to the registry.
pub type Values = Map<String, Value>;

/// Key under which the renderer stores routing information in `values`.
pub const ROUTER_KEY: &str = "__router__";

/// Raw registration payload, one per rendered template instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextPayload {
    /// Unique id assigned by the renderer
    pub id: String,

    /// Renderer version, compared against the registry's version
    pub version: String,

    /// Payload for template code
    #[serde(default)]
    pub values: Values,

    /// Template chain in the order the renderer supplied it
    pub templates: Vec<String>,

    /// Requests diagnostics output for the rest of the page lifetime
    #[serde(default)]
    pub log: bool,
}

impl ContextPayload {
    pub fn new(
        id: impl Into<String>,
        version: impl Into<String>,
        templates: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            values: Values::new(),
            templates: templates.into_iter().map(Into::into).collect(),
            log: false,
        }
    }

    pub fn with_values(mut self, values: Values) -> Self {
        self.values = values;
        self
    }

    pub fn with_log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    /// Parse the JSON object the renderer writes into the page.
    pub fn from_json(raw: &str) -> Result<Self, RegistryError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Routing details the renderer attaches to every context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterInfo {
    pub template: String,
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

/// A registered context. Immutable once stored; invocation counters live
/// in the registry, not here.
#[derive(Debug, Clone)]
pub struct Context {
    id: String,
    version: String,
    values: Values,
    templates: Vec<String>,
    log: bool,
}

impl Context {
    /// Validate a payload into a context. Rejects an empty id, an empty chain,
    /// and blank template names.
    pub fn from_payload(payload: ContextPayload) -> Result<Self, RegistryError> {
        if payload.id.trim().is_empty() {
            return Err(RegistryError::InvalidContext(
                "context id must not be empty".to_string(),
            ));
        }
        if payload.templates.is_empty() {
            return Err(RegistryError::InvalidContext(format!(
                "context {} has an empty template chain",
                payload.id
            )));
        }
        if let Some(pos) = payload.templates.iter().position(|t| t.trim().is_empty()) {
            return Err(RegistryError::InvalidContext(format!(
                "context {} has a blank template name at position {}",
                payload.id, pos
            )));
        }

        Ok(Self {
            id: payload.id,
            version: payload.version,
            values: payload.values,
            templates: payload.templates,
            log: payload.log,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    pub fn log_requested(&self) -> bool {
        self.log
    }

    /// Most-derived template of the chain (the one actually rendered).
    pub fn template(&self) -> &str {
        // from_payload guarantees a non-empty chain
        self.templates.last().map(String::as_str).unwrap_or_default()
    }

    /// Whether `name` appears in this context's chain.
    pub fn includes(&self, name: &str) -> bool {
        self.templates.iter().any(|t| t == name)
    }

    /// Routing details, if the renderer supplied a well-formed `__router__` entry.
    pub fn router(&self) -> Option<RouterInfo> {
        self.values
            .get(ROUTER_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}
