//! Diagnostics: flag-gated trace of the registry's decisions.
//!
//! Lines have the shape `[tag] contextId - templateName - message`. Output is
//! off until a registered context asks for it (or config forces it) and then
//! stays on for the rest of the page.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::context::Context;

/// Receives every emitted diagnostics line.
pub type DiagnosticsSink = Arc<dyn Fn(&str) + Send + Sync>;

pub struct Diagnostics {
    tag: String,
    enabled: AtomicBool,
    sink: Option<DiagnosticsSink>,
}

impl Diagnostics {
    pub fn new(tag: impl Into<String>, enabled: bool, sink: Option<DiagnosticsSink>) -> Self {
        Self {
            tag: tag.into(),
            enabled: AtomicBool::new(enabled),
            sink,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Turn output on. There is no way to turn it back off.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Emit a line about a context. The template defaults to the context's
    /// most-derived template.
    pub fn context(&self, context: &Context, template: Option<&str>, message: &str) {
        if !self.is_enabled() {
            return;
        }
        let template = template.unwrap_or_else(|| context.template());
        self.emit(Some(context.id()), Some(template), message);
    }

    /// Emit a line about a template with no particular context.
    pub fn template(&self, template: &str, message: &str) {
        if !self.is_enabled() {
            return;
        }
        self.emit(None, Some(template), message);
    }

    /// Emit a line with neither context nor template.
    pub fn general(&self, message: &str) {
        if !self.is_enabled() {
            return;
        }
        self.emit(None, None, message);
    }

    fn emit(&self, context_id: Option<&str>, template: Option<&str>, message: &str) {
        let line = format_line(&self.tag, context_id, template, message);
        debug!(
            target: "pagectx::diagnostics",
            context_id = context_id.unwrap_or_default(),
            template = template.unwrap_or_default(),
            "{}",
            line
        );
        if let Some(sink) = &self.sink {
            sink(&line);
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("tag", &self.tag)
            .field("enabled", &self.is_enabled())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// Build one diagnostics line.
pub fn format_line(
    tag: &str,
    context_id: Option<&str>,
    template: Option<&str>,
    message: &str,
) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(3);
    parts.extend(context_id);
    parts.extend(template);
    parts.push(message);
    format!("[{}] {}", tag, parts.join(" - "))
}
