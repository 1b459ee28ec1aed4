//! Tera engine wrapper for fixture templates.
//!
//! Templates are registered once at construction and rendered by name with a
//! context serialized from plain view structs. Autoescaping is off: values
//! are already formatted for the target syntax before they reach Tera.

use anyhow::{Context, Result};
use serde::Serialize;
use tera::{Context as TeraContext, Tera};

/// Named-template renderer backed by a private Tera instance.
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Register `templates` as `(name, source)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if any template fails to parse.
    pub fn new(templates: &[(&str, &str)]) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_templates(templates.iter().copied())
            .map_err(|e| anyhow::anyhow!(format_tera_error(&e)))
            .context("Failed to register fixture templates")?;

        Ok(Self {
            tera,
        })
    }

    /// Render template `name` with `view` as its context.
    pub fn render<T: Serialize>(&self, name: &str, view: &T) -> Result<String> {
        let context = TeraContext::from_serialize(view)
            .map_err(|e| anyhow::anyhow!(format_tera_error(&e)))
            .with_context(|| format!("Failed to build context for template '{name}'"))?;

        tracing::trace!("Rendering template '{name}'");
        self.tera
            .render(name, &context)
            .map_err(|e| anyhow::anyhow!(format_tera_error(&e)))
            .with_context(|| format!("Failed to render template '{name}'"))
    }

    /// Names of the registered templates, sorted.
    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tera.get_template_names().collect();
        names.sort_unstable();
        names
    }
}

/// Flatten a Tera error and its sources into one line.
///
/// Tera nests the useful message (an unknown variable, a parse position)
/// inside generic "Failed to render" wrappers; the wrappers are dropped.
pub fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error;

    let mut messages = vec![error.to_string()];
    let mut current: Option<&dyn Error> = error.source();
    while let Some(err) = current {
        messages.push(err.to_string());
        current = err.source();
    }

    let useful: Vec<String> = messages
        .into_iter()
        .map(|msg| msg.trim().to_string())
        .filter(|msg| !msg.is_empty() && !msg.starts_with("Failed to render"))
        .collect();

    if useful.is_empty() {
        error.to_string()
    } else {
        useful.join(": ")
    }
}
