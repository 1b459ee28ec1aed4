//! Output templates for generated fixtures.
//!
//! A [`Template`] turns the per-model [`BlockDef`]s assembled by the
//! generator into text. Two templates ship:
//!
//! - `toml` ([`TomlTemplate`], the default): one `[ClassName]` table per
//!   model with one `[ClassName.key]` sub-table per record
//! - `yaml` ([`YamlTemplate`]): one top-level mapping per model
//!
//! Both accumulate an import header listing every class they rendered, which
//! the generator places before everything else.
//!
//! # Lifecycle
//!
//! 1. [`Template::begin`] resets per-run state
//! 2. [`Template::header`] produces the banner for the handler in use
//! 3. [`Template::render_block`] is called once per model, dependencies first
//! 4. [`Template::import_header`] returns the preamble accumulated in step 3

pub mod renderer;
mod toml_format;
mod yaml_format;

pub use renderer::TemplateRenderer;
pub use toml_format::TomlTemplate;
pub use yaml_format::YamlTemplate;

use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::core::{FixtureError, did_you_mean};
use crate::handler::DataHandler;

/// Name of the template used when none is configured.
pub const DEFAULT_TEMPLATE: &str = "toml";

/// Top-level name of the import header; no block may use it.
pub const PREAMBLE_NAME: &str = "fixture";

/// A reference expression addressing a declared entry of another block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Class of the referenced block, e.g. `CategoryData`
    pub class_name: String,
    /// Rendering key of the referenced entry, e.g. `category_9`
    pub entry_key: String,
    /// Identifying attribute of the referenced model, e.g. `id`
    pub field: String,
}

impl Reference {
    /// `ClassName.entry_key`
    pub fn target(&self) -> String {
        format!("{}.{}", self.class_name, self.entry_key)
    }
}

/// An attribute value ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderValue {
    Literal(Value),
    Reference(Reference),
}

/// Everything needed to render one model's block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDef {
    class_name: String,
    model_id: String,
    meta: Vec<(String, String)>,
    requires: Vec<String>,
    rows: Vec<(String, IndexMap<String, RenderValue>)>,
}

impl BlockDef {
    pub fn new(class_name: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            model_id: model_id.into(),
            meta: Vec::new(),
            requires: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Add a metadata line such as `("model", "shop.Category")`.
    pub fn add_meta(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.meta.push((name.into(), value.into()));
    }

    /// Note that a row of this block references `class_name`.
    ///
    /// Each class is listed once, in first-reference order. References to
    /// the block's own class are not listed.
    pub fn add_reference(&mut self, class_name: &str) {
        if class_name != self.class_name && !self.requires.iter().any(|c| c == class_name) {
            self.requires.push(class_name.to_string());
        }
    }

    /// Append a `(rendering key, attributes)` row.
    pub fn add_row(&mut self, key: impl Into<String>, attributes: IndexMap<String, RenderValue>) {
        self.rows.push((key.into(), attributes));
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn meta(&self) -> &[(String, String)] {
        &self.meta
    }

    /// Referenced classes, in first-reference order.
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    pub fn rows(&self) -> &[(String, IndexMap<String, RenderValue>)] {
        &self.rows
    }
}

/// Renders fixture blocks in one output syntax.
pub trait Template {
    /// Registry name, e.g. `toml`.
    fn name(&self) -> &str;

    /// Reset state accumulated by a previous run.
    fn begin(&mut self);

    /// Banner describing what was generated and by which handler.
    fn header(&self, handler: &dyn DataHandler) -> Result<String>;

    /// Render one model block and remember its class for the import header.
    fn render_block(&mut self, block: &BlockDef) -> Result<String>;

    /// Preamble listing the rendered classes.
    fn import_header(&self) -> Result<String>;
}

/// Lookup of the built-in templates by name.
pub struct TemplateRegistry;

impl TemplateRegistry {
    /// Names of the available templates.
    pub const NAMES: [&'static str; 2] = ["toml", "yaml"];

    /// Construct the template called `name`.
    ///
    /// Unknown names are usage errors, with a suggestion when a known name
    /// is close.
    pub fn find(name: &str) -> Result<Box<dyn Template>> {
        match name {
            "toml" => Ok(Box::new(TomlTemplate::new()?)),
            "yaml" | "yml" => Ok(Box::new(YamlTemplate::new()?)),
            _ => {
                let mut message = format!(
                    "unknown template '{name}' (available: {})",
                    Self::NAMES.join(", ")
                );
                if let Some(close) = did_you_mean(name, Self::NAMES) {
                    message.push_str(&format!("; did you mean '{close}'?"));
                }
                Err(FixtureError::usage(message).into())
            }
        }
    }
}

/// Reject a block whose class would collide with the import header.
fn check_class_name(block: &BlockDef) -> Result<()> {
    if block.class_name() == PREAMBLE_NAME {
        return Err(FixtureError::usage(format!(
            "class name '{PREAMBLE_NAME}' of model '{}' collides with the fixture preamble; \
             set a different --prefix or --suffix",
            block.model_id()
        ))
        .into());
    }
    Ok(())
}

/// Target-syntax formatting used to build template views.
trait Syntax {
    /// An attribute or metadata name.
    fn key(name: &str) -> String;

    /// A string scalar.
    fn string(value: &str) -> String;

    /// A literal value; `None` drops the attribute.
    fn literal(value: &Value) -> Option<String>;

    /// A reference expression.
    fn reference(reference: &Reference) -> String;
}

#[derive(Debug, Serialize)]
struct Line {
    name: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct RowView {
    key: String,
    attrs: Vec<Line>,
}

/// Pre-formatted view of a [`BlockDef`] handed to Tera.
#[derive(Debug, Serialize)]
struct BlockView {
    class_name: String,
    meta: Vec<Line>,
    requires: Vec<String>,
    rows: Vec<RowView>,
}

impl BlockView {
    fn build<S: Syntax>(block: &BlockDef) -> Self {
        let meta = block
            .meta()
            .iter()
            .map(|(name, value)| Line {
                name: S::key(name),
                value: S::string(value),
            })
            .collect();

        let rows = block
            .rows()
            .iter()
            .map(|(key, attributes)| RowView {
                key: S::key(key),
                attrs: attributes
                    .iter()
                    .filter_map(|(name, value)| {
                        let value = match value {
                            RenderValue::Literal(literal) => S::literal(literal)?,
                            RenderValue::Reference(reference) => S::reference(reference),
                        };
                        Some(Line {
                            name: S::key(name),
                            value,
                        })
                    })
                    .collect(),
            })
            .collect();

        Self {
            class_name: S::key(block.class_name()),
            meta,
            requires: block.requires().iter().map(|class| S::string(class)).collect(),
            rows,
        }
    }
}

#[derive(Debug, Serialize)]
struct HeaderView<'a> {
    object: &'a str,
    handler: &'a str,
}

#[derive(Debug, Serialize)]
struct ImportView {
    template: String,
    classes: Vec<String>,
}
