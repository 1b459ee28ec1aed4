//! Store documents: model schemas plus rows, loaded from JSON, YAML or TOML.
//!
//! A store document describes the data the store handler serves:
//!
//! ```toml
//! [models.Category]
//! key = "id"
//! table = "categories"
//! rows = [{ id = 9, name = "parkas" }]
//!
//! [models.Product]
//! key = "id"
//! references = { category_id = "Category" }
//! rows = [{ id = 1, name = "jersey", category_id = 9 }]
//! ```
//!
//! Every model names its identifying `key` attribute. `references` maps an
//! attribute to the model whose key it holds. `variable` overrides the
//! variable name used in rendering keys.

mod locator;

pub use locator::{LocatedObject, ObjectLocator};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::core::FixtureError;

/// One row of a store model, attribute name to value.
pub type Row = IndexMap<String, Value>;

/// Top-level store document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreDocument {
    /// Models by id, in document order
    #[serde(default)]
    pub models: IndexMap<String, ModelDefinition>,
}

/// Schema and rows of one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDefinition {
    /// Identifying attribute of each row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Variable name override for rendering keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,

    /// Backing table name, reported as block metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Foreign-key attributes and the model each one points at
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub references: IndexMap<String, String>,

    #[serde(default)]
    pub rows: Vec<Row>,
}

impl StoreDocument {
    /// Look up a model definition.
    pub fn model(&self, model_id: &str) -> Option<&ModelDefinition> {
        self.models.get(model_id)
    }

    /// Model ids in document order.
    pub fn model_ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

/// Serialization format of a store document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreFormat {
    #[default]
    Json,
    Yaml,
    Toml,
}

impl StoreFormat {
    /// File extensions tried when locating a module, in search order.
    pub const EXTENSIONS: [&'static str; 4] = ["json", "yaml", "yml", "toml"];

    /// Determine the format from a file extension.
    ///
    /// ```rust
    /// use fixturegen::store::StoreFormat;
    ///
    /// assert_eq!(StoreFormat::from_extension("yml"), Some(StoreFormat::Yaml));
    /// assert_eq!(StoreFormat::from_extension("TOML"), Some(StoreFormat::Toml));
    /// assert_eq!(StoreFormat::from_extension("xml"), None);
    /// ```
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    /// Determine the format from a file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|ext| ext.to_str()).and_then(Self::from_extension)
    }

    /// Parse document text in this format.
    ///
    /// `file` only labels the error.
    pub fn parse(self, content: &str, file: &str) -> Result<StoreDocument, FixtureError> {
        let parsed = match self {
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|reason| FixtureError::StoreParseError {
            file: file.to_string(),
            reason,
        })
    }
}

/// Read and parse a store document, picking the format from its extension.
pub fn load(path: &Path) -> Result<StoreDocument> {
    let format = StoreFormat::from_path(path).ok_or_else(|| FixtureError::StoreParseError {
        file: path.display().to_string(),
        reason: format!(
            "unsupported extension (expected one of: {})",
            StoreFormat::EXTENSIONS.join(", ")
        ),
    })?;

    let content = std::fs::read_to_string(path)
        .map_err(|e| FixtureError::io("read store document", path.display(), &e))?;

    let document = format
        .parse(&content, &path.display().to_string())
        .with_context(|| format!("Failed to load store document {}", path.display()))?;
    Ok(document)
}
