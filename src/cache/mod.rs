//! Dependency cache of discovered records.
//!
//! The cache deduplicates records by `(model id, record id)` and works out
//! the order in which model blocks must be declared so that every reference
//! points at an entry declared earlier.
//!
//! # Ordering
//!
//! Two orders are available:
//!
//! - [`DependencyCache::recency_order`] is the append-and-reverse heuristic:
//!   every [`add`](DependencyCache::add) or [`touch`](DependencyCache::touch)
//!   moves the model id to the end of the touch order, so a model that is
//!   referenced by another ends up after it, and reversing puts it first.
//!   This is only reliable when references are discovered one level at a
//!   time; reaching a deep chain through a second root can break it.
//! - [`DependencyCache::declaration_order`] is a topological order of the
//!   model graph built from [`add_dependency`](DependencyCache::add_dependency)
//!   calls, with ties broken by recency rank. When the heuristic order is
//!   valid the two are identical; when it is not, the graph order still puts
//!   dependencies first.
//!
//! # Example
//!
//! ```rust
//! use fixturegen::cache::DependencyCache;
//! use fixturegen::core::{Attributes, ModelSpec, Record, RecordKey};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let category = Arc::new(ModelSpec::new("Category", Some("id"))?);
//! let product = Arc::new(ModelSpec::new("Product", Some("id"))?);
//!
//! let mut cache = DependencyCache::new();
//! let mut attrs = Attributes::new();
//! attrs.insert("id".into(), json!(1).into());
//! attrs.insert("category_id".into(), RecordKey::new("Category", "9").into());
//! cache.add(Record::new(product, attrs)?);
//!
//! let mut attrs = Attributes::new();
//! attrs.insert("id".into(), json!(9).into());
//! cache.add(Record::new(category, attrs)?);
//! cache.add_dependency("Product", "Category");
//!
//! assert_eq!(cache.declaration_order()?, vec!["Category", "Product"]);
//! # Ok::<(), fixturegen::core::FixtureError>(())
//! ```

mod graph;

pub use graph::ModelGraph;

use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::trace;

use crate::core::{FixtureError, Record, RecordKey};

/// Deduplicating registry of records with declaration ordering.
#[derive(Debug, Default)]
pub struct DependencyCache {
    /// Records per model id, in first-registration order
    registry: HashMap<String, IndexMap<String, Record>>,
    /// Model ids, each at most once, most recently touched last
    touch_order: Vec<String>,
    /// Model-level reference edges
    graph: ModelGraph,
}

impl DependencyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record, replacing any record with the same key.
    ///
    /// The replaced record keeps its position within its model; the model id
    /// moves to the end of the touch order.
    pub fn add(&mut self, record: Record) {
        let model_id = record.model_id().to_string();
        self.touch(&model_id);
        self.graph.add_model(&model_id);

        let records = self.registry.entry(model_id).or_default();
        if let Some(previous) = records.insert(record.record_id().to_string(), record) {
            trace!("Replaced cached record {}", previous.key());
        }
    }

    /// Move a model id to the end of the touch order.
    pub fn touch(&mut self, model_id: &str) {
        if let Some(pos) = self.touch_order.iter().position(|m| m == model_id) {
            self.touch_order.remove(pos);
        }
        self.touch_order.push(model_id.to_string());
    }

    /// Record that records of `from` reference records of `to`.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        self.graph.add_dependency(from, to);
    }

    /// Model ids in touch order, most recently touched last.
    pub fn touch_order(&self) -> &[String] {
        &self.touch_order
    }

    /// The touch order reversed: the append-and-reverse heuristic.
    pub fn recency_order(&self) -> Vec<&str> {
        self.touch_order.iter().rev().map(String::as_str).collect()
    }

    /// Order in which model blocks must be declared, dependencies first.
    ///
    /// Fails with [`FixtureError::CircularDependency`] when models reference
    /// each other in a cycle.
    pub fn declaration_order(&self) -> Result<Vec<String>, FixtureError> {
        let rank: HashMap<&str, usize> = self
            .recency_order()
            .into_iter()
            .enumerate()
            .map(|(i, model)| (model, i))
            .collect();

        self.graph.ordered(&rank, |model| self.registry.contains_key(model))
    }

    /// Direct model dependencies of `model_id`.
    pub fn dependencies_of(&self, model_id: &str) -> Vec<String> {
        self.graph.dependencies(model_id)
    }

    /// Look up a record by key.
    pub fn get(&self, key: &RecordKey) -> Option<&Record> {
        self.registry.get(&key.model_id)?.get(&key.record_id)
    }

    /// Whether a record with this key is registered.
    pub fn contains(&self, key: &RecordKey) -> bool {
        self.get(key).is_some()
    }

    /// Records of one model, in first-registration order.
    pub fn records(&self, model_id: &str) -> impl Iterator<Item = &Record> {
        self.registry.get(model_id).into_iter().flat_map(|records| records.values())
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.registry.values().map(|records| records.len()).sum()
    }

    /// Whether no record has been registered.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Number of models with at least one record.
    pub fn model_count(&self) -> usize {
        self.registry.len()
    }
}
