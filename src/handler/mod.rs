//! Data-source handlers.
//!
//! A handler queries a data source and exposes its rows as [`Record`]s. Each
//! handler comes with a [`HandlerFactory`] that decides, without side
//! effects, whether it recognizes an object path, and constructs the handler
//! if it does. Factories are kept in a [`HandlerRegistry`] and asked in
//! registration order.
//!
//! # Lifecycle
//!
//! ```text
//! begin → findall(filter) → sets() → fetch(key)* → commit | rollback
//!                                   ↓
//!          model_meta / resolve_references (after the unit of work)
//! ```
//!
//! Only the [`store`] handler ships with fixturegen; see
//! [`HandlerRegistry::with_defaults`].

pub mod filter;
pub mod store;

pub use filter::{Clause, CompareOp, Filter};
pub use store::{StoreHandler, StoreHandlerFactory};

use anyhow::Result;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::cache::DependencyCache;
use crate::config::GenerateOptions;
use crate::core::{AttrValue, FixtureError, Record, RecordKey};
use crate::store::LocatedObject;
use crate::templating::{BlockDef, Reference, RenderValue};

/// Lazy stream of root records produced by [`DataHandler::sets`].
pub type RecordStream = Box<dyn Iterator<Item = Result<Record>>>;

/// Default class name suffix.
pub const DEFAULT_SUFFIX: &str = "Data";

/// How fixture class names are composed from model ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    pub prefix: String,
    pub suffix: String,
}

impl Default for Naming {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}

impl Naming {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// `prefix + model_id + suffix`, e.g. `CategoryData`.
    pub fn class_name(&self, model_id: &str) -> String {
        format!("{}{}{}", self.prefix, model_id, self.suffix)
    }
}

/// A data source exposing rows as records.
pub trait DataHandler {
    /// Name of the handler, e.g. `store`.
    fn name(&self) -> &str;

    fn naming(&self) -> &Naming;

    /// The object this handler was built for, e.g. `shop.Offer`.
    fn describe(&self) -> String;

    /// Start a unit of work.
    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    /// End the unit of work successfully.
    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    /// Abandon the unit of work.
    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    /// Run the query for the handler's object, optionally filtered.
    fn findall(&mut self, filter: Option<&str>) -> Result<()>;

    /// Root records of the last [`findall`](Self::findall).
    ///
    /// The stream is not restartable: a second call yields nothing until the
    /// next query.
    fn sets(&mut self) -> RecordStream;

    /// Load the record a reference points at.
    fn fetch(&mut self, key: &RecordKey) -> Result<Record>;

    /// Metadata lines for a model's block.
    fn model_meta(&self, model_id: &str) -> Vec<(String, String)>;

    /// Fixture class name of a model.
    fn class_name(&self, model_id: &str) -> String {
        self.naming().class_name(model_id)
    }

    /// Attribute map of `record` with every reference turned into an
    /// expression addressing the referenced record's declared entry.
    ///
    /// Every referenced class is added to `block`'s requirements. A
    /// reference to a record that is not in `cache` is an
    /// [`FixtureError::UnresolvedReference`].
    fn resolve_references(
        &self,
        record: &Record,
        cache: &DependencyCache,
        block: &mut BlockDef,
    ) -> Result<IndexMap<String, RenderValue>> {
        let mut resolved = IndexMap::with_capacity(record.attributes().len());
        for (name, value) in record.attributes() {
            let value = match value {
                AttrValue::Literal(literal) => RenderValue::Literal(literal.clone()),
                AttrValue::Ref(key) => {
                    let target =
                        cache.get(key).ok_or_else(|| FixtureError::UnresolvedReference {
                            model: key.model_id.clone(),
                            record_id: key.record_id.clone(),
                        })?;
                    let class_name = self.class_name(&key.model_id);
                    block.add_reference(&class_name);
                    RenderValue::Reference(Reference {
                        class_name,
                        entry_key: target.rendering_key(),
                        field: target.model().key_attr().to_string(),
                    })
                }
            };
            resolved.insert(name.clone(), value);
        }
        Ok(resolved)
    }
}

/// Recognizes objects and constructs the matching [`DataHandler`].
pub trait HandlerFactory {
    /// Name of the handlers this factory builds.
    fn name(&self) -> &str;

    /// Whether this factory handles `object_path`.
    ///
    /// Must not have side effects. `object` is the located store model, if
    /// the path could be located. Return [`FixtureError::UnsupportedHandler`]
    /// when the handler cannot run in this environment at all.
    fn recognizes(
        &self,
        object_path: &str,
        object: Option<&LocatedObject>,
    ) -> Result<bool, FixtureError>;

    /// Construct a handler for a recognized object.
    fn build(
        &self,
        object_path: &str,
        object: Option<LocatedObject>,
        options: &GenerateOptions,
    ) -> Result<Box<dyn DataHandler>>;
}

/// Ordered set of handler factories.
#[derive(Default)]
pub struct HandlerRegistry {
    factories: Vec<Box<dyn HandlerFactory>>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in handlers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(StoreHandlerFactory);
        registry
    }

    /// Append a factory; it is asked after every factory registered before it.
    pub fn register(&mut self, factory: impl HandlerFactory + 'static) {
        debug!("Registered handler '{}'", factory.name());
        self.factories.push(Box::new(factory));
    }

    /// Remove every factory.
    pub fn clear(&mut self) {
        self.factories.clear();
    }

    /// Factory names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.iter().map(|f| f.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.iter().any(|f| f.name() == name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// First factory that recognizes `object_path`.
    ///
    /// Factories reporting [`FixtureError::UnsupportedHandler`] are skipped
    /// with a warning; any other predicate error aborts selection. When no
    /// factory matches, the error lists every factory that was tried.
    pub fn select(
        &self,
        object_path: &str,
        object: Option<&LocatedObject>,
    ) -> Result<&dyn HandlerFactory, FixtureError> {
        for factory in &self.factories {
            match factory.recognizes(object_path, object) {
                Ok(true) => {
                    debug!("Handler '{}' recognizes {object_path}", factory.name());
                    return Ok(factory.as_ref());
                }
                Ok(false) => {}
                Err(err @ FixtureError::UnsupportedHandler { .. }) => {
                    warn!("{err}; skipping");
                }
                Err(err) => return Err(err),
            }
        }

        Err(FixtureError::UnrecognizedObject {
            object_path: object_path.to_string(),
            importable: object.is_some(),
            tried: self.names().into_iter().map(str::to_string).collect(),
        })
    }
}
