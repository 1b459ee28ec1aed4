//! Fixture generation: handler selection, discovery and rendering.
//!
//! [`Generator::resolve`] runs one generation:
//!
//! 1. Check that every required handler is registered
//! 2. Locate the object and select the first handler factory that
//!    recognizes it
//! 3. **Discovery**: inside the handler's unit of work, query the root
//!    records and walk every reference, registering each record in a fresh
//!    [`DependencyCache`]. Any failure rolls the unit of work back once and
//!    is returned unchanged.
//! 4. **Rendering**: read-only over the cache. One block per model in
//!    declaration order, each reference turned into an expression that
//!    addresses an entry declared earlier.
//!
//! # Example
//!
//! ```rust,no_run
//! use fixturegen::config::GenerateOptions;
//! use fixturegen::generator::Generator;
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut generator = Generator::new(GenerateOptions::new("."))?;
//! let text = generator.resolve("shop.Offer", Some("id = 1"))?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::cache::DependencyCache;
use crate::config::GenerateOptions;
use crate::core::{FixtureError, Record, RecordKey, did_you_mean};
use crate::handler::{DataHandler, HandlerRegistry};
use crate::store::{LocatedObject, ObjectLocator};
use crate::templating::{BlockDef, Template, TemplateRegistry};

/// Drives one or more generation runs with a fixed registry and template.
pub struct Generator {
    registry: HandlerRegistry,
    options: GenerateOptions,
    template: Box<dyn Template>,
}

impl Generator {
    /// A generator with the built-in handlers and the configured template.
    pub fn new(options: GenerateOptions) -> Result<Self> {
        Self::with_registry(options, HandlerRegistry::with_defaults())
    }

    /// A generator with a custom handler registry.
    pub fn with_registry(options: GenerateOptions, registry: HandlerRegistry) -> Result<Self> {
        let template = TemplateRegistry::find(options.template())?;
        Ok(Self {
            registry,
            options,
            template,
        })
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    /// Generate fixture text for `object_path`, optionally filtered.
    ///
    /// # Errors
    ///
    /// - [`FixtureError::Usage`] for unmet requirements or a bad filter
    /// - [`FixtureError::UnrecognizedObject`] when no handler matches
    /// - [`FixtureError::MisconfiguredHandler`] when the handler cannot run
    /// - [`FixtureError::NoData`] when the query matches nothing
    /// - [`FixtureError::CircularReference`] for cyclic records
    pub fn resolve(&mut self, object_path: &str, filter: Option<&str>) -> Result<String> {
        self.check_requirements()?;

        let mut handler = self.handler_for(object_path)?;
        let cache = self.discover(&mut *handler, object_path, filter)?;
        let text = self.render(&*handler, &cache)?;

        info!(
            "Generated {} records in {} blocks for {object_path}",
            cache.len(),
            cache.model_count()
        );
        Ok(text)
    }

    /// Fail if a required handler is not registered.
    pub fn check_requirements(&self) -> Result<(), FixtureError> {
        for name in self.options.require_handlers() {
            if self.registry.contains(name) {
                debug!("Requirement '{name}' satisfied");
                continue;
            }

            let names = self.registry.names();
            let mut message = format!(
                "required handler '{name}' is not registered (available: {})",
                if names.is_empty() { "none".to_string() } else { names.join(", ") }
            );
            if let Some(close) = did_you_mean(name, names.iter().copied()) {
                message.push_str(&format!("; did you mean '{close}'?"));
            }
            return Err(FixtureError::usage(message));
        }
        Ok(())
    }

    /// Find the store model named by `object_path` in the search path.
    pub fn locate(&self, object_path: &str) -> Result<Option<LocatedObject>> {
        ObjectLocator::new(self.options.base_dir(), self.options.env()).locate(object_path)
    }

    /// Select and construct the handler for `object_path`.
    pub fn handler_for(&self, object_path: &str) -> Result<Box<dyn DataHandler>> {
        let object = self.locate(object_path)?;
        let factory = self.registry.select(object_path, object.as_ref())?;
        debug!("Building '{}' handler for {object_path}", factory.name());
        factory.build(object_path, object, &self.options)
    }

    /// Run the discovery phase inside the handler's unit of work.
    ///
    /// On success the unit of work is committed and the populated cache
    /// returned. On failure it is rolled back exactly once and the original
    /// error is returned; a failing rollback is only logged.
    pub fn discover(
        &mut self,
        handler: &mut dyn DataHandler,
        object_path: &str,
        filter: Option<&str>,
    ) -> Result<DependencyCache> {
        handler.begin()?;
        self.template.begin();

        match walk(handler, object_path, filter) {
            Ok(cache) => {
                handler.commit()?;
                debug!(
                    "Discovered {} records across {} models",
                    cache.len(),
                    cache.model_count()
                );
                Ok(cache)
            }
            Err(err) => {
                if let Err(rollback_err) = handler.rollback() {
                    warn!("Rollback after failed discovery also failed: {rollback_err:#}");
                }
                Err(err)
            }
        }
    }

    /// Render the discovered records, one block per model.
    pub fn render(&mut self, handler: &dyn DataHandler, cache: &DependencyCache) -> Result<String> {
        let header = self.template.header(handler)?;

        let mut blocks = Vec::new();
        for model_id in cache.declaration_order()? {
            let mut block = BlockDef::new(handler.class_name(&model_id), model_id.as_str());
            for (name, value) in handler.model_meta(&model_id) {
                block.add_meta(name, value);
            }
            for record in cache.records(&model_id) {
                let attributes = handler
                    .resolve_references(record, cache, &mut block)
                    .with_context(|| format!("Failed to resolve references of {}", record.key()))?;
                block.add_row(record.rendering_key(), attributes);
            }
            blocks.push(self.template.render_block(&block)?);
        }

        let mut parts = vec![self.template.import_header()?, header];
        parts.extend(blocks);
        Ok(parts.join("\n"))
    }
}

/// Query the roots and register everything reachable from them.
///
/// A root seen before is registered again, so the last record returned for
/// a key is the one rendered.
fn walk(
    handler: &mut dyn DataHandler,
    object_path: &str,
    filter: Option<&str>,
) -> Result<DependencyCache> {
    handler.findall(filter)?;

    let mut cache = DependencyCache::new();
    let mut visited = HashSet::new();
    let mut roots = 0usize;

    for root in handler.sets() {
        let root = root?;
        roots += 1;
        visit(handler, &mut cache, root, &mut visited)?;
    }

    if roots == 0 {
        return Err(FixtureError::NoData {
            object: object_path.to_string(),
            filter: filter.map(str::to_string),
        }
        .into());
    }
    Ok(cache)
}

/// A record being walked and the references still to follow.
struct Frame {
    key: RecordKey,
    references: std::vec::IntoIter<(String, RecordKey)>,
}

impl Frame {
    /// Register `record` and open a frame over its references.
    fn enter(
        cache: &mut DependencyCache,
        visited: &mut HashSet<RecordKey>,
        record: Record,
    ) -> Self {
        let key = record.key();
        let references: Vec<(String, RecordKey)> =
            record.references().map(|(name, target)| (name.to_string(), target.clone())).collect();

        visited.insert(key.clone());
        cache.add(record);
        Self {
            key,
            references: references.into_iter(),
        }
    }
}

/// Register `root`, then everything it references, depth first.
///
/// The frames on `stack` are the records currently being walked; reaching
/// one of them again is a reference cycle.
fn visit(
    handler: &mut dyn DataHandler,
    cache: &mut DependencyCache,
    root: Record,
    visited: &mut HashSet<RecordKey>,
) -> Result<()> {
    let root = Frame::enter(cache, visited, root);
    let mut on_path = HashSet::from([root.key.clone()]);
    let mut stack = vec![root];

    while let Some(frame) = stack.last_mut() {
        let Some((attr, target)) = frame.references.next() else {
            if let Some(done) = stack.pop() {
                on_path.remove(&done.key);
            }
            continue;
        };
        let key = frame.key.clone();
        cache.add_dependency(&key.model_id, &target.model_id);

        if on_path.contains(&target) {
            let chain = stack
                .iter()
                .map(|frame| &frame.key)
                .chain(std::iter::once(&target))
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" → ");
            return Err(FixtureError::CircularReference {
                chain,
            }
            .into());
        }
        if visited.contains(&target) {
            cache.touch(&target.model_id);
            continue;
        }

        debug!("Following {key}.{attr} → {target}");
        let child = handler
            .fetch(&target)
            .with_context(|| format!("Failed to follow {key}.{attr}"))?;
        let child = Frame::enter(cache, visited, child);
        on_path.insert(child.key.clone());
        stack.push(child);
    }
    Ok(())
}
