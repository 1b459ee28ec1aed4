//! Locating `module.Model` objects on disk.
//!
//! `shop.Offer` names model `Offer` in module `shop`, which is a store
//! document `shop.json`, `shop.yaml`, `shop.yml` or `shop.toml`. Dotted
//! modules map to directories: `fixtures.shop.Offer` → `fixtures/shop.*`.
//! Directories are searched in order and the first hit wins. A path to an
//! existing document may be given directly as `path/to/shop.json:Offer`.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use super::{StoreDocument, StoreFormat, load};
use crate::core::did_you_mean;

/// A model found in a store document.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedObject {
    /// Module name as written in the object path
    pub module: String,
    /// Model id
    pub model: String,
    /// Document the model was found in
    pub file: PathBuf,
    /// The parsed document
    pub document: StoreDocument,
}

impl LocatedObject {
    /// `module.Model`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.model)
    }
}

/// Resolves object paths against a list of search directories.
#[derive(Debug, Clone)]
pub struct ObjectLocator {
    search_path: Vec<PathBuf>,
}

impl ObjectLocator {
    /// Search `base` first, then each of `env` in order.
    pub fn new(base: impl Into<PathBuf>, env: &[PathBuf]) -> Self {
        let base = base.into();
        let mut search_path = vec![base.clone()];
        search_path.extend(env.iter().map(|dir| {
            if dir.is_absolute() {
                dir.clone()
            } else {
                base.join(dir)
            }
        }));
        Self {
            search_path,
        }
    }

    /// Directories searched, in order.
    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Locate `object_path`.
    ///
    /// Returns `Ok(None)` when no document defines the model. A document
    /// that exists but cannot be parsed is an error.
    pub fn locate(&self, object_path: &str) -> Result<Option<LocatedObject>> {
        if let Some((file, model)) = object_path.rsplit_once(':')
            && !model.is_empty()
            && !model.contains(['/', '\\'])
        {
            for candidate in self.candidates_for_file(file) {
                if candidate.is_file() {
                    return self.load_model(file, model, &candidate);
                }
            }
            trace!("No document at '{file}' for {object_path}");
            return Ok(None);
        }

        let Some((module, model)) = object_path.rsplit_once('.') else {
            debug!("Object path '{object_path}' has no module part");
            return Ok(None);
        };
        if module.is_empty() || model.is_empty() {
            return Ok(None);
        }

        let relative: PathBuf = module.split('.').collect();
        for dir in &self.search_path {
            for ext in StoreFormat::EXTENSIONS {
                let candidate = dir.join(&relative).with_extension(ext);
                trace!("Trying {}", candidate.display());
                if candidate.is_file() {
                    return self.load_model(module, model, &candidate);
                }
            }
        }

        debug!("Module '{module}' not found in {} search directories", self.search_path.len());
        Ok(None)
    }

    fn candidates_for_file(&self, file: &str) -> Vec<PathBuf> {
        let path = Path::new(file);
        if path.is_absolute() {
            vec![path.to_path_buf()]
        } else {
            self.search_path.iter().map(|dir| dir.join(path)).collect()
        }
    }

    fn load_model(&self, module: &str, model: &str, file: &Path) -> Result<Option<LocatedObject>> {
        let document = load(file)?;
        if document.model(model).is_none() {
            match did_you_mean(model, document.model_ids()) {
                Some(close) => warn!("{} has no model '{model}'; did you mean '{close}'?", file.display()),
                None => debug!("{} has no model '{model}'", file.display()),
            }
            return Ok(None);
        }

        debug!("Located {module}.{model} in {}", file.display());
        Ok(Some(LocatedObject {
            module: module.to_string(),
            model: model.to_string(),
            file: file.to_path_buf(),
            document,
        }))
    }
}
