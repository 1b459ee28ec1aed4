//! Handler backed by a store document.
//!
//! The located module supplies the schema: models, their key attributes and
//! references. Rows come from the same document, or from the document named
//! by the DSN (`file:<path>` or a plain path) when one is given, the way a
//! database would supply rows for an application's models.

use anyhow::Result;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{DataHandler, Filter, HandlerFactory, Naming, RecordStream};
use crate::config::GenerateOptions;
use crate::core::{
    AttrValue, Attributes, FixtureError, ModelSpec, Record, RecordKey, record_id_from_value,
};
use crate::store::{self, LocatedObject, Row, StoreDocument};

const HANDLER_NAME: &str = "store";

/// Recognizes any model found in a store document.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreHandlerFactory;

impl HandlerFactory for StoreHandlerFactory {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    fn recognizes(
        &self,
        _object_path: &str,
        object: Option<&LocatedObject>,
    ) -> Result<bool, FixtureError> {
        Ok(object.is_some())
    }

    fn build(
        &self,
        object_path: &str,
        object: Option<LocatedObject>,
        options: &GenerateOptions,
    ) -> Result<Box<dyn DataHandler>> {
        let object = object.ok_or_else(|| FixtureError::MisconfiguredHandler {
            handler: HANDLER_NAME.to_string(),
            reason: format!("object '{object_path}' was not located"),
        })?;
        Ok(Box::new(StoreHandler::new(object, options)?))
    }
}

/// One model of the store, ready to be queried.
#[derive(Debug)]
struct StoreModel {
    spec: Arc<ModelSpec>,
    table: Option<String>,
    references: Arc<IndexMap<String, String>>,
    rows: Vec<Row>,
    /// Record id to position in `rows`
    index: HashMap<String, usize>,
}

impl StoreModel {
    fn record(&self, row: Row) -> Result<Record> {
        build_record(&self.spec, &self.references, row)
    }
}

/// Serves records from a store document.
#[derive(Debug)]
pub struct StoreHandler {
    module: String,
    root_model: String,
    naming: Naming,
    models: HashMap<String, StoreModel>,
    pending: Option<Vec<Row>>,
}

impl StoreHandler {
    /// Build a handler for a located model.
    ///
    /// Fails with [`FixtureError::MisconfiguredHandler`] when the DSN cannot
    /// be loaded, a model has no usable key, or a reference names a model the
    /// document does not define.
    pub fn new(object: LocatedObject, options: &GenerateOptions) -> Result<Self> {
        let data = match options.dsn() {
            Some(dsn) => Some(load_dsn(dsn, options.base_dir())?),
            None => None,
        };
        let schema = object.document;

        let mut models = HashMap::with_capacity(schema.models.len());
        for (model_id, definition) in &schema.models {
            let mut spec = ModelSpec::new(model_id.as_str(), definition.key.as_deref())
                .map_err(|e| misconfigured(e.to_string()))?;
            if let Some(variable) = &definition.variable {
                spec = spec.with_variable(variable.as_str());
            }

            for (attr, target) in &definition.references {
                if schema.model(target).is_none() {
                    return Err(misconfigured(format!(
                        "model '{model_id}' attribute '{attr}' references unknown model '{target}'"
                    ))
                    .into());
                }
            }

            let rows = match &data {
                Some(data) => data.model(model_id).map(|m| m.rows.clone()).unwrap_or_default(),
                None => definition.rows.clone(),
            };

            let mut index = HashMap::with_capacity(rows.len());
            for (position, row) in rows.iter().enumerate() {
                if let Some(id) = row.get(spec.key_attr()).and_then(record_id_from_value)
                    && index.insert(id.clone(), position).is_some()
                {
                    warn!("Duplicate key '{id}' in model '{model_id}'; the last row wins");
                }
            }

            models.insert(
                model_id.clone(),
                StoreModel {
                    spec: Arc::new(spec),
                    table: definition.table.clone(),
                    references: Arc::new(definition.references.clone()),
                    rows,
                    index,
                },
            );
        }

        debug!(
            "Store handler for {}.{} serving {} models",
            object.module,
            object.model,
            models.len()
        );

        Ok(Self {
            module: object.module,
            root_model: object.model,
            naming: options.naming().clone(),
            models,
            pending: None,
        })
    }

    fn model(&self, model_id: &str) -> Option<&StoreModel> {
        self.models.get(model_id)
    }
}

impl DataHandler for StoreHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    fn naming(&self) -> &Naming {
        &self.naming
    }

    fn describe(&self) -> String {
        format!("{}.{}", self.module, self.root_model)
    }

    fn begin(&mut self) -> Result<()> {
        debug!("Begin unit of work on {}", self.describe());
        self.pending = None;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        debug!("Commit unit of work on {}", self.describe());
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        debug!("Roll back unit of work on {}", self.describe());
        self.pending = None;
        Ok(())
    }

    fn findall(&mut self, filter: Option<&str>) -> Result<()> {
        let filter = match filter {
            Some(expr) => Filter::parse(expr)?,
            None => Filter::default(),
        };

        let model = self.model(&self.root_model).ok_or_else(|| {
            misconfigured(format!("model '{}' is not defined", self.root_model))
        })?;
        let rows: Vec<Row> = model.rows.iter().filter(|row| filter.matches(row)).cloned().collect();

        debug!(
            "Query on {} matched {} of {} rows",
            self.root_model,
            rows.len(),
            model.rows.len()
        );
        self.pending = Some(rows);
        Ok(())
    }

    fn sets(&mut self) -> RecordStream {
        let rows = self.pending.take().unwrap_or_default();
        let Some(model) = self.models.get(&self.root_model) else {
            return Box::new(std::iter::empty());
        };
        let spec = Arc::clone(&model.spec);
        let references = Arc::clone(&model.references);
        Box::new(rows.into_iter().map(move |row| build_record(&spec, &references, row)))
    }

    fn fetch(&mut self, key: &RecordKey) -> Result<Record> {
        let not_found = || FixtureError::RecordNotFound {
            model: key.model_id.clone(),
            record_id: key.record_id.clone(),
        };
        let model = self.model(&key.model_id).ok_or_else(not_found)?;
        let position = *model.index.get(&key.record_id).ok_or_else(not_found)?;
        model.record(model.rows[position].clone())
    }

    fn model_meta(&self, model_id: &str) -> Vec<(String, String)> {
        let mut meta = vec![("model".to_string(), format!("{}.{model_id}", self.module))];
        if let Some(model) = self.model(model_id) {
            meta.push(("key".to_string(), model.spec.key_attr().to_string()));
            if let Some(table) = &model.table {
                meta.push(("table".to_string(), table.clone()));
            }
        }
        meta
    }
}

fn misconfigured(reason: impl Into<String>) -> FixtureError {
    FixtureError::MisconfiguredHandler {
        handler: HANDLER_NAME.to_string(),
        reason: reason.into(),
    }
}

/// Turn a row into a record; non-null reference attributes become keys.
fn build_record(
    spec: &Arc<ModelSpec>,
    references: &IndexMap<String, String>,
    row: Row,
) -> Result<Record> {
    let mut attributes = Attributes::with_capacity(row.len());
    for (name, value) in row {
        let value = match references.get(&name) {
            Some(target) if !value.is_null() => {
                let record_id =
                    record_id_from_value(&value).ok_or_else(|| FixtureError::InvalidRecord {
                        model: spec.id().to_string(),
                        reason: format!("reference '{name}' must hold a key of {target}, found {value}"),
                    })?;
                AttrValue::Ref(RecordKey::new(target.as_str(), record_id))
            }
            _ => AttrValue::Literal(value),
        };
        attributes.insert(name, value);
    }
    Ok(Record::new(Arc::clone(spec), attributes)?)
}

/// Resolve a DSN to a document path: `file:<path>` or a plain path,
/// relative to `base_dir`.
fn dsn_path(dsn: &str, base_dir: &Path) -> PathBuf {
    let path = Path::new(dsn.strip_prefix("file:").unwrap_or(dsn));
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn load_dsn(dsn: &str, base_dir: &Path) -> Result<StoreDocument> {
    let path = dsn_path(dsn, base_dir);
    store::load(&path)
        .map_err(|e| misconfigured(format!("cannot load DSN '{dsn}': {e:#}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::find_fixture_error;
    use crate::store::ModelDefinition;
    use crate::test_utils::shop_document;
    use serde_json::json;
    use tempfile::TempDir;

    fn located(document: StoreDocument, model: &str) -> LocatedObject {
        LocatedObject {
            module: "shop".into(),
            model: model.into(),
            file: PathBuf::from("shop.json"),
            document,
        }
    }

    fn handler(model: &str) -> StoreHandler {
        StoreHandler::new(located(shop_document(), model), &GenerateOptions::default()).unwrap()
    }

    fn kind(err: &anyhow::Error) -> Option<&'static str> {
        find_fixture_error(err).map(FixtureError::kind)
    }

    #[test]
    fn test_factory_recognizes_located_objects_only() {
        let factory = StoreHandlerFactory;
        let object = located(shop_document(), "Offer");
        assert!(factory.recognizes("shop.Offer", Some(&object)).unwrap());
        assert!(!factory.recognizes("shop.Offer", None).unwrap());

        let err = factory.build("shop.Offer", None, &GenerateOptions::default()).err().unwrap();
        assert_eq!(kind(&err), Some("MisconfiguredHandler"));
    }

    #[test]
    fn test_findall_and_sets() {
        let mut handler = handler("Offer");
        handler.begin().unwrap();
        handler.findall(None).unwrap();

        let roots: Vec<Record> = handler.sets().collect::<Result<_>>().unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].key(), RecordKey::new("Offer", "1"));

        let refs: Vec<_> = roots[0].references().map(|(n, k)| (n.to_string(), k.clone())).collect();
        assert_eq!(
            refs,
            vec![
                ("product_id".to_string(), RecordKey::new("Product", "1")),
                ("category_id".to_string(), RecordKey::new("Category", "9")),
            ]
        );

        // The stream is not restartable.
        assert_eq!(handler.sets().count(), 0);
    }

    #[test]
    fn test_findall_with_filter() {
        let mut handler = handler("Offer");
        handler.findall(Some("id = 2")).unwrap();
        let roots: Vec<Record> = handler.sets().collect::<Result<_>>().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].record_id(), "2");

        handler.findall(Some("id > 100")).unwrap();
        assert_eq!(handler.sets().count(), 0);

        let err = handler.findall(Some("id ~ 1")).unwrap_err();
        assert_eq!(kind(&err), Some("UsageError"));
    }

    #[test]
    fn test_fetch() {
        let mut handler = handler("Offer");
        let category = handler.fetch(&RecordKey::new("Category", "9")).unwrap();
        assert_eq!(category.attributes()["name"], AttrValue::Literal(json!("parkas")));

        let err = handler.fetch(&RecordKey::new("Category", "404")).unwrap_err();
        assert_eq!(kind(&err), Some("RecordNotFound"));
        let err = handler.fetch(&RecordKey::new("Nope", "1")).unwrap_err();
        assert_eq!(kind(&err), Some("RecordNotFound"));
    }

    #[test]
    fn test_null_reference_stays_literal() {
        let mut document = shop_document();
        if let Some(product) = document.models.get_mut("Product") {
            product.rows[0].insert("category_id".into(), json!(null));
        }
        let mut handler = StoreHandler::new(located(document, "Product"), &GenerateOptions::default())
            .unwrap();
        let product = handler.fetch(&RecordKey::new("Product", "1")).unwrap();
        assert_eq!(product.references().count(), 0);
        assert_eq!(product.attributes()["category_id"], AttrValue::Literal(json!(null)));
    }

    #[test]
    fn test_model_meta_and_naming() {
        let handler = handler("Offer");
        assert_eq!(handler.describe(), "shop.Offer");
        assert_eq!(handler.class_name("Category"), "CategoryData");

        let meta = handler.model_meta("Category");
        assert_eq!(
            meta,
            vec![
                ("model".to_string(), "shop.Category".to_string()),
                ("key".to_string(), "id".to_string()),
                ("table".to_string(), "categories".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_reference_target_is_misconfigured() {
        let mut document = shop_document();
        document.models.insert(
            "Review".into(),
            ModelDefinition {
                key: Some("id".into()),
                references: IndexMap::from([("user_id".to_string(), "User".to_string())]),
                ..ModelDefinition::default()
            },
        );
        let err = StoreHandler::new(located(document, "Review"), &GenerateOptions::default())
            .unwrap_err();
        assert_eq!(kind(&err), Some("MisconfiguredHandler"));
        assert!(err.to_string().contains("unknown model 'User'"));
    }

    #[test]
    fn test_model_without_key_is_misconfigured() {
        let mut document = shop_document();
        document.models.insert("Loose".into(), ModelDefinition::default());
        let err = StoreHandler::new(located(document, "Offer"), &GenerateOptions::default())
            .unwrap_err();
        assert_eq!(kind(&err), Some("MisconfiguredHandler"));
    }

    #[test]
    fn test_dsn_supplies_rows() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("snapshot.json"),
            r#"{"models": {"Category": {"rows": [{"id": 5, "name": "boots"}]}}}"#,
        )
        .unwrap();

        let options = GenerateOptions::new(temp.path()).with_dsn("file:snapshot.json");
        let mut handler =
            StoreHandler::new(located(shop_document(), "Category"), &options).unwrap();
        handler.findall(None).unwrap();
        let roots: Vec<Record> = handler.sets().collect::<Result<_>>().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].record_id(), "5");

        // Models missing from the DSN have no rows.
        handler.findall(None).unwrap();
        assert!(handler.fetch(&RecordKey::new("Product", "1")).is_err());
    }

    #[test]
    fn test_unreadable_dsn_is_misconfigured() {
        let temp = TempDir::new().unwrap();
        let options = GenerateOptions::new(temp.path()).with_dsn("missing.json");
        let err = StoreHandler::new(located(shop_document(), "Offer"), &options).unwrap_err();
        assert_eq!(kind(&err), Some("MisconfiguredHandler"));
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_dsn_path() {
        let base = Path::new("/work");
        assert_eq!(dsn_path("file:data.json", base), PathBuf::from("/work/data.json"));
        assert_eq!(dsn_path("/abs/data.json", base), PathBuf::from("/abs/data.json"));
        assert_eq!(dsn_path("data.yaml", base), PathBuf::from("/work/data.yaml"));
    }
}
