//! An in-memory handler with scripted data and a lifecycle call log.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::GenerateOptions;
use crate::core::{AttrValue, Attributes, FixtureError, ModelSpec, Record, RecordKey};
use crate::handler::{DataHandler, HandlerFactory, Naming, RecordStream};
use crate::store::LocatedObject;

/// Shared, clonable log of handler calls such as `begin` or `fetch Category#9`.
#[derive(Clone, Debug, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn push(&self, call: impl Into<String>) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push(call.into());
        }
    }

    /// Every call, in order.
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Number of calls named exactly `call`.
    pub fn count(&self, call: &str) -> usize {
        self.entries().iter().filter(|c| c.as_str() == call).count()
    }

    /// Number of calls starting with `prefix`.
    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

/// Build a record of `model` keyed by `id`.
pub fn record(model: &str, id: i64, attrs: &[(&str, AttrValue)]) -> Record {
    let spec = Arc::new(
        ModelSpec::new(model, Some("id")).unwrap_or_else(|e| panic!("bad test model: {e}")),
    );
    let mut all = Attributes::new();
    all.insert("id".into(), serde_json::json!(id).into());
    for (name, value) in attrs {
        all.insert((*name).to_string(), value.clone());
    }
    Record::new(spec, all).unwrap_or_else(|e| panic!("bad test record: {e}"))
}

/// A reference attribute to `model` record `id`.
pub fn fk(model: &str, id: i64) -> AttrValue {
    AttrValue::Ref(RecordKey::new(model, id.to_string()))
}

/// Handler serving records added by the test.
#[derive(Clone, Debug)]
pub struct ScriptedHandler {
    object: String,
    naming: Naming,
    records: HashMap<RecordKey, Record>,
    roots: Vec<RecordKey>,
    pending: Option<Vec<Record>>,
    findall_error: Option<String>,
    calls: CallLog,
}

impl ScriptedHandler {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            naming: Naming::default(),
            records: HashMap::new(),
            roots: Vec::new(),
            pending: None,
            findall_error: None,
            calls: CallLog::default(),
        }
    }

    #[must_use]
    pub fn with_naming(mut self, naming: Naming) -> Self {
        self.naming = naming;
        self
    }

    /// Make `record` fetchable.
    #[must_use]
    pub fn with_record(mut self, record: Record) -> Self {
        self.records.insert(record.key(), record);
        self
    }

    /// Make `record` fetchable and return it from every query.
    #[must_use]
    pub fn with_root(mut self, record: Record) -> Self {
        self.roots.push(record.key());
        self.with_record(record)
    }

    /// Make `findall` fail with `message`.
    #[must_use]
    pub fn failing_findall(mut self, message: impl Into<String>) -> Self {
        self.findall_error = Some(message.into());
        self
    }

    /// Log shared with every clone of this handler.
    pub fn call_log(&self) -> CallLog {
        self.calls.clone()
    }
}

impl DataHandler for ScriptedHandler {
    fn name(&self) -> &str {
        "scripted"
    }

    fn naming(&self) -> &Naming {
        &self.naming
    }

    fn describe(&self) -> String {
        self.object.clone()
    }

    fn begin(&mut self) -> Result<()> {
        self.calls.push("begin");
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.calls.push("commit");
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.calls.push("rollback");
        Ok(())
    }

    fn findall(&mut self, filter: Option<&str>) -> Result<()> {
        self.calls.push(format!("findall {}", filter.unwrap_or("*")));
        if let Some(message) = &self.findall_error {
            anyhow::bail!("{message}");
        }
        self.pending =
            Some(self.roots.iter().filter_map(|key| self.records.get(key).cloned()).collect());
        Ok(())
    }

    fn sets(&mut self) -> RecordStream {
        self.calls.push("sets");
        Box::new(self.pending.take().unwrap_or_default().into_iter().map(Ok))
    }

    fn fetch(&mut self, key: &RecordKey) -> Result<Record> {
        self.calls.push(format!("fetch {key}"));
        self.records.get(key).cloned().ok_or_else(|| {
            FixtureError::RecordNotFound {
                model: key.model_id.clone(),
                record_id: key.record_id.clone(),
            }
            .into()
        })
    }

    fn model_meta(&self, model_id: &str) -> Vec<(String, String)> {
        vec![("model".to_string(), model_id.to_string())]
    }
}

#[derive(Clone, Debug)]
enum Recognition {
    Answer(bool),
    Unsupported(String),
}

/// Factory answering `recognizes` with a fixed result and building a clone
/// of a prepared [`ScriptedHandler`].
#[derive(Clone, Debug)]
pub struct ScriptedFactory {
    name: String,
    recognition: Recognition,
    handler: Option<ScriptedHandler>,
}

impl ScriptedFactory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            recognition: Recognition::Answer(true),
            handler: None,
        }
    }

    #[must_use]
    pub fn recognizing(mut self, answer: bool) -> Self {
        self.recognition = Recognition::Answer(answer);
        self
    }

    #[must_use]
    pub fn unsupported(mut self, reason: impl Into<String>) -> Self {
        self.recognition = Recognition::Unsupported(reason.into());
        self
    }

    #[must_use]
    pub fn with_handler(mut self, handler: ScriptedHandler) -> Self {
        self.handler = Some(handler);
        self
    }
}

impl HandlerFactory for ScriptedFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn recognizes(
        &self,
        _object_path: &str,
        _object: Option<&LocatedObject>,
    ) -> Result<bool, FixtureError> {
        match &self.recognition {
            Recognition::Answer(answer) => Ok(*answer),
            Recognition::Unsupported(reason) => Err(FixtureError::UnsupportedHandler {
                handler: self.name.clone(),
                reason: reason.clone(),
            }),
        }
    }

    fn build(
        &self,
        object_path: &str,
        _object: Option<LocatedObject>,
        options: &GenerateOptions,
    ) -> Result<Box<dyn DataHandler>> {
        let handler = self
            .handler
            .clone()
            .unwrap_or_else(|| ScriptedHandler::new(object_path))
            .with_naming(options.naming().clone());
        Ok(Box::new(handler))
    }
}
