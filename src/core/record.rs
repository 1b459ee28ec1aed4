//! Record value objects.
//!
//! A [`Record`] is one row of a data model plus its attribute map. Attributes
//! are either literals or [`RecordKey`] references to rows of another (or the
//! same) model. How a record is identified is decided by its [`ModelSpec`]:
//! the model names the identifying attribute and the variable name used to
//! build rendering keys such as `category_9`.

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::error::FixtureError;

/// Identity of a record: `(model id, record id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    /// Model the record belongs to, e.g. `Category`
    pub model_id: String,
    /// Identifier of the row within its model, e.g. `9`
    pub record_id: String,
}

impl RecordKey {
    /// Create a key from its parts.
    pub fn new(model_id: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            record_id: record_id.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.model_id, self.record_id)
    }
}

/// One attribute value of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// A plain value copied into the fixture as-is
    Literal(Value),
    /// A foreign key pointing at another record
    Ref(RecordKey),
}

impl AttrValue {
    /// The referenced key, if this value is a reference.
    pub fn as_ref_key(&self) -> Option<&RecordKey> {
        match self {
            Self::Ref(key) => Some(key),
            Self::Literal(_) => None,
        }
    }
}

impl From<Value> for AttrValue {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<RecordKey> for AttrValue {
    fn from(key: RecordKey) -> Self {
        Self::Ref(key)
    }
}

/// Ordered attribute map of a record.
pub type Attributes = IndexMap<String, AttrValue>;

/// Description of a data model: its id, identifying attribute and variable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    id: String,
    key_attr: String,
    variable: String,
}

impl ModelSpec {
    /// Create a model description.
    ///
    /// A model must designate the attribute that identifies its rows; a
    /// missing or blank designation is rejected.
    pub fn new(id: impl Into<String>, key_attr: Option<&str>) -> Result<Self, FixtureError> {
        let id = id.into();
        let key_attr = match key_attr.map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => {
                return Err(FixtureError::MisconfiguredModel {
                    model: id,
                    reason: "no identifying key attribute was designated".to_string(),
                });
            }
        };
        let variable = to_snake_case(&id);
        Ok(Self {
            id,
            key_attr,
            variable,
        })
    }

    /// Override the variable name derived from the model id.
    #[must_use]
    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = variable.into();
        self
    }

    /// Model id, e.g. `Category`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the identifying attribute, e.g. `id`.
    pub fn key_attr(&self) -> &str {
        &self.key_attr
    }

    /// Variable name used in rendering keys, e.g. `category`.
    pub fn variable(&self) -> &str {
        &self.variable
    }
}

/// One row of a model with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    model: Arc<ModelSpec>,
    record_id: String,
    attributes: Attributes,
}

impl Record {
    /// Create a record, deriving its id from the model's key attribute.
    ///
    /// The key attribute must be present and hold a string, number or
    /// boolean literal, or a reference (whose record id is then reused).
    pub fn new(model: Arc<ModelSpec>, attributes: Attributes) -> Result<Self, FixtureError> {
        let record_id = match attributes.get(model.key_attr()) {
            Some(AttrValue::Literal(value)) => record_id_from_value(value).ok_or_else(|| {
                FixtureError::InvalidRecord {
                    model: model.id().to_string(),
                    reason: format!(
                        "key attribute '{}' must be a string or number, found {value}",
                        model.key_attr()
                    ),
                }
            })?,
            Some(AttrValue::Ref(key)) => key.record_id.clone(),
            None => {
                return Err(FixtureError::InvalidRecord {
                    model: model.id().to_string(),
                    reason: format!("missing key attribute '{}'", model.key_attr()),
                });
            }
        };

        Ok(Self {
            model,
            record_id,
            attributes,
        })
    }

    /// The model this record belongs to.
    pub fn model(&self) -> &Arc<ModelSpec> {
        &self.model
    }

    /// Model id.
    pub fn model_id(&self) -> &str {
        self.model.id()
    }

    /// Identifier of the row within its model.
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    /// `(model id, record id)` of this record.
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.model.id(), self.record_id.clone())
    }

    /// Attributes in their original order.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Foreign-key attributes as `(name, referenced key)` pairs.
    pub fn references(&self) -> impl Iterator<Item = (&str, &RecordKey)> {
        self.attributes
            .iter()
            .filter_map(|(name, value)| value.as_ref_key().map(|key| (name.as_str(), key)))
    }

    /// Variable name of the record's model.
    pub fn variable_name(&self) -> &str {
        self.model.variable()
    }

    /// Key used for this record's entry in a rendered block, e.g. `category_9`.
    pub fn rendering_key(&self) -> String {
        format!("{}_{}", self.variable_name(), self.record_id)
    }
}

/// Record id encoded by a literal key value: strings, numbers and booleans.
pub fn record_id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Convert a model id such as `OfferItem` or `HTTPServer` to snake case.
///
/// ```rust
/// use fixturegen::core::to_snake_case;
///
/// assert_eq!(to_snake_case("OfferItem"), "offer_item");
/// assert_eq!(to_snake_case("HTTPServer"), "http_server");
/// assert_eq!(to_snake_case("category"), "category");
/// ```
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c == '-' || c == ' ' || c == '.' {
            out.push('_');
        } else {
            out.push(c);
        }
    }

    out
}
