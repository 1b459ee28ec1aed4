//! TOML fixture template.
//!
//! ```toml
//! [fixture]
//! template = "toml"
//! classes = ["CategoryData", "ProductData"]
//!
//! # Fixture data for shop.Product generated by fixturegen (store handler)
//!
//! [CategoryData]
//! model = "shop.Category"
//! key = "id"
//!
//! [CategoryData.category_9]
//! id = 9
//! name = "parkas"
//!
//! [ProductData]
//! model = "shop.Product"
//! key = "id"
//! requires = ["CategoryData"]
//!
//! [ProductData.product_1]
//! id = 1
//! category_id = { ref = "CategoryData.category_9", field = "id" }
//! ```
//!
//! TOML has no null, so null attributes are left out.

use anyhow::Result;
use serde_json::Value;
use toml_edit::Key;

use super::{
    BlockDef, BlockView, HeaderView, ImportView, Reference, Syntax, Template, TemplateRenderer,
    check_class_name,
};
use crate::handler::DataHandler;

const HEADER: &str =
    "# Fixture data for {{ object }} generated by fixturegen ({{ handler }} handler)\n";

const IMPORT: &str = "[fixture]
template = {{ template }}
classes = [{{ classes | join(sep=\", \") }}]
";

const BLOCK: &str = "[{{ class_name }}]
{% for m in meta %}{{ m.name }} = {{ m.value }}
{% endfor %}{% if requires %}requires = [{{ requires | join(sep=\", \") }}]
{% endif %}{% for row in rows %}
[{{ class_name }}.{{ row.key }}]
{% for a in row.attrs %}{{ a.name }} = {{ a.value }}
{% endfor %}{% endfor %}";

/// Renders blocks as TOML tables.
pub struct TomlTemplate {
    renderer: TemplateRenderer,
    classes: Vec<String>,
}

impl TomlTemplate {
    pub fn new() -> Result<Self> {
        Ok(Self {
            renderer: TemplateRenderer::new(&[
                ("header", HEADER),
                ("import", IMPORT),
                ("block", BLOCK),
            ])?,
            classes: Vec::new(),
        })
    }
}

impl Template for TomlTemplate {
    fn name(&self) -> &str {
        "toml"
    }

    fn begin(&mut self) {
        self.classes.clear();
    }

    fn header(&self, handler: &dyn DataHandler) -> Result<String> {
        self.renderer.render(
            "header",
            &HeaderView {
                object: &handler.describe(),
                handler: handler.name(),
            },
        )
    }

    fn render_block(&mut self, block: &BlockDef) -> Result<String> {
        check_class_name(block)?;
        let text = self.renderer.render("block", &BlockView::build::<TomlSyntax>(block))?;
        self.classes.push(block.class_name().to_string());
        Ok(text)
    }

    fn import_header(&self) -> Result<String> {
        self.renderer.render(
            "import",
            &ImportView {
                template: TomlSyntax::string(self.name()),
                classes: self.classes.iter().map(|c| TomlSyntax::string(c)).collect(),
            },
        )
    }
}

struct TomlSyntax;

impl Syntax for TomlSyntax {
    fn key(name: &str) -> String {
        Key::new(name).to_string()
    }

    fn string(value: &str) -> String {
        toml_edit::Value::from(value).to_string().trim().to_string()
    }

    fn literal(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => i.to_string(),
                None => toml_edit::Value::from(n.as_f64().unwrap_or(f64::NAN))
                    .to_string()
                    .trim()
                    .to_string(),
            }),
            Value::String(s) => Some(Self::string(s)),
            Value::Array(items) => {
                let items: Vec<String> = items.iter().filter_map(Self::literal).collect();
                Some(format!("[{}]", items.join(", ")))
            }
            Value::Object(map) => {
                let entries: Vec<String> = map
                    .iter()
                    .filter_map(|(k, v)| Some(format!("{} = {}", Self::key(k), Self::literal(v)?)))
                    .collect();
                if entries.is_empty() {
                    Some("{}".to_string())
                } else {
                    Some(format!("{{ {} }}", entries.join(", ")))
                }
            }
        }
    }

    fn reference(reference: &Reference) -> String {
        format!(
            "{{ ref = {}, field = {} }}",
            Self::string(&reference.target()),
            Self::string(&reference.field)
        )
    }
}
