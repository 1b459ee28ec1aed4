//! YAML fixture template.
//!
//! ```yaml
//! fixture:
//!   template: yaml
//!   classes: [CategoryData, ProductData]
//!
//! # Fixture data for shop.Product generated by fixturegen (store handler)
//!
//! CategoryData:
//!   model: shop.Category
//!   key: id
//!   rows:
//!     category_9:
//!       id: 9
//!       name: parkas
//!
//! ProductData:
//!   model: shop.Product
//!   key: id
//!   requires: [CategoryData]
//!   rows:
//!     product_1:
//!       id: 1
//!       category_id: {ref: CategoryData.category_9, field: id}
//! ```

use anyhow::Result;
use serde_json::Value;

use super::{
    BlockDef, BlockView, HeaderView, ImportView, Reference, Syntax, Template, TemplateRenderer,
    check_class_name,
};
use crate::handler::DataHandler;

const HEADER: &str =
    "# Fixture data for {{ object }} generated by fixturegen ({{ handler }} handler)\n";

const IMPORT: &str = "fixture:
  template: {{ template }}
  classes: [{{ classes | join(sep=\", \") }}]
";

const BLOCK: &str = "{{ class_name }}:
{% for m in meta %}  {{ m.name }}: {{ m.value }}
{% endfor %}{% if requires %}  requires: [{{ requires | join(sep=\", \") }}]
{% endif %}  rows:
{% for row in rows %}    {{ row.key }}:
{% for a in row.attrs %}      {{ a.name }}: {{ a.value }}
{% endfor %}{% endfor %}";

/// Renders blocks as YAML mappings.
pub struct YamlTemplate {
    renderer: TemplateRenderer,
    classes: Vec<String>,
}

impl YamlTemplate {
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

impl Template for YamlTemplate {
    fn name(&self) -> &str {
        "yaml"
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
        let text = self.renderer.render("block", &BlockView::build::<YamlSyntax>(block))?;
        self.classes.push(block.class_name().to_string());
        Ok(text)
    }

    fn import_header(&self) -> Result<String> {
        self.renderer.render(
            "import",
            &ImportView {
                template: YamlSyntax::string(self.name()),
                classes: self.classes.iter().map(|c| YamlSyntax::string(c)).collect(),
            },
        )
    }
}

struct YamlSyntax;

impl YamlSyntax {
    /// A flow-safe scalar: plain when YAML allows it, JSON-quoted otherwise.
    fn scalar(value: &Value) -> String {
        let needs_json = match value {
            Value::String(s) => {
                s.is_empty()
                    || s.contains(['\n', ',', '[', ']', '{', '}'])
                    || s.starts_with(' ')
                    || s.ends_with(' ')
            }
            Value::Array(_) | Value::Object(_) => true,
            _ => false,
        };

        if !needs_json
            && let Ok(text) = serde_yaml::to_string(value)
            && !text.trim().contains('\n')
        {
            return text.trim().to_string();
        }
        serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
    }
}

impl Syntax for YamlSyntax {
    fn key(name: &str) -> String {
        Self::scalar(&Value::String(name.to_string()))
    }

    fn string(value: &str) -> String {
        Self::scalar(&Value::String(value.to_string()))
    }

    fn literal(value: &Value) -> Option<String> {
        Some(Self::scalar(value))
    }

    fn reference(reference: &Reference) -> String {
        format!(
            "{{ref: {}, field: {}}}",
            Self::string(&reference.target()),
            Self::string(&reference.field)
        )
    }
}
