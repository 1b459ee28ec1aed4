//! Sample store documents.
//!
//! The shop store has three models: `Offer` references `Product` and
//! `Category`, `Product` references `Category`. Offer 1 and its product
//! both point at category 9 ("parkas"), which makes it the canonical
//! shared-dependency case.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::store::{StoreDocument, StoreFormat};

/// The shop store as JSON.
pub const SHOP_JSON: &str = r#"{
  "models": {
    "Category": {
      "key": "id",
      "table": "categories",
      "rows": [
        { "id": 9, "name": "parkas" },
        { "id": 10, "name": "rebates" }
      ]
    },
    "Product": {
      "key": "id",
      "references": { "category_id": "Category" },
      "rows": [
        { "id": 1, "name": "jersey", "category_id": 9 },
        { "id": 2, "name": "parka", "category_id": 9 }
      ]
    },
    "Offer": {
      "key": "id",
      "references": { "product_id": "Product", "category_id": "Category" },
      "rows": [
        { "id": 1, "name": "jersey on sale", "product_id": 1, "category_id": 9 },
        { "id": 2, "name": "rebate on parkas", "product_id": 2, "category_id": 10 }
      ]
    }
  }
}
"#;

/// Employees whose managers point back at each other.
pub const CYCLIC_JSON: &str = r#"{
  "models": {
    "Employee": {
      "key": "id",
      "references": { "manager_id": "Employee" },
      "rows": [
        { "id": 1, "name": "ada", "manager_id": 2 },
        { "id": 2, "name": "grace", "manager_id": 1 },
        { "id": 3, "name": "linus", "manager_id": null }
      ]
    }
  }
}
"#;

/// The parsed shop store.
pub fn shop_document() -> StoreDocument {
    parse_fixture(SHOP_JSON)
}

/// The parsed cyclic employee store.
pub fn cyclic_document() -> StoreDocument {
    parse_fixture(CYCLIC_JSON)
}

fn parse_fixture(content: &str) -> StoreDocument {
    StoreFormat::Json
        .parse(content, "fixture.json")
        .unwrap_or_else(|e| panic!("invalid built-in fixture: {e}"))
}

/// A named store document that can be written to disk.
#[derive(Clone, Debug)]
pub struct StoreFixture {
    /// File name, e.g. `shop.json`
    pub name: String,
    pub content: String,
}

impl StoreFixture {
    pub fn shop() -> Self {
        Self {
            name: "shop.json".to_string(),
            content: SHOP_JSON.to_string(),
        }
    }

    pub fn cyclic() -> Self {
        Self {
            name: "staff.json".to_string(),
            content: CYCLIC_JSON.to_string(),
        }
    }

    /// Write the fixture into `dir`, returning its path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(&self.name);
        fs::write(&path, &self.content)
            .with_context(|| format!("Failed to write fixture {}", path.display()))?;
        Ok(path)
    }
}
