//! fixturegen - dependency-ordered fixture generation
//!
//! Given an object path (`module.Model`) and an optional filter, fixturegen
//! queries the matching records, follows every reference they hold, and
//! renders fixture text in which each model gets one block and every block
//! only refers to blocks declared before it.
//!
//! # Architecture Overview
//!
//! Generation runs in two phases:
//!
//! 1. **Discovery** inside the handler's unit of work: root records are
//!    queried and every reference is walked depth first, registering each
//!    record once in a [`cache::DependencyCache`]. Reference cycles fail
//!    fast. Any failure rolls the unit of work back.
//! 2. **Rendering**, read-only over the cache: one block per model in
//!    declaration order, references rendered as expressions addressing
//!    earlier entries.
//!
//! # Core Modules
//!
//! - [`cache`] - Record registry, touch order, and the model dependency graph
//! - [`cli`] - The `fixture` command
//! - [`config`] - Layered configuration and [`config::GenerateOptions`]
//! - [`core`] - Records, model specs, and the [`core::FixtureError`] taxonomy
//! - [`generator`] - Handler selection, discovery, and rendering
//! - [`handler`] - The [`handler::DataHandler`] / [`handler::HandlerFactory`]
//!   traits, the registry, and the built-in store handler
//! - [`store`] - Store documents and object location
//! - [`templating`] - The `toml` and `yaml` output templates
//!
//! # Store Format
//!
//! ```json
//! {
//!   "models": {
//!     "Category": { "key": "id", "rows": [{ "id": 9, "name": "parkas" }] },
//!     "Product": {
//!       "key": "id",
//!       "references": { "category_id": "Category" },
//!       "rows": [{ "id": 1, "name": "jersey", "category_id": 9 }]
//!     }
//!   }
//! }
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! fixture shop.Product --where "id = 1"
//! ```
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
//! name = "jersey"
//! category_id = { ref = "CategoryData.category_9", field = "id" }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod generator;
pub mod handler;
pub mod store;
pub mod templating;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
