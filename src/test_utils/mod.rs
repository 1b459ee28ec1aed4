//! Test utilities for fixturegen
//!
//! Available to unit tests and, through the `test-utils` feature, to
//! integration tests:
//!
//! - [`init_test_logging`]: one-time tracing setup with the test writer
//! - [`fixtures`]: sample store documents (the shop and a cyclic staff store)
//! - [`scripted`]: an in-memory [`ScriptedHandler`] that logs lifecycle calls,
//!   its [`ScriptedFactory`], and record builders
//!
//! # Example
//!
//! ```rust,no_run
//! use fixturegen::test_utils::{ScriptedHandler, fk, record};
//!
//! let handler = ScriptedHandler::new("shop.Product")
//!     .with_root(record("Product", 1, &[("category_id", fk("Category", 9))]))
//!     .with_record(record("Category", 9, &[]));
//! let calls = handler.call_log();
//! ```

pub mod fixtures;
pub mod scripted;

pub use fixtures::{CYCLIC_JSON, SHOP_JSON, StoreFixture, cyclic_document, shop_document};
pub use scripted::{CallLog, ScriptedFactory, ScriptedHandler, fk, record};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG` if set; with neither, no
/// subscriber is installed.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
