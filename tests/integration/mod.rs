//! Integration test suite for fixturegen
//!
//! End-to-end tests that run the `fixture` binary or the library API against
//! store documents written to temporary directories.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: the `fixture` binary, its flags, output, and exit statuses
//! - **config**: layered configuration files and `FIXTUREGEN_CONFIG`
//! - **generate**: library-level generation over the store handler
//! - **ordering**: property tests for block declaration order

mod common;

mod cli;
mod config;
mod generate;
mod ordering;
