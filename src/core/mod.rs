//! Core types shared by every part of fixturegen.
//!
//! - [`error`]: the [`FixtureError`] taxonomy and user-facing error context
//! - [`record`]: [`Record`], [`RecordKey`], [`AttrValue`] and [`ModelSpec`]

pub mod error;
pub mod record;

pub use error::{
    ErrorContext, FixtureError, did_you_mean, find_fixture_error, user_friendly_error,
};
pub use record::{
    AttrValue, Attributes, ModelSpec, Record, RecordKey, record_id_from_value, to_snake_case,
};
