//! Error handling for fixturegen
//!
//! This module provides the error taxonomy used across the generator and its
//! collaborators, plus the user-facing presentation layer used by the CLI.
//!
//! # Architecture
//!
//! - [`FixtureError`] - Enumerated error types for every failure the generator
//!   can report on purpose
//! - [`ErrorContext`] - Wrapper that adds user-friendly details and suggestions
//!
//! Errors travel as [`anyhow::Error`] so call sites can attach context with
//! [`anyhow::Context`]. The CLI downcasts back to [`FixtureError`] and uses
//! [`FixtureError::is_expected`] to decide between a clean one-line
//! diagnostic and a full error chain.
//!
//! # Expected failures
//!
//! Four kinds are part of normal operation and are reported as usage errors:
//! - [`FixtureError::Usage`] (includes unknown templates and requirements)
//! - [`FixtureError::NoData`]
//! - [`FixtureError::UnrecognizedObject`]
//! - [`FixtureError::MisconfiguredHandler`]
//!
//! Everything else is surfaced with its full cause chain.
//!
//! # Examples
//!
//! ```rust,no_run
//! use fixturegen::core::{FixtureError, user_friendly_error};
//!
//! let error = FixtureError::NoData {
//!     object: "shop.Offer".to_string(),
//!     filter: Some("id = 99".to_string()),
//! };
//! assert!(error.is_expected());
//!
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use strsim::levenshtein;
use thiserror::Error;

/// Maximum Levenshtein distance, as a percentage of the candidate length,
/// for a name to be offered as a "did you mean" suggestion.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// The main error type for fixture generation.
///
/// # Error Categories
///
/// ## Invocation
/// - [`Usage`] - Bad arguments, unknown template, unmet requirement
/// - [`ConfigError`] - Configuration file problems
///
/// ## Handler selection and lifecycle
/// - [`UnrecognizedObject`] - No handler claims the object
/// - [`UnsupportedHandler`] - A handler cannot run in this environment
/// - [`MisconfiguredHandler`] - A handler was constructed into an invalid state
///
/// ## Data
/// - [`NoData`] - The query matched nothing
/// - [`MisconfiguredModel`] - A model has no identifying key
/// - [`InvalidRecord`] - A row cannot be turned into a record
/// - [`RecordNotFound`] - A foreign key points at a missing row
/// - [`StoreParseError`] - A store document could not be parsed
///
/// ## Ordering
/// - [`CircularReference`] - Records reference each other in a cycle
/// - [`CircularDependency`] - Models reference each other in a cycle
/// - [`UnresolvedReference`] - A reference points outside the cache
///
/// [`Usage`]: FixtureError::Usage
/// [`ConfigError`]: FixtureError::ConfigError
/// [`UnrecognizedObject`]: FixtureError::UnrecognizedObject
/// [`UnsupportedHandler`]: FixtureError::UnsupportedHandler
/// [`MisconfiguredHandler`]: FixtureError::MisconfiguredHandler
/// [`NoData`]: FixtureError::NoData
/// [`MisconfiguredModel`]: FixtureError::MisconfiguredModel
/// [`InvalidRecord`]: FixtureError::InvalidRecord
/// [`RecordNotFound`]: FixtureError::RecordNotFound
/// [`StoreParseError`]: FixtureError::StoreParseError
/// [`CircularReference`]: FixtureError::CircularReference
/// [`CircularDependency`]: FixtureError::CircularDependency
/// [`UnresolvedReference`]: FixtureError::UnresolvedReference
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FixtureError {
    /// Invalid command-line usage
    #[error("{message}")]
    Usage {
        /// Description of what was wrong with the invocation
        message: String,
    },

    /// The query returned no rows
    #[error("no data returned for '{object}'{}", .filter.as_deref().map(|f| format!(" (where {f})")).unwrap_or_default())]
    NoData {
        /// The object path that was queried
        object: String,
        /// The filter expression, if any
        filter: Option<String>,
    },

    /// No registered handler recognizes the object
    ///
    /// The message lists every handler that was tried and whether the object
    /// path could be located before handler selection.
    #[error(
        "no handler recognizes object '{object_path}' (importable? {}); tried handlers: {}",
        if *.importable { "YES" } else { "NO" },
        if .tried.is_empty() { "<none registered>".to_string() } else { .tried.join(", ") }
    )]
    UnrecognizedObject {
        /// The object path given on the command line
        object_path: String,
        /// Whether the object could be located
        importable: bool,
        /// Names of the handlers that were asked, in registration order
        tried: Vec<String>,
    },

    /// A handler declined because a capability is missing in this environment
    #[error("handler '{handler}' is unsupported: {reason}")]
    UnsupportedHandler {
        /// Name of the handler
        handler: String,
        /// What is missing
        reason: String,
    },

    /// A handler was constructed into an invalid state
    #[error("handler '{handler}' is misconfigured: {reason}")]
    MisconfiguredHandler {
        /// Name of the handler
        handler: String,
        /// Why the handler cannot run
        reason: String,
    },

    /// A model definition is unusable
    #[error("model '{model}' is misconfigured: {reason}")]
    MisconfiguredModel {
        /// Model id
        model: String,
        /// Why the model was rejected
        reason: String,
    },

    /// A row could not be turned into a record
    #[error("invalid record for model '{model}': {reason}")]
    InvalidRecord {
        /// Model id
        model: String,
        /// Why the row was rejected
        reason: String,
    },

    /// A foreign key points at a row the store does not contain
    #[error("record '{model}' with id '{record_id}' not found")]
    RecordNotFound {
        /// Model id of the missing row
        model: String,
        /// Identifier of the missing row
        record_id: String,
    },

    /// Records reference each other in a cycle
    #[error("circular reference detected: {chain}")]
    CircularReference {
        /// The records forming the cycle, joined with arrows
        chain: String,
    },

    /// Models reference each other in a cycle, so no block order exists
    #[error("circular dependency between models: {chain}")]
    CircularDependency {
        /// The models forming the cycle, joined with arrows
        chain: String,
    },

    /// A reference addresses a record that was never registered
    #[error("reference to '{model}' with id '{record_id}' was not discovered")]
    UnresolvedReference {
        /// Model id of the referenced record
        model: String,
        /// Identifier of the referenced record
        record_id: String,
    },

    /// A store document could not be parsed
    #[error("invalid store document {file}: {reason}")]
    StoreParseError {
        /// Path to the document
        file: String,
        /// Parser message
        reason: String,
    },

    /// Configuration file problem
    #[error("configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// File system failure
    #[error("failed to {operation} {path}: {reason}")]
    Io {
        /// What was being attempted
        operation: String,
        /// The path involved
        path: String,
        /// The underlying I/O error message
        reason: String,
    },
}

impl FixtureError {
    /// Build a usage error from a message.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Build an I/O error, keeping only the message of the source error.
    pub fn io(operation: impl Into<String>, path: impl fmt::Display, source: &std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.to_string(),
            reason: source.to_string(),
        }
    }

    /// Whether this failure is an expected outcome of a run.
    ///
    /// Expected failures are reported as a single clean line; anything else
    /// is reported with its full cause chain.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Usage { .. }
                | Self::NoData { .. }
                | Self::UnrecognizedObject { .. }
                | Self::MisconfiguredHandler { .. }
        )
    }

    /// Short name of the error kind, used as the prefix of CLI diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Usage { .. } => "UsageError",
            Self::NoData { .. } => "NoData",
            Self::UnrecognizedObject { .. } => "UnrecognizedObject",
            Self::UnsupportedHandler { .. } => "UnsupportedHandler",
            Self::MisconfiguredHandler { .. } => "MisconfiguredHandler",
            Self::MisconfiguredModel { .. } => "MisconfiguredModel",
            Self::InvalidRecord { .. } => "InvalidRecord",
            Self::RecordNotFound { .. } => "RecordNotFound",
            Self::CircularReference { .. } => "CircularReference",
            Self::CircularDependency { .. } => "CircularDependency",
            Self::UnresolvedReference { .. } => "UnresolvedReference",
            Self::StoreParseError { .. } => "StoreParseError",
            Self::ConfigError { .. } => "ConfigError",
            Self::Io { .. } => "IoError",
        }
    }
}

/// Find the closest candidate to `name`, if any is close enough to suggest.
///
/// ```rust
/// use fixturegen::core::did_you_mean;
///
/// let names = ["toml", "yaml"];
/// assert_eq!(did_you_mean("yml", names.iter().copied()), Some("yaml"));
/// assert_eq!(did_you_mean("xml-ish-format", names.iter().copied()), None);
/// ```
pub fn did_you_mean<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    candidates
        .into_iter()
        .map(|candidate| (candidate, levenshtein(name, candidate)))
        .filter(|(candidate, distance)| {
            *distance * 100 <= candidate.len().max(1) * SIMILARITY_THRESHOLD_PERCENT
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Error with user-facing details and a suggestion.
///
/// ```rust,no_run
/// use fixturegen::core::{ErrorContext, FixtureError};
///
/// ErrorContext::new(FixtureError::usage("missing object path"))
///     .with_suggestion("Pass the object to generate, e.g. 'fixture shop.Offer'")
///     .display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: FixtureError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no details or suggestion.
    #[must_use]
    pub const fn new(error: FixtureError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details, and suggestion to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Find the [`FixtureError`] anywhere in an error chain.
#[must_use]
pub fn find_fixture_error(error: &anyhow::Error) -> Option<&FixtureError> {
    error.chain().find_map(|cause| cause.downcast_ref::<FixtureError>())
}

/// Convert any error into an [`ErrorContext`] with actionable suggestions.
///
/// Errors carrying a [`FixtureError`] somewhere in their chain get tailored
/// suggestions. Other errors keep their whole cause chain in the message.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(fixture_error) = find_fixture_error(&error) {
        return create_error_context(fixture_error.clone());
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(FixtureError::Usage {
        message,
    })
}

fn create_error_context(error: FixtureError) -> ErrorContext {
    match &error {
        FixtureError::NoData { filter, .. } => {
            let suggestion = if filter.is_some() {
                "Loosen or remove the --where filter"
            } else {
                "Check that the store (or --dsn document) contains rows for this model"
            };
            ErrorContext::new(error.clone()).with_suggestion(suggestion)
        }
        FixtureError::UnrecognizedObject { importable: false, .. } => {
            ErrorContext::new(error).with_suggestion(
                "Use 'module.Model' where module.json/.yaml/.toml lives in the working directory or an --env directory",
            )
        }
        FixtureError::UnrecognizedObject { .. } => ErrorContext::new(error)
            .with_details("The object was located but no registered handler accepts it"),
        FixtureError::MisconfiguredHandler { .. } => ErrorContext::new(error)
            .with_suggestion("Check the --dsn value and the model definitions in the store document"),
        FixtureError::MisconfiguredModel { .. } => ErrorContext::new(error)
            .with_suggestion("Every model needs a 'key' naming its identifying attribute"),
        FixtureError::CircularReference { .. } => ErrorContext::new(error)
            .with_details("A fixture can only declare records whose references form no cycle")
            .with_suggestion("Narrow the --where filter or break the cycle with a nullable reference"),
        FixtureError::CircularDependency { .. } => ErrorContext::new(error)
            .with_details("Blocks are declared per model, so models cannot reference each other both ways"),
        FixtureError::StoreParseError { file, .. } => {
            let file = file.clone();
            ErrorContext::new(error)
                .with_suggestion(format!("Check the syntax of {file}"))
        }
        FixtureError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Check fixturegen.toml; supported keys are template, prefix, suffix, env and dsn"),
        _ => ErrorContext::new(error),
    }
}
