//! Error types for the manifest migration pipeline.
//!
//! All fallible operations return `OssaResult<T>`. None of these errors are
//! transient: the same input always produces the same error, so callers never
//! retry them.

use thiserror::Error;

use crate::validation::ValidationIssue;

/// The unified error type for the migration engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OssaError {
    /// The document matches no known version shape.
    ///
    /// `keys` lists the document's top-level keys for diagnostics.
    #[error("unrecognized manifest format: {reason} (top-level keys: [{}])", .keys.join(", "))]
    UnrecognizedFormat { reason: String, keys: Vec<String> },

    /// A source version was recognized but the rule set has no complete chain
    /// to the target. This is a defect in the rule set, not in the input.
    #[error("incomplete migration path from '{from}' to '{to}': {reason}")]
    IncompleteMigrationPath {
        from: String,
        to: String,
        reason: String,
    },

    /// The migrated document did not pass validation for the target version.
    #[error("migrated document failed validation against '{version}' ({} error(s))", .issues.len())]
    ValidationFailure {
        version: String,
        issues: Vec<ValidationIssue>,
    },

    /// The schema for the requested version cannot be loaded at all.
    #[error("schema for version '{version}' is unavailable: {reason}")]
    SchemaUnavailable { version: String, reason: String },

    /// A configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A manifest could not be read from or written to storage.
    #[error("repository error at '{path}': {reason}")]
    RepositoryError { path: String, reason: String },
}

impl OssaError {
    /// Build an `UnrecognizedFormat` error, capturing the top-level keys of
    /// `document` when it is a mapping.
    pub fn unrecognized(reason: impl Into<String>, document: &serde_json::Value) -> Self {
        let keys = document
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        Self::UnrecognizedFormat {
            reason: reason.into(),
            keys,
        }
    }
}

/// Convenience alias used throughout the OSSA crates.
pub type OssaResult<T> = Result<T, OssaError>;
