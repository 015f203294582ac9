//! Validation result types.
//!
//! The validator reports problems with a document through these types rather
//! than through errors. `OssaError` is reserved for conditions where no
//! verdict can be produced at all.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single problem found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Dotted path to the offending field, e.g. `metadata.name`.
    pub location: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationIssue {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// The verdict for one document against one schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True only if `errors` is empty.
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    /// Advisory findings. Never affect `valid`.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn from_parts(errors: Vec<ValidationIssue>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// True when some error is reported at exactly `location`.
    pub fn has_error_at(&self, location: &str) -> bool {
        self.errors.iter().any(|e| e.location == location)
    }
}
