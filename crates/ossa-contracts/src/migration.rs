//! Migration step records and summaries.
//!
//! The migrator records one `AppliedStep` per rule it applies. The reporter
//! later folds those records into a `MigrationSummary` for the operator; the
//! summary is never written into the document itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::version::VersionId;

/// Descriptive metadata of one rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedStep {
    pub from: VersionId,
    pub to: VersionId,
    /// Features the target version introduces, in rule declaration order.
    pub features_added: Vec<String>,
    /// Structural changes the rule performs, in rule declaration order.
    pub described_changes: Vec<String>,
}

/// The result of running the migrator over one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigratedDocument {
    pub source_version: VersionId,
    pub target_version: VersionId,
    /// The migrated document, or the input itself when no step applied.
    pub document: Value,
    /// Steps applied, oldest first. Empty for a no-op.
    pub steps: Vec<AppliedStep>,
}

impl MigratedDocument {
    /// True when the source was already at (or beyond) the target.
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Operator-facing account of one migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub source_version: VersionId,
    pub target_version: VersionId,
    /// Distinct feature names, in the order their rules were applied.
    pub added_features: Vec<String>,
    /// Described changes, in the order their rules were applied.
    pub changes: Vec<String>,
}

impl MigrationSummary {
    pub fn is_empty(&self) -> bool {
        self.added_features.is_empty() && self.changes.is_empty()
    }
}
