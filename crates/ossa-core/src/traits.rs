//! Core trait definitions for the migration pipeline.
//!
//! These traits are the seams between the engine and its collaborators:
//!
//! - `MigrationStep`: one version-to-version rule
//! - `RuleChain`: the static rule set; resolves step chains
//! - `ManifestValidator`: structural checker for a named schema version
//! - `ManifestRepository`: external load/save of document trees
//!
//! The pipeline takes every collaborator by reference. Nothing is looked up
//! ambiently, so a rule set and validator built once at startup can be shared
//! read-only across any number of concurrent runs.

use std::path::Path;

use serde_json::Value;

use ossa_contracts::{
    document::ManifestShape,
    error::OssaResult,
    migration::AppliedStep,
    validation::ValidationResult,
    version::{VersionId, VersionTable},
};

/// A single-step transformation from one schema version to the next.
///
/// `apply` must be total over every document of its source shape: it may
/// insert defaults for newly introduced fields but never fails on
/// structurally valid input, and never drops a field it does not explicitly
/// rename or restructure.
pub trait MigrationStep: Send + Sync {
    fn from_version(&self) -> &VersionId;

    fn to_version(&self) -> &VersionId;

    /// Feature names the target version introduces, for reporting.
    fn features_added(&self) -> &[String];

    /// Structural changes this step performs, for reporting.
    fn described_changes(&self) -> &[String];

    /// Transform `document` from `from_version()` to `to_version()`.
    fn apply(&self, document: ManifestShape) -> OssaResult<ManifestShape>;

    /// The reporting record for one application of this step.
    fn record(&self) -> AppliedStep {
        AppliedStep {
            from: self.from_version().clone(),
            to: self.to_version().clone(),
            features_added: self.features_added().to_vec(),
            described_changes: self.described_changes().to_vec(),
        }
    }
}

/// The registry of migration steps.
///
/// Implementations are read-only after construction.
pub trait RuleChain: Send + Sync {
    /// The total order the rules are registered against.
    fn version_table(&self) -> &VersionTable;

    /// Resolve the ordered chain of steps mapping `from` onto `to`.
    ///
    /// Returns an empty chain when `from` is not strictly older than `to`
    /// (including when either is unknown). Returns
    /// `OssaError::IncompleteMigrationPath` when some intermediate link has no
    /// registered step.
    fn get_chain(&self, from: &VersionId, to: &VersionId) -> OssaResult<Vec<&dyn MigrationStep>>;
}

/// Structural validation of a document against a schema version.
pub trait ManifestValidator: Send + Sync {
    /// Validate `document` against `version` (which may be the `current`
    /// sentinel).
    ///
    /// Problems with the document are reported in the returned
    /// `ValidationResult`. `Err` is reserved for `SchemaUnavailable`: the
    /// schema for `version` cannot be loaded at all.
    fn validate(&self, document: &Value, version: &VersionId) -> OssaResult<ValidationResult>;
}

/// Durable storage for manifest documents.
///
/// The engine only ever sees already-deserialized trees; on-disk format is
/// the repository's concern.
pub trait ManifestRepository: Send + Sync {
    fn load(&self, path: &Path) -> OssaResult<Value>;

    fn save(&self, path: &Path, document: &Value) -> OssaResult<()>;
}
