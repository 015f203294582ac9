//! The end-to-end migration pipeline.
//!
//!   detect → validate(source) → migrate → validate(target) → summarize
//!
//! A migrated document that fails the final validation is never handed back
//! as a success: the run fails with `ValidationFailure` and the caller must
//! not persist anything.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use ossa_contracts::{
    error::{OssaError, OssaResult},
    migration::{MigratedDocument, MigrationSummary},
    validation::ValidationResult,
    version::VersionId,
};

use crate::{
    detect::detect_version,
    digest::document_digest,
    migrator::Migrator,
    report::summarize,
    traits::{ManifestValidator, RuleChain},
};

/// Everything one pipeline run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub migrated: MigratedDocument,
    /// Verdict for the input against its detected source version.
    pub pre_validation: ValidationResult,
    /// Verdict for the output against the version it now declares.
    pub post_validation: ValidationResult,
    pub summary: MigrationSummary,
    /// SHA-256 of the output document.
    pub digest: String,
}

impl PipelineReport {
    /// True when nothing was migrated and nothing needs writing.
    pub fn is_noop(&self) -> bool {
        self.migrated.is_noop()
    }

    pub fn document(&self) -> &Value {
        &self.migrated.document
    }
}

/// Wires a borrowed rule set and validator into a single migration flow.
///
/// Both collaborators are built once by the process entry point and shared
/// read-only; the pipeline itself holds no mutable state, so one instance
/// may serve any number of threads.
pub struct MigrationPipeline<'a> {
    rules: &'a dyn RuleChain,
    validator: &'a dyn ManifestValidator,
}

impl<'a> MigrationPipeline<'a> {
    pub fn new(rules: &'a dyn RuleChain, validator: &'a dyn ManifestValidator) -> Self {
        Self { rules, validator }
    }

    /// Detect the source version of `document` without migrating it.
    pub fn detect(&self, document: &Value) -> OssaResult<VersionId> {
        detect_version(document, self.rules.version_table())
    }

    /// Validate `document` against its own detected version.
    pub fn validate_detected(&self, document: &Value) -> OssaResult<(VersionId, ValidationResult)> {
        let version = self.detect(document)?;
        let result = self.validator.validate(document, &version)?;
        Ok((version, result))
    }

    /// Run the full pipeline for `document` towards `target`.
    ///
    /// # Errors
    ///
    /// - `UnrecognizedFormat` / `IncompleteMigrationPath` from the migrator
    /// - `SchemaUnavailable` from either validation
    /// - `ValidationFailure` when steps were applied but the output does not
    ///   validate against the target version
    ///
    /// An already-current document is not an error; its report is a no-op
    /// whose `post_validation` may still be invalid.
    pub fn run(&self, document: &Value, target: &VersionId) -> OssaResult<PipelineReport> {
        let (source, pre_validation) = self.validate_detected(document)?;
        debug!(
            source = %source,
            valid = pre_validation.valid,
            errors = pre_validation.errors.len(),
            "pre-migration validation"
        );

        let migrated = Migrator::new(self.rules).migrate_to(document, target)?;

        let post_version = if migrated.is_noop() {
            &migrated.source_version
        } else {
            &migrated.target_version
        };
        let post_validation = self.validator.validate(&migrated.document, post_version)?;

        if !migrated.is_noop() && !post_validation.valid {
            warn!(
                source = %migrated.source_version,
                target = %migrated.target_version,
                errors = post_validation.errors.len(),
                "migrated document failed validation"
            );
            return Err(OssaError::ValidationFailure {
                version: migrated.target_version.to_string(),
                issues: post_validation.errors,
            });
        }

        let summary = summarize(
            &migrated.source_version,
            &migrated.target_version,
            &migrated.steps,
        );
        let digest = document_digest(&migrated.document);

        Ok(PipelineReport {
            migrated,
            pre_validation,
            post_validation,
            summary,
            digest,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
