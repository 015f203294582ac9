//! Migration rule types.
//!
//! A `MigrationRule` pairs a pure transform with the descriptive metadata the
//! reporter needs. Transforms are plain function pointers over the typed
//! document shapes, so the rule table is static data that can be shared
//! freely between threads.

use std::{fmt, sync::Arc};

use ossa_contracts::{
    document::{LegacyManifest, ManifestShape, StructuredManifest},
    error::{OssaError, OssaResult},
    version::VersionId,
};
use ossa_core::traits::MigrationStep;

use crate::config::MigrationConfig;

/// Inputs every transform receives besides the document.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// Rule defaults in effect for this rule set.
    pub config: &'a MigrationConfig,
    /// The canonical `apiVersion` of the rule's target version.
    pub api_version: &'a str,
}

/// The transform a rule applies, keyed by the source shape it accepts.
#[derive(Clone, Copy)]
pub enum Transform {
    /// Legacy flat record → structured manifest.
    Restructure(fn(LegacyManifest, &StepContext<'_>) -> StructuredManifest),
    /// Structured manifest → structured manifest.
    Rewrite(fn(StructuredManifest, &StepContext<'_>) -> StructuredManifest),
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Restructure(_) => f.write_str("Transform::Restructure"),
            Transform::Rewrite(_) => f.write_str("Transform::Rewrite"),
        }
    }
}

/// One registered single-step rule.
#[derive(Debug, Clone)]
pub struct MigrationRule {
    /// Stable identifier used in logs and error messages.
    pub id: String,
    pub from: VersionId,
    pub to: VersionId,
    /// Canonical `apiVersion` written by this rule.
    pub api_version: String,
    pub features_added: Vec<String>,
    pub described_changes: Vec<String>,
    pub transform: Transform,
    pub config: Arc<MigrationConfig>,
}

impl MigrationStep for MigrationRule {
    fn from_version(&self) -> &VersionId {
        &self.from
    }

    fn to_version(&self) -> &VersionId {
        &self.to
    }

    fn features_added(&self) -> &[String] {
        &self.features_added
    }

    fn described_changes(&self) -> &[String] {
        &self.described_changes
    }

    /// Apply the transform when `document` has the shape it accepts.
    ///
    /// A shape mismatch means the rule table disagrees with version
    /// detection, which is reported as an incomplete migration path.
    fn apply(&self, document: ManifestShape) -> OssaResult<ManifestShape> {
        let ctx = StepContext {
            config: &self.config,
            api_version: &self.api_version,
        };

        match (self.transform, document) {
            (Transform::Restructure(f), ManifestShape::Legacy(doc)) => {
                Ok(ManifestShape::Structured(f(doc, &ctx)))
            }
            (Transform::Rewrite(f), ManifestShape::Structured(doc)) => {
                Ok(ManifestShape::Structured(f(doc, &ctx)))
            }
            (_, other) => Err(OssaError::IncompleteMigrationPath {
                from: self.from.to_string(),
                to: self.to.to_string(),
                reason: format!(
                    "rule '{}' cannot accept a {}-shaped document",
                    self.id,
                    other.shape_name()
                ),
            }),
        }
    }
}
