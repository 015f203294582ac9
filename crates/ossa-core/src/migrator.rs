//! The migrator: applies a resolved rule chain to one document.
//!
//!   detect → (no-op if already at target) → resolve chain → apply steps in order
//!
//! The input document is never mutated. Every run produces a new value, and
//! failures are terminal: no partially migrated document is ever returned.

use serde_json::Value;
use tracing::{debug, info};

use ossa_contracts::{
    error::{OssaError, OssaResult},
    migration::MigratedDocument,
    version::VersionId,
};

use crate::{
    detect::{detect_version, parse_shape},
    traits::RuleChain,
};

/// Drives documents through the rule chain of a borrowed rule set.
pub struct Migrator<'r> {
    rules: &'r dyn RuleChain,
}

impl<'r> Migrator<'r> {
    pub fn new(rules: &'r dyn RuleChain) -> Self {
        Self { rules }
    }

    /// Migrate `document` to the current version.
    pub fn migrate(&self, document: &Value) -> OssaResult<MigratedDocument> {
        self.migrate_to(document, &VersionId::current())
    }

    /// Migrate `document` to `target`.
    ///
    /// # Steps
    ///
    /// 1. Detect the source version (`UnrecognizedFormat` on failure).
    /// 2. If the source is already at or past `target`, return the input
    ///    unchanged with no steps. Migration never runs backward.
    /// 3. Resolve the chain; an empty or broken chain is
    ///    `IncompleteMigrationPath`.
    /// 4. Apply each step to the previous step's output.
    pub fn migrate_to(&self, document: &Value, target: &VersionId) -> OssaResult<MigratedDocument> {
        let table = self.rules.version_table();

        let target_entry = table
            .entry(target)
            .ok_or_else(|| OssaError::IncompleteMigrationPath {
                from: "(undetected)".to_string(),
                to: target.to_string(),
                reason: "target version is not in the version table".to_string(),
            })?;
        let target_id = target_entry.id.clone();

        // ── Step 1: Detect ───────────────────────────────────────────────────
        let source = detect_version(document, table)?;

        // ── Step 2: Already at target ────────────────────────────────────────
        if !table.is_older(&source, &target_id) {
            debug!(source = %source, target = %target_id, "document already at target; nothing to do");
            return Ok(MigratedDocument {
                source_version: source,
                target_version: target_id,
                document: document.clone(),
                steps: Vec::new(),
            });
        }

        // ── Step 3: Resolve chain ────────────────────────────────────────────
        let chain = self.rules.get_chain(&source, &target_id)?;
        if chain.is_empty() {
            return Err(OssaError::IncompleteMigrationPath {
                from: source.to_string(),
                to: target_id.to_string(),
                reason: "rule set returned an empty chain".to_string(),
            });
        }

        // ── Step 4: Apply in order ───────────────────────────────────────────
        let mut shape = parse_shape(document, &source)?;
        let mut at = source.clone();
        let mut steps = Vec::with_capacity(chain.len());

        for step in chain {
            if step.from_version() != &at {
                return Err(OssaError::IncompleteMigrationPath {
                    from: source.to_string(),
                    to: target_id.to_string(),
                    reason: format!(
                        "chain is discontinuous: expected a step from '{}', found '{}' -> '{}'",
                        at,
                        step.from_version(),
                        step.to_version()
                    ),
                });
            }

            debug!(from = %step.from_version(), to = %step.to_version(), "applying migration step");
            shape = step.apply(shape)?;
            at = step.to_version().clone();
            steps.push(step.record());
        }

        if at != target_id {
            return Err(OssaError::IncompleteMigrationPath {
                from: source.to_string(),
                to: target_id.to_string(),
                reason: format!("chain stops at '{at}'"),
            });
        }

        info!(source = %source, target = %target_id, steps = steps.len(), "migration applied");

        Ok(MigratedDocument {
            source_version: source,
            target_version: target_id,
            document: shape.into_value(),
            steps,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
