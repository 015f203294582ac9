//! Migration reporting.
//!
//! Folds the per-step records accumulated by the migrator into a single
//! `MigrationSummary`. Feature names are deduplicated on first occurrence so
//! the summary reads as a narrative of the migration path.

use std::fmt::Write as _;

use indexmap::IndexSet;

use ossa_contracts::{
    migration::{AppliedStep, MigrationSummary},
    version::VersionId,
};

/// Summarize `steps`, preserving the order in which the rules were applied.
///
/// An empty `steps` slice yields an empty summary.
pub fn summarize(
    source_version: &VersionId,
    target_version: &VersionId,
    steps: &[AppliedStep],
) -> MigrationSummary {
    let mut features: IndexSet<&str> = IndexSet::new();
    let mut changes: Vec<String> = Vec::new();

    for step in steps {
        features.extend(step.features_added.iter().map(String::as_str));
        changes.extend(step.described_changes.iter().cloned());
    }

    MigrationSummary {
        source_version: source_version.clone(),
        target_version: target_version.clone(),
        added_features: features.into_iter().map(str::to_string).collect(),
        changes,
    }
}

/// Render `summary` as indented plain text for a terminal.
pub fn render_text(summary: &MigrationSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Migrated {} -> {}",
        summary.source_version, summary.target_version
    );

    if summary.is_empty() {
        out.push_str("  (no changes)\n");
        return out;
    }

    if !summary.added_features.is_empty() {
        out.push_str("  Added features:\n");
        for feature in &summary.added_features {
            let _ = writeln!(out, "    + {feature}");
        }
    }
    if !summary.changes.is_empty() {
        out.push_str("  Changes:\n");
        for change in &summary.changes {
            let _ = writeln!(out, "    - {change}");
        }
    }
    out
}
