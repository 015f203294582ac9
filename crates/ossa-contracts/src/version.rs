//! Schema version identifiers and the ordered version table.
//!
//! Versions form a strict total order. Migration only ever moves a document
//! forward through this order, one registered step at a time.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one schema version, e.g. `VersionId("v0.1.9")`.
///
/// The literal `"current"` names the head of the version table and doubles as
/// the "whatever the running engine considers current" sentinel.
///
/// Ids carry no ordering of their own; compare them through
/// [`VersionTable::is_older`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(pub String);

impl VersionId {
    pub const LEGACY_V1: &'static str = "legacy-v1";
    pub const V0_1_9: &'static str = "v0.1.9";
    pub const V0_2_2: &'static str = "v0.2.2";
    pub const CURRENT: &'static str = "current";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn legacy_v1() -> Self {
        Self::new(Self::LEGACY_V1)
    }

    pub fn v0_1_9() -> Self {
        Self::new(Self::V0_1_9)
    }

    pub fn v0_2_2() -> Self {
        Self::new(Self::V0_2_2)
    }

    pub fn current() -> Self {
        Self::new(Self::CURRENT)
    }

    pub fn is_current(&self) -> bool {
        self.0 == Self::CURRENT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the version table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub id: VersionId,
    /// The `apiVersion` string written into documents migrated to this
    /// version. `None` for shapes that predate `apiVersion`.
    pub api_version: Option<String>,
    /// Additional `apiVersion` spellings recognized on input.
    pub aliases: Vec<String>,
    /// Value of a top-level `ossaVersion` marker identifying this version.
    pub ossa_version: Option<String>,
    /// Short human-readable label for operator tooling.
    pub description: String,
}

impl VersionEntry {
    /// True when `api_version` is the canonical string or one of the aliases.
    pub fn accepts_api_version(&self, api_version: &str) -> bool {
        self.api_version.as_deref() == Some(api_version)
            || self.aliases.iter().any(|a| a == api_version)
    }
}

/// The ordered table of known schema versions, oldest first.
///
/// Built once at process start and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTable {
    entries: Vec<VersionEntry>,
}

impl VersionTable {
    /// Build a table from `entries`, oldest first. The last entry is treated
    /// as current.
    pub fn new(entries: Vec<VersionEntry>) -> Self {
        Self { entries }
    }

    /// The built-in version history of the manifest format.
    pub fn builtin() -> Self {
        Self::new(vec![
            VersionEntry {
                id: VersionId::legacy_v1(),
                api_version: None,
                aliases: vec![],
                ossa_version: None,
                description: "flat top-level `agent` record".to_string(),
            },
            VersionEntry {
                id: VersionId::v0_1_9(),
                api_version: Some("ossa/v0.1.9".to_string()),
                aliases: vec!["open-standards-scalable-agents/v0.1.9".to_string()],
                ossa_version: Some("0.1.9".to_string()),
                description: "metadata/spec nesting".to_string(),
            },
            VersionEntry {
                id: VersionId::v0_2_2(),
                api_version: Some("ossa/v0.2.2".to_string()),
                aliases: vec!["open-standards-scalable-agents/v0.2.2".to_string()],
                ossa_version: Some("0.2.2".to_string()),
                description: "runtime models, cost tracking, retries".to_string(),
            },
            VersionEntry {
                id: VersionId::current(),
                api_version: Some("ossa/v1".to_string()),
                aliases: vec!["ossa/v1.0".to_string(), "ossa/v1.0.0".to_string()],
                ossa_version: None,
                description: "safety, observability, OpenAPI-style operations".to_string(),
            },
        ])
    }

    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    /// The head of the table.
    pub fn current(&self) -> Option<&VersionEntry> {
        self.entries.last()
    }

    /// Index of `version` in the total order, resolving the `current`
    /// sentinel to the head.
    pub fn position(&self, version: &VersionId) -> Option<usize> {
        if version.is_current() {
            return self.entries.len().checked_sub(1);
        }
        self.entries.iter().position(|e| &e.id == version)
    }

    pub fn entry(&self, version: &VersionId) -> Option<&VersionEntry> {
        self.position(version).map(|i| &self.entries[i])
    }

    /// True only when both versions are known and `older` strictly precedes
    /// `newer`.
    pub fn is_older(&self, older: &VersionId, newer: &VersionId) -> bool {
        match (self.position(older), self.position(newer)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }

    /// The entries from `from` to `to` inclusive, oldest first. Empty when
    /// either is unknown or `from` is newer than `to`.
    pub fn between(&self, from: &VersionId, to: &VersionId) -> &[VersionEntry] {
        match (self.position(from), self.position(to)) {
            (Some(a), Some(b)) if a <= b => &self.entries[a..=b],
            _ => &[],
        }
    }

    /// Find the entry whose canonical or alias `apiVersion` equals `api_version`.
    pub fn match_api_version(&self, api_version: &str) -> Option<&VersionEntry> {
        self.entries
            .iter()
            .find(|e| e.accepts_api_version(api_version))
    }

    /// Find the entry declaring `ossa_version` as its `ossaVersion` marker.
    pub fn match_ossa_version(&self, ossa_version: &str) -> Option<&VersionEntry> {
        let trimmed = ossa_version.trim_start_matches('v');
        self.entries
            .iter()
            .find(|e| e.ossa_version.as_deref() == Some(trimmed))
    }

    /// Resolve an operator-supplied string: a version id, the `current`
    /// sentinel, or any accepted `apiVersion` spelling.
    pub fn resolve(&self, input: &str) -> Option<VersionId> {
        let candidate = VersionId::new(input);
        if let Some(entry) = self.entry(&candidate) {
            return Some(entry.id.clone());
        }
        self.match_api_version(input).map(|e| e.id.clone())
    }
}

impl Default for VersionTable {
    fn default() -> Self {
        Self::builtin()
    }
}
