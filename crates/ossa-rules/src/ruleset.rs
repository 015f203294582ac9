//! The migration rule set.
//!
//! `RuleSet` owns the ordered rule table and implements the `RuleChain`
//! trait from ossa-core.
//!
//! Chain resolution:
//!
//! 1. If `from` is not strictly older than `to` (or either is unknown to the
//!    version table), the chain is empty.
//! 2. Otherwise walk the version table from `from` to `to`, taking for each
//!    adjacent pair the rule registered for exactly that pair.
//! 3. A pair with no registered rule fails the whole resolution with
//!    `IncompleteMigrationPath`.

use std::sync::Arc;

use tracing::{debug, warn};

use ossa_contracts::{
    error::{OssaError, OssaResult},
    version::{VersionId, VersionTable},
};
use ossa_core::traits::{MigrationStep, RuleChain};

use crate::{
    config::MigrationConfig,
    rule::{MigrationRule, Transform},
    transforms,
};

/// The static table of single-step migration rules.
///
/// Build once at process start with [`RuleSet::builtin`] and share by
/// reference; it is never mutated while migrations run.
#[derive(Debug, Clone)]
pub struct RuleSet {
    table: VersionTable,
    rules: Vec<MigrationRule>,
    config: Arc<MigrationConfig>,
}

impl RuleSet {
    /// An empty rule set over `table`.
    pub fn new(table: VersionTable, config: MigrationConfig) -> Self {
        Self {
            table,
            rules: Vec::new(),
            config: Arc::new(config),
        }
    }

    /// The built-in rules over the built-in version table.
    pub fn builtin(config: MigrationConfig) -> Self {
        let mut set = Self::new(VersionTable::builtin(), config);

        set.register(
            "restructure-legacy-agent",
            VersionId::legacy_v1(),
            VersionId::v0_1_9(),
            &["metadata/spec structure", "resource kind"],
            &[
                "moved agent.name, agent.version, agent.description into metadata",
                "recorded agent.id as metadata annotation ossa.io/legacy-id",
                "moved agent.role and remaining agent fields into spec",
                "folded legacy model/provider scalars into spec.llm",
                "set kind to Agent",
            ],
            Transform::Restructure(transforms::restructure_legacy),
        );
        set.register(
            "runtime-cost-retry",
            VersionId::v0_1_9(),
            VersionId::v0_2_2(),
            &[
                "runtime-configurable models",
                "fallback models",
                "cost tracking",
                "retry configuration",
            ],
            &[
                "added spec.llm.runtime (disabled)",
                "added spec.llm.fallback_models",
                "added spec.llm.cost_tracking with budget alerts (disabled)",
                "added spec.llm.retry_config with exponential backoff (disabled)",
                "added spec.retry_policy to Task and Workflow manifests",
                "replaced ossaVersion marker with apiVersion",
            ],
            Transform::Rewrite(transforms::add_runtime_cost_retry),
        );
        set.register(
            "safety-observability-operations",
            VersionId::v0_2_2(),
            VersionId::current(),
            &[
                "safety configuration",
                "observability",
                "OpenAPI-style operations",
            ],
            &[
                "added spec.safety content filtering and guardrails (disabled)",
                "added spec.observability tracing, metrics, and logging (disabled)",
                "converted spec.capabilities into spec.operations",
            ],
            Transform::Rewrite(transforms::add_safety_observability_operations),
        );

        set
    }

    /// Register a rule for the adjacent pair `from` → `to`.
    ///
    /// Registering the same pair twice replaces the earlier rule.
    pub fn register(
        &mut self,
        id: &str,
        from: VersionId,
        to: VersionId,
        features_added: &[&str],
        described_changes: &[&str],
        transform: Transform,
    ) {
        let api_version = self
            .table
            .entry(&to)
            .and_then(|e| e.api_version.clone())
            .unwrap_or_else(|| to.to_string());

        let rule = MigrationRule {
            id: id.to_string(),
            from,
            to,
            api_version,
            features_added: features_added.iter().map(|s| s.to_string()).collect(),
            described_changes: described_changes.iter().map(|s| s.to_string()).collect(),
            transform,
            config: Arc::clone(&self.config),
        };

        self.rules
            .retain(|r| !(r.from == rule.from && r.to == rule.to));
        self.rules.push(rule);
    }

    /// Remove the rule registered for `from` → `to`, if any.
    pub fn unregister(&mut self, from: &VersionId, to: &VersionId) {
        self.rules.retain(|r| !(&r.from == from && &r.to == to));
    }

    pub fn rules(&self) -> &[MigrationRule] {
        &self.rules
    }

    fn rule_for(&self, from: &VersionId, to: &VersionId) -> Option<&MigrationRule> {
        self.rules.iter().find(|r| &r.from == from && &r.to == to)
    }
}

impl RuleChain for RuleSet {
    fn version_table(&self) -> &VersionTable {
        &self.table
    }

    fn get_chain(&self, from: &VersionId, to: &VersionId) -> OssaResult<Vec<&dyn MigrationStep>> {
        let (Some(start), Some(end)) = (self.table.position(from), self.table.position(to)) else {
            debug!(from = %from, to = %to, "unknown version; no chain");
            return Ok(Vec::new());
        };
        if start >= end {
            return Ok(Vec::new());
        }

        let entries = self.table.entries();
        let mut chain: Vec<&dyn MigrationStep> = Vec::with_capacity(end - start);

        for pair in entries[start..=end].windows(2) {
            let (step_from, step_to) = (&pair[0].id, &pair[1].id);
            match self.rule_for(step_from, step_to) {
                Some(rule) => chain.push(rule),
                None => {
                    warn!(from = %step_from, to = %step_to, "no migration rule registered for version pair");
                    return Err(OssaError::IncompleteMigrationPath {
                        from: entries[start].id.to_string(),
                        to: entries[end].id.to_string(),
                        reason: format!("no rule registered from '{step_from}' to '{step_to}'"),
                    });
                }
            }
        }

        debug!(from = %from, to = %to, steps = chain.len(), "resolved migration chain");
        Ok(chain)
    }
}
