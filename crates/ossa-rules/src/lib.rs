//! # ossa-rules
//!
//! The built-in migration rules for OSSA manifests.
//!
//! This crate provides [`ruleset::RuleSet`], which implements the
//! [`ossa_core::traits::RuleChain`] trait, and [`config::MigrationConfig`],
//! the TOML file that controls the defaults rules synthesize for new blocks.
//!
//! Built-in chain:
//!
//! | from        | to        | rule                              |
//! |-------------|-----------|-----------------------------------|
//! | `legacy-v1` | `v0.1.9`  | `restructure-legacy-agent`        |
//! | `v0.1.9`    | `v0.2.2`  | `runtime-cost-retry`              |
//! | `v0.2.2`    | `current` | `safety-observability-operations` |
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use ossa_rules::{MigrationConfig, RuleSet};
//!
//! let config = MigrationConfig::from_file(Path::new("ossa-migrate.toml"))?;
//! let rules = RuleSet::builtin(config);
//! ```

pub mod config;
pub mod rule;
pub mod ruleset;
pub mod transforms;

pub use config::MigrationConfig;
pub use rule::{MigrationRule, StepContext, Transform};
pub use ruleset::RuleSet;

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use ossa_contracts::{error::OssaError, version::VersionId};
    use ossa_core::{
        run_batch,
        traits::{ManifestValidator, MigrationStep, RuleChain},
        MigrationPipeline, Migrator,
    };
    use ossa_verify::SchemaValidator;

    use super::*;

    fn validator() -> SchemaValidator {
        SchemaValidator::new().expect("built-in bundles compile")
    }

    fn legacy_helper() -> Value {
        json!({
            "agent": { "id": "a1", "name": "Helper", "version": "1.0.0", "role": "worker" }
        })
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    #[test]
    fn empty_config_uses_defaults() {
        let config = MigrationConfig::from_toml_str("").unwrap();
        assert_eq!(config, MigrationConfig::default());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.cost.currency, "USD");
    }

    #[test]
    fn partial_config_overrides_only_named_fields() {
        let config = MigrationConfig::from_toml_str(
            r#"
            [retry]
            max_attempts = 5

            [cost]
            currency = "EUR"
            "#,
        )
        .unwrap();
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff_strategy, "exponential");
        assert_eq!(config.cost.currency, "EUR");
    }

    #[test]
    fn unknown_config_key_is_rejected() {
        let err = MigrationConfig::from_toml_str("[retry]\nattempts = 5\n").unwrap_err();
        assert!(matches!(err, OssaError::ConfigError { .. }));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = MigrationConfig::from_toml_str("[retry\n").unwrap_err();
        assert!(matches!(err, OssaError::ConfigError { .. }));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for toml in [
            "[retry]\nmax_attempts = 0\n",
            "[retry]\nbackoff_strategy = \"random\"\n",
            "[retry]\ninitial_delay_ms = 50000\nmax_delay_ms = 100\n",
            "[retry]\nmultiplier = 0.5\n",
            "[observability]\nlog_level = \"loud\"\n",
            "[cost]\ncurrency = \"dollars\"\n",
        ] {
            let err = MigrationConfig::from_toml_str(toml).unwrap_err();
            assert!(matches!(err, OssaError::ConfigError { .. }), "accepted: {toml}");
        }
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let err = MigrationConfig::from_file(std::path::Path::new("/nonexistent/ossa.toml")).unwrap_err();
        assert!(matches!(err, OssaError::ConfigError { .. }));
    }

    // ── Chain resolution ──────────────────────────────────────────────────────

    #[test]
    fn every_forward_pair_has_a_contiguous_chain() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        let ids: Vec<VersionId> = rules
            .version_table()
            .entries()
            .iter()
            .map(|e| e.id.clone())
            .collect();

        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let chain = rules.get_chain(&ids[i], &ids[j]).unwrap();
                assert_eq!(chain.len(), j - i, "{} -> {}", ids[i], ids[j]);
                assert_eq!(chain[0].from_version(), &ids[i]);
                assert_eq!(chain[chain.len() - 1].to_version(), &ids[j]);
                for pair in chain.windows(2) {
                    assert_eq!(pair[0].to_version(), pair[1].from_version());
                }
            }
        }
    }

    #[test]
    fn backwards_or_equal_pairs_have_empty_chain() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        assert!(rules
            .get_chain(&VersionId::current(), &VersionId::legacy_v1())
            .unwrap()
            .is_empty());
        assert!(rules
            .get_chain(&VersionId::v0_2_2(), &VersionId::v0_2_2())
            .unwrap()
            .is_empty());
        assert!(rules
            .get_chain(&VersionId::new("v9"), &VersionId::current())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn missing_link_is_incomplete_path() {
        let mut rules = RuleSet::builtin(MigrationConfig::default());
        rules.unregister(&VersionId::v0_1_9(), &VersionId::v0_2_2());

        let err = Migrator::new(&rules).migrate(&legacy_helper()).unwrap_err();
        assert!(matches!(err, OssaError::IncompleteMigrationPath { .. }));

        // Chains that avoid the gap still resolve.
        let chain = rules
            .get_chain(&VersionId::legacy_v1(), &VersionId::v0_1_9())
            .unwrap();
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn registering_a_pair_twice_replaces_the_rule() {
        let mut rules = RuleSet::builtin(MigrationConfig::default());
        rules.register(
            "replacement",
            VersionId::v0_2_2(),
            VersionId::current(),
            &["x"],
            &[],
            Transform::Rewrite(transforms::add_safety_observability_operations),
        );
        assert_eq!(rules.rules().len(), 3);
        assert!(rules.rules().iter().any(|r| r.id == "replacement"));
    }

    // ── End-to-end ────────────────────────────────────────────────────────────

    #[test]
    fn legacy_agent_migrates_to_valid_current() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        let validator = validator();
        let pipeline = MigrationPipeline::new(&rules, &validator);

        let report = pipeline.run(&legacy_helper(), &VersionId::current()).unwrap();

        assert!(report.post_validation.valid, "{:?}", report.post_validation.errors);
        assert_eq!(report.migrated.source_version, VersionId::legacy_v1());
        assert_eq!(report.migrated.steps.len(), 3);

        let doc = report.document();
        assert_eq!(doc["apiVersion"], "ossa/v1");
        assert_eq!(doc["kind"], "Agent");
        assert_eq!(doc["metadata"]["name"], "Helper");
        assert_eq!(doc["metadata"]["annotations"][transforms::LEGACY_ID_ANNOTATION], "a1");
        assert_eq!(doc["spec"]["role"], "worker");
        assert_eq!(doc["spec"]["llm"]["retry_config"]["enabled"], false);
        assert_eq!(doc["spec"]["safety"]["guardrails"]["enabled"], false);

        assert!(report
            .summary
            .added_features
            .iter()
            .any(|f| f == "cost tracking"));
    }

    #[test]
    fn legacy_with_stray_api_version_reaches_current_once() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        let validator = validator();
        let pipeline = MigrationPipeline::new(&rules, &validator);

        let doc = json!({
            "apiVersion": "ossa/v0.1.9",
            "kind": "Agent",
            "agent": { "id": "a1", "name": "Helper", "role": "worker" }
        });
        let report = pipeline.run(&doc, &VersionId::current()).unwrap();
        assert_eq!(report.document()["apiVersion"], "ossa/v1");
        assert_eq!(report.document()["kind"], "Agent");

        let again = pipeline.run(report.document(), &VersionId::current()).unwrap();
        assert!(again.is_noop());
    }

    #[test]
    fn legacy_top_level_blocks_keep_agent_identity() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        let validator = validator();
        let pipeline = MigrationPipeline::new(&rules, &validator);

        let doc = json!({
            "agent": { "id": "a1", "name": "Helper", "role": "worker" },
            "metadata": { "owner": "ops" },
            "spec": { "tools": [{ "type": "mcp" }] }
        });
        let report = pipeline.run(&doc, &VersionId::current()).unwrap();
        let out = report.document();

        assert_eq!(out["metadata"]["name"], "Helper");
        assert_eq!(out["metadata"]["owner"], "ops");
        assert_eq!(out["spec"]["role"], "worker");
        assert_eq!(out["spec"]["tools"], json!([{ "type": "mcp" }]));
    }

    #[test]
    fn roleless_legacy_agent_migrates_with_warning() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        let validator = validator();
        let pipeline = MigrationPipeline::new(&rules, &validator);

        let doc = json!({ "agent": { "id": "a1", "name": "Helper" } });
        assert!(validator.validate(&doc, &VersionId::legacy_v1()).unwrap().valid);

        let report = pipeline.run(&doc, &VersionId::current()).unwrap();
        assert!(report.post_validation.valid, "{:?}", report.post_validation.errors);
        assert!(report
            .post_validation
            .warnings
            .iter()
            .any(|w| w.contains("spec.role")));
    }

    #[test]
    fn integer_legacy_id_becomes_a_valid_name() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        let validator = validator();
        let pipeline = MigrationPipeline::new(&rules, &validator);

        let doc = json!({ "agent": { "id": 42, "role": "worker" } });
        assert!(validator.validate(&doc, &VersionId::legacy_v1()).unwrap().valid);

        let report = pipeline.run(&doc, &VersionId::current()).unwrap();
        assert!(report.post_validation.valid, "{:?}", report.post_validation.errors);
        assert_eq!(report.document()["metadata"]["name"], "42");
    }

    #[test]
    fn already_current_document_is_returned_unchanged() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        let validator = validator();
        let pipeline = MigrationPipeline::new(&rules, &validator);

        let first = pipeline.run(&legacy_helper(), &VersionId::current()).unwrap();
        let current = first.document().clone();

        let second = pipeline.run(&current, &VersionId::current()).unwrap();
        assert!(second.is_noop());
        assert!(second.summary.is_empty());
        assert_eq!(second.document(), &current);
        assert_eq!(second.digest, first.digest);
    }

    #[test]
    fn unrecognized_document_lists_its_keys() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        let err = Migrator::new(&rules)
            .migrate(&json!({ "foo": 1, "bar": 2 }))
            .unwrap_err();
        match err {
            OssaError::UnrecognizedFormat { keys, .. } => assert_eq!(keys, vec!["foo", "bar"]),
            other => panic!("expected UnrecognizedFormat, got {other:?}"),
        }
    }

    #[test]
    fn nameless_agent_fails_at_metadata_name() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        let validator = validator();
        let pipeline = MigrationPipeline::new(&rules, &validator);

        let err = pipeline
            .run(&json!({ "agent": { "role": "worker" } }), &VersionId::current())
            .unwrap_err();
        match err {
            OssaError::ValidationFailure { issues, .. } => {
                assert!(issues.iter().any(|i| i.location == "metadata.name"), "{issues:?}");
            }
            other => panic!("expected ValidationFailure, got {other:?}"),
        }
    }

    #[test]
    fn mid_version_missing_name_is_reported_before_and_after() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        let validator = validator();
        let pipeline = MigrationPipeline::new(&rules, &validator);

        let doc = json!({
            "apiVersion": "ossa/v0.1.9",
            "kind": "Agent",
            "metadata": { "version": "2.0.0" },
            "spec": { "role": "worker" }
        });

        let pre = validator.validate(&doc, &VersionId::v0_1_9()).unwrap();
        assert!(pre.has_error_at("metadata.name"));

        match pipeline.run(&doc, &VersionId::current()).unwrap_err() {
            OssaError::ValidationFailure { issues, .. } => {
                assert!(issues.iter().any(|i| i.location == "metadata.name"), "{issues:?}");
            }
            other => panic!("expected ValidationFailure, got {other:?}"),
        }
    }

    #[test]
    fn ossa_version_task_reaches_current() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        let validator = validator();
        let pipeline = MigrationPipeline::new(&rules, &validator);

        let doc = json!({
            "ossaVersion": "0.1.9",
            "kind": "Task",
            "metadata": { "name": "nightly-sync" },
            "spec": { "steps": [{ "name": "fetch", "action": "http.get" }] }
        });
        let report = pipeline.run(&doc, &VersionId::current()).unwrap();
        let out = report.document();

        assert_eq!(report.migrated.source_version, VersionId::v0_1_9());
        assert!(report.pre_validation.valid, "{:?}", report.pre_validation.errors);
        assert_eq!(out["apiVersion"], "ossa/v1");
        assert!(out.get("ossaVersion").is_none());
        assert_eq!(out["spec"]["retry_policy"]["max_attempts"], 3);
        assert!(out["spec"].get("observability").is_some());
        assert!(out["spec"].get("safety").is_none());
    }

    #[test]
    fn intermediate_target_stops_early() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        let validator = validator();
        let pipeline = MigrationPipeline::new(&rules, &validator);

        let report = pipeline.run(&legacy_helper(), &VersionId::v0_2_2()).unwrap();
        let out = report.document();
        assert_eq!(out["apiVersion"], "ossa/v0.2.2");
        assert!(out["spec"].get("safety").is_none());
        assert!(out["spec"]["llm"].get("cost_tracking").is_some());
    }

    #[test]
    fn configured_defaults_reach_the_output() {
        let config = MigrationConfig::from_toml_str("[cost]\ncurrency = \"EUR\"\n[retry]\nmax_attempts = 7\n").unwrap();
        let rules = RuleSet::builtin(config);
        let migrated = Migrator::new(&rules).migrate(&legacy_helper()).unwrap();

        assert_eq!(migrated.document["spec"]["llm"]["cost_tracking"]["currency"], "EUR");
        assert_eq!(migrated.document["spec"]["llm"]["retry_config"]["max_attempts"], 7);
    }

    #[test]
    fn migration_is_idempotent() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        let migrator = Migrator::new(&rules);

        let once = migrator.migrate(&legacy_helper()).unwrap();
        let twice = migrator.migrate(&once.document).unwrap();
        assert!(twice.is_noop());
        assert_eq!(twice.document, once.document);
    }

    #[test]
    fn unknown_fields_survive_the_full_chain() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        let doc = json!({
            "agent": {
                "name": "Helper",
                "role": "worker",
                "x-cost-center": "R&D",
                "capabilities": [{ "name": "summarize", "description": "Summarize text" }]
            },
            "x-owner": "platform-team"
        });
        let out = Migrator::new(&rules).migrate(&doc).unwrap().document;

        assert_eq!(out["x-owner"], "platform-team");
        assert_eq!(out["spec"]["x-cost-center"], "R&D");
        assert_eq!(
            out["spec"]["operations"],
            json!([{ "operationId": "summarize", "summary": "Summarize text" }])
        );
        assert!(out["spec"].get("capabilities").is_none());
    }

    #[test]
    fn migrated_output_validates_for_every_source_version() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        let validator = validator();
        let sources = [
            legacy_helper(),
            json!({
                "apiVersion": "ossa/v0.1.9",
                "kind": "Agent",
                "metadata": { "name": "helper" },
                "spec": { "role": "worker", "llm": { "provider": "openai", "model": "gpt-4o" } }
            }),
            json!({
                "apiVersion": "ossa/v0.2.2",
                "kind": "Workflow",
                "metadata": { "name": "pipeline" },
                "spec": {
                    "steps": [{ "name": "triage", "agent": "helper" }],
                    "retry_policy": { "max_attempts": 2, "backoff_strategy": "fixed" }
                }
            }),
        ];

        for source in sources {
            let out = Migrator::new(&rules).migrate(&source).unwrap().document;
            let result = validator.validate(&out, &VersionId::current()).unwrap();
            assert!(result.valid, "{source} -> {:?}", result.errors);
        }
    }

    // ── Batch ─────────────────────────────────────────────────────────────────

    #[test]
    fn batch_matches_sequential_runs() {
        let rules = RuleSet::builtin(MigrationConfig::default());
        let validator = validator();
        let pipeline = MigrationPipeline::new(&rules, &validator);

        let documents: Vec<Value> = (0..100)
            .map(|i| match i % 4 {
                0 => json!({ "agent": { "name": format!("agent-{i}"), "role": "worker" } }),
                1 => json!({
                    "apiVersion": "ossa/v0.1.9",
                    "kind": "Task",
                    "metadata": { "name": format!("task-{i}") },
                    "spec": { "steps": [{ "name": "run", "action": "noop" }] }
                }),
                2 => json!({ "agent": { "role": "nameless" } }),
                _ => json!({ "unrelated": i }),
            })
            .collect();

        let sequential: Vec<_> = documents
            .iter()
            .map(|d| pipeline.run(d, &VersionId::current()))
            .collect();
        let batched = run_batch(&pipeline, &documents, &VersionId::current(), 8);

        assert_eq!(batched.len(), sequential.len());
        for (b, s) in batched.iter().zip(&sequential) {
            match (b, s) {
                (Ok(b), Ok(s)) => assert_eq!(b.digest, s.digest),
                (Err(b), Err(s)) => assert_eq!(b, s),
                _ => panic!("batch and sequential disagree"),
            }
        }
        assert_eq!(batched.iter().filter(|r| r.is_ok()).count(), 50);
    }
}
