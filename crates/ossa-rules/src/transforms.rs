//! The built-in single-step transforms.
//!
//! Every transform is total: it accepts any document of its source shape,
//! only synthesizes blocks (or keys inside blocks) that are absent, and
//! carries every field it does not explicitly rename forward unchanged.
//! Kind is never invented for structured documents; kind-specific defaults
//! apply only when the declared kind is known.

use serde_json::{json, Value};

use ossa_contracts::document::{Kind, LegacyManifest, Mapping, StructuredManifest};

use crate::rule::StepContext;

/// Annotation key that preserves a legacy agent's `id`.
pub const LEGACY_ID_ANNOTATION: &str = "ossa.io/legacy-id";

// ── legacy-v1 → v0.1.9 ───────────────────────────────────────────────────────

/// Lift the flat `agent` record into `metadata` / `spec` nesting.
///
/// Top-level `metadata` and `spec` mappings that sat beside `agent` are
/// merged into the new blocks underneath the agent-derived values. A stray
/// top-level version marker or `kind` is superseded by the new envelope.
pub fn restructure_legacy(legacy: LegacyManifest, ctx: &StepContext<'_>) -> StructuredManifest {
    let mut agent = legacy.agent;
    let mut extra = legacy.extra;
    let mut metadata = Mapping::new();
    let mut spec = Mapping::new();

    let id = agent.remove("id");
    match agent.remove("name") {
        Some(name) => {
            metadata.insert("name".to_string(), name);
        }
        None => {
            if let Some(id) = &id {
                metadata.insert("name".to_string(), Value::String(scalar_text(id)));
            }
        }
    }
    for key in ["version", "description"] {
        if let Some(value) = agent.remove(key) {
            metadata.insert(key.to_string(), value);
        }
    }
    for key in ["labels", "annotations"] {
        match agent.remove(key) {
            Some(Value::Object(map)) => {
                metadata.insert(key.to_string(), Value::Object(map));
            }
            Some(other) => {
                spec.insert(key.to_string(), other);
            }
            None => {}
        }
    }
    if let Some(id) = id {
        let annotations = child_mapping(&mut metadata, "annotations");
        if let Some(annotations) = annotations {
            annotations
                .entry(LEGACY_ID_ANNOTATION)
                .or_insert_with(|| Value::String(scalar_text(&id)));
        }
    }

    if let Some(role) = agent.remove("role") {
        spec.insert("role".to_string(), role);
    }

    // Legacy records named the model with bare scalars; an explicit `llm`
    // mapping takes precedence over them.
    let mut llm = match agent.remove("llm") {
        Some(Value::Object(map)) => Some(map),
        Some(other) => {
            spec.insert("llm".to_string(), other);
            None
        }
        None => None,
    };
    for key in ["provider", "model"] {
        if spec.contains_key("llm") && llm.is_none() {
            break;
        }
        let Some(value) = agent.remove(key) else {
            continue;
        };
        let target = llm.get_or_insert_with(Mapping::new);
        if target.contains_key(key) {
            spec.insert(key.to_string(), value);
        } else {
            target.insert(key.to_string(), value);
        }
    }
    if let Some(llm) = llm {
        spec.insert("llm".to_string(), Value::Object(llm));
    }

    for (key, value) in agent {
        spec.entry(key).or_insert(value);
    }

    for key in ["apiVersion", "ossaVersion", "kind"] {
        extra.remove(key);
    }
    match extra.remove("metadata") {
        Some(Value::Object(outer)) => merge_missing(&mut metadata, outer),
        Some(other) => {
            spec.entry("metadata").or_insert(other);
        }
        None => {}
    }
    match extra.remove("spec") {
        Some(Value::Object(outer)) => merge_missing(&mut spec, outer),
        Some(other) => {
            spec.entry("spec").or_insert(other);
        }
        None => {}
    }

    StructuredManifest {
        api_version: Some(ctx.api_version.to_string()),
        kind: Some(Kind::Agent.as_str().to_string()),
        metadata: Some(metadata),
        spec: Some(spec),
        extra,
    }
}

// ── v0.1.9 → v0.2.2 ──────────────────────────────────────────────────────────

/// Add runtime model selection, fallback models, cost tracking, and retry
/// configuration.
pub fn add_runtime_cost_retry(mut doc: StructuredManifest, ctx: &StepContext<'_>) -> StructuredManifest {
    stamp(&mut doc, ctx);

    match doc.known_kind() {
        Some(Kind::Agent) => {
            let config = ctx.config;
            if let Some(llm) = child_mapping(doc.spec_mut(), "llm") {
                fill_block(llm, "runtime", config.runtime_block());
                fill_block(llm, "fallback_models", json!([]));
                fill_block(llm, "cost_tracking", config.cost_tracking_block());
                fill_block(llm, "retry_config", config.retry_block());
            }
        }
        Some(Kind::Task) | Some(Kind::Workflow) => {
            fill_block(doc.spec_mut(), "retry_policy", ctx.config.retry_block());
        }
        None => {}
    }
    doc
}

// ── v0.2.2 → current ─────────────────────────────────────────────────────────

/// Add safety and observability blocks and turn capabilities into an
/// OpenAPI-style operation list.
pub fn add_safety_observability_operations(
    mut doc: StructuredManifest,
    ctx: &StepContext<'_>,
) -> StructuredManifest {
    stamp(&mut doc, ctx);

    let Some(kind) = doc.known_kind() else {
        return doc;
    };
    let config = ctx.config;
    let spec = doc.spec_mut();

    if kind == Kind::Agent {
        fill_block(spec, "safety", config.safety_block());
        capabilities_to_operations(spec);
    }
    fill_block(spec, "observability", config.observability_block());
    doc
}

/// Move `spec.capabilities` entries onto the end of `spec.operations`.
///
/// Left untouched when either list is not actually a list.
fn capabilities_to_operations(spec: &mut Mapping) {
    if !matches!(spec.get("capabilities"), Some(Value::Array(_))) {
        return;
    }
    if !matches!(spec.get("operations"), None | Some(Value::Array(_))) {
        return;
    }
    let Some(Value::Array(capabilities)) = spec.remove("capabilities") else {
        return;
    };

    let operations = spec
        .entry("operations")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(list) = operations {
        list.extend(capabilities.into_iter().map(capability_to_operation));
    }
}

/// Convert one capability entry into an operation entry.
///
/// A key is renamed only when the capability does not already carry its
/// operation-style name; otherwise both keys are kept as they are.
pub fn capability_to_operation(capability: Value) -> Value {
    match capability {
        Value::Object(fields) => {
            let taken: Vec<String> = fields
                .keys()
                .filter(|key| operation_name(key) == key.as_str())
                .cloned()
                .collect();
            let mut operation = Mapping::new();
            for (key, value) in fields {
                let renamed = operation_name(&key);
                let claimed = taken.iter().any(|t| t == renamed) || operation.contains_key(renamed);
                if renamed == key || claimed {
                    operation.insert(key, value);
                } else {
                    operation.insert(renamed.to_string(), value);
                }
            }
            Value::Object(operation)
        }
        other => json!({ "operationId": other }),
    }
}

fn operation_name(key: &str) -> &str {
    match key {
        "name" => "operationId",
        "description" => "summary",
        "input_schema" | "inputSchema" => "requestSchema",
        "output_schema" | "outputSchema" => "responseSchema",
        other => other,
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Write the target `apiVersion`; the `ossaVersion` marker is superseded by it.
fn stamp(doc: &mut StructuredManifest, ctx: &StepContext<'_>) {
    doc.api_version = Some(ctx.api_version.to_string());
    doc.extra.remove("ossaVersion");
}

/// The mapping under `key`, inserted empty when absent. `None` when the
/// existing value is not a mapping.
fn child_mapping<'m>(parent: &'m mut Mapping, key: &str) -> Option<&'m mut Mapping> {
    parent
        .entry(key)
        .or_insert_with(|| Value::Object(Mapping::new()))
        .as_object_mut()
}

/// Insert `defaults` under `key` when absent. When both the existing value
/// and `defaults` are mappings, only the missing keys are added.
fn fill_block(parent: &mut Mapping, key: &str, defaults: Value) {
    match (parent.get_mut(key), defaults) {
        (None, defaults) => {
            parent.insert(key.to_string(), defaults);
        }
        (Some(Value::Object(existing)), Value::Object(defaults)) => {
            for (k, v) in defaults {
                existing.entry(k).or_insert(v);
            }
        }
        _ => {}
    }
}

/// Copy entries of `source` that `target` lacks, descending into mappings
/// present on both sides.
fn merge_missing(target: &mut Mapping, source: Mapping) {
    for (key, value) in source {
        match (target.get_mut(&key), value) {
            (None, value) => {
                target.insert(key, value);
            }
            (Some(Value::Object(existing)), Value::Object(nested)) => merge_missing(existing, nested),
            _ => {}
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
