//! Schema-based manifest validator.
//!
//! `SchemaValidator` implements the `ManifestValidator` trait from
//! `ossa-core`. Validation of a structured document runs in three phases:
//!
//! 1. **Envelope**: the four top-level keys are present with the right
//!    types, `apiVersion` is accepted by the requested version, and `kind` is
//!    one of the known kinds.
//! 2. **Metadata**: `metadata.name` is a machine identifier and the optional
//!    metadata fields have the right types.
//! 3. **Kind schema**: `spec` is validated against the bundle entry for the
//!    declared kind using the `jsonschema` crate.
//!
//! All errors are collected before returning so operators see the full
//! failure set in one pass. Locations are dotted paths rooted at the
//! document (`spec.llm.retry_config`).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use jsonschema::error::ValidationErrorKind;
use jsonschema::Validator;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use ossa_contracts::{
    document::Kind,
    error::{OssaError, OssaResult},
    validation::{ValidationIssue, ValidationResult},
    version::{VersionEntry, VersionId, VersionTable},
};
use ossa_core::traits::ManifestValidator;

use crate::schemas::{builtin_bundles, LEGACY_AGENT_KEY};

/// Machine identifiers: 1-63 characters, alphanumeric at both ends, with
/// `.`, `_`, and `-` allowed inside.
pub const NAME_PATTERN: &str = r"^[A-Za-z0-9]([A-Za-z0-9._-]{0,61}[A-Za-z0-9])?$";

/// Compiled kind schemas for one version.
#[derive(Debug)]
struct SchemaBundle {
    kinds: HashMap<String, Validator>,
}

/// The OSSA manifest validator.
///
/// Schemas are compiled once at construction and shared read-only, so a
/// single validator can serve every worker of a batch.
#[derive(Debug)]
pub struct SchemaValidator {
    table: VersionTable,
    bundles: HashMap<VersionId, SchemaBundle>,
    name_pattern: Regex,
}

impl SchemaValidator {
    /// A validator over the built-in version table and schema bundles.
    pub fn new() -> OssaResult<Self> {
        let mut validator = Self::empty(VersionTable::builtin())?;
        for (version, source) in builtin_bundles() {
            validator.register_bundle(version, source)?;
        }
        Ok(validator)
    }

    /// The built-in validator with bundles overridden from `dir`.
    ///
    /// A file named `<version>.json` (`v0.1.9.json`, `current.json`, ...)
    /// replaces the built-in bundle for that version; versions without a file
    /// keep theirs. Each bundle is compiled once and reused for every
    /// document this validator sees.
    pub fn with_schema_dir(dir: &Path) -> OssaResult<Self> {
        if !dir.is_dir() {
            return Err(OssaError::ConfigError {
                reason: format!("schema directory '{}' does not exist", dir.display()),
            });
        }
        let mut validator = Self::new()?;
        let versions: Vec<VersionId> = validator.table.entries().iter().map(|e| e.id.clone()).collect();
        for version in versions {
            let path = dir.join(format!("{version}.json"));
            if !path.is_file() {
                continue;
            }
            let source = fs::read_to_string(&path).map_err(|e| OssaError::SchemaUnavailable {
                version: version.to_string(),
                reason: format!("cannot read {}: {e}", path.display()),
            })?;
            info!(%version, path = %path.display(), "loading schema bundle from directory");
            validator.register_bundle(version, &source)?;
        }
        Ok(validator)
    }

    /// A validator over `table` with no bundles registered.
    pub fn empty(table: VersionTable) -> OssaResult<Self> {
        let name_pattern = Regex::new(NAME_PATTERN).map_err(|e| OssaError::ConfigError {
            reason: format!("invalid name pattern: {e}"),
        })?;
        Ok(Self {
            table,
            bundles: HashMap::new(),
            name_pattern,
        })
    }

    /// Compile and register the bundle for `version` from its JSON text.
    ///
    /// Registering the same version twice replaces the previous bundle.
    pub fn register_bundle(&mut self, version: VersionId, source: &str) -> OssaResult<()> {
        let unavailable = |reason: String| OssaError::SchemaUnavailable {
            version: version.to_string(),
            reason,
        };

        let parsed: Value = serde_json::from_str(source)
            .map_err(|e| unavailable(format!("bundle is not valid JSON: {e}")))?;
        let Value::Object(entries) = parsed else {
            return Err(unavailable("bundle must be a JSON object keyed by kind".to_string()));
        };

        let mut kinds = HashMap::new();
        for (kind, schema) in entries {
            let compiled = jsonschema::validator_for(&schema)
                .map_err(|e| unavailable(format!("invalid JSON Schema for '{kind}': {e}")))?;
            kinds.insert(kind, compiled);
        }

        debug!(%version, kinds = kinds.len(), "registered schema bundle");
        self.bundles.insert(version, SchemaBundle { kinds });
        Ok(())
    }

    pub fn version_table(&self) -> &VersionTable {
        &self.table
    }

    /// True when `name` is an acceptable `metadata.name`.
    pub fn is_valid_name(&self, name: &str) -> bool {
        self.name_pattern.is_match(name)
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn bundle_for(&self, version: &VersionId) -> OssaResult<(&VersionEntry, &SchemaBundle)> {
        let entry = self
            .table
            .entry(version)
            .ok_or_else(|| OssaError::SchemaUnavailable {
                version: version.to_string(),
                reason: "version is not in the version table".to_string(),
            })?;
        let bundle = self
            .bundles
            .get(&entry.id)
            .ok_or_else(|| OssaError::SchemaUnavailable {
                version: entry.id.to_string(),
                reason: "no schema bundle registered".to_string(),
            })?;
        Ok((entry, bundle))
    }

    fn validate_legacy(&self, document: &Value, bundle: &SchemaBundle, errors: &mut Vec<ValidationIssue>) {
        let Some(root) = document.as_object() else {
            errors.push(ValidationIssue::new("", "document root must be a mapping"));
            return;
        };
        let agent = match root.get("agent") {
            None => {
                errors.push(ValidationIssue::new("agent", "is required"));
                return;
            }
            Some(agent @ Value::Object(_)) => agent,
            Some(_) => {
                errors.push(ValidationIssue::new("agent", "must be a mapping"));
                return;
            }
        };

        if let Some(schema) = bundle.kinds.get(LEGACY_AGENT_KEY) {
            schema_errors(schema, agent, "agent", errors);
        }
        if let Some(Value::String(name)) = agent.get("name") {
            self.check_name(name, "agent.name", errors);
        }
    }

    fn validate_structured(
        &self,
        document: &Value,
        entry: &VersionEntry,
        bundle: &SchemaBundle,
        errors: &mut Vec<ValidationIssue>,
        warnings: &mut Vec<String>,
    ) -> OssaResult<()> {
        let Some(root) = document.as_object() else {
            errors.push(ValidationIssue::new("", "document root must be a mapping"));
            return Ok(());
        };

        // ── Phase 1: envelope ─────────────────────────────────────────────────
        match root.get("apiVersion") {
            // Pre-1.0 documents may carry the bare `ossaVersion` marker instead.
            None => match root.get("ossaVersion") {
                Some(Value::String(marker)) if self.marks_version(marker, entry) => {}
                Some(Value::String(marker)) => errors.push(ValidationIssue::new(
                    "ossaVersion",
                    format!("'{marker}' does not match version '{}'", entry.id),
                )),
                _ => errors.push(ValidationIssue::new("apiVersion", "is required")),
            },
            Some(Value::String(api)) => {
                if !entry.accepts_api_version(api) {
                    errors.push(ValidationIssue::new(
                        "apiVersion",
                        format!(
                            "'{api}' does not match version '{}' (expected '{}')",
                            entry.id,
                            entry.api_version.as_deref().unwrap_or("<none>")
                        ),
                    ));
                } else if entry.api_version.as_deref() != Some(api.as_str()) {
                    warnings.push(format!(
                        "apiVersion '{api}' is an alias; prefer '{}'",
                        entry.api_version.as_deref().unwrap_or_default()
                    ));
                }
            }
            Some(_) => errors.push(ValidationIssue::new("apiVersion", "must be a string")),
        }

        let kind = match root.get("kind") {
            None => {
                errors.push(ValidationIssue::new("kind", "is required"));
                None
            }
            Some(Value::String(kind)) => {
                let parsed = Kind::parse(kind);
                if parsed.is_none() {
                    errors.push(ValidationIssue::new(
                        "kind",
                        format!("'{kind}' is not one of Agent, Task, Workflow"),
                    ));
                }
                parsed
            }
            Some(_) => {
                errors.push(ValidationIssue::new("kind", "must be a string"));
                None
            }
        };

        let metadata = required_mapping(root, "metadata", errors);
        let spec = required_mapping(root, "spec", errors);

        // ── Phase 2: metadata ─────────────────────────────────────────────────
        if let Some(metadata) = metadata {
            self.check_metadata(metadata, errors);
        }

        // ── Phase 3: kind schema ──────────────────────────────────────────────
        let (Some(kind), Some(spec_value)) = (kind, root.get("spec").filter(|_| spec.is_some())) else {
            return Ok(());
        };
        let schema = bundle
            .kinds
            .get(kind.as_str())
            .ok_or_else(|| OssaError::SchemaUnavailable {
                version: entry.id.to_string(),
                reason: format!("bundle has no schema for kind '{kind}'"),
            })?;
        schema_errors(schema, spec_value, "spec", errors);

        if kind == Kind::Agent {
            if let Some(spec) = spec {
                agent_warnings(spec, &entry.id, warnings);
            }
        }
        Ok(())
    }

    fn marks_version(&self, marker: &str, entry: &VersionEntry) -> bool {
        self.table
            .match_ossa_version(marker)
            .is_some_and(|matched| matched.id == entry.id)
    }

    fn check_metadata(&self, metadata: &Map<String, Value>, errors: &mut Vec<ValidationIssue>) {
        match metadata.get("name") {
            None => errors.push(ValidationIssue::new("metadata.name", "is required")),
            Some(Value::String(name)) => self.check_name(name, "metadata.name", errors),
            Some(_) => errors.push(ValidationIssue::new("metadata.name", "must be a string")),
        }

        for key in ["version", "description"] {
            if matches!(metadata.get(key), Some(v) if !v.is_string()) {
                errors.push(ValidationIssue::new(format!("metadata.{key}"), "must be a string"));
            }
        }

        for key in ["labels", "annotations"] {
            match metadata.get(key) {
                None => {}
                Some(Value::Object(map)) => {
                    for (label, value) in map {
                        if !value.is_string() {
                            errors.push(ValidationIssue::new(
                                format!("metadata.{key}.{label}"),
                                "must be a string",
                            ));
                        }
                    }
                }
                Some(_) => errors.push(ValidationIssue::new(format!("metadata.{key}"), "must be a mapping")),
            }
        }
    }

    fn check_name(&self, name: &str, location: &str, errors: &mut Vec<ValidationIssue>) {
        if !self.is_valid_name(name) {
            errors.push(ValidationIssue::new(
                location,
                format!("'{name}' is not a valid identifier (1-63 characters, alphanumeric at both ends, '.', '_' or '-' inside)"),
            ));
        }
    }
}

impl ManifestValidator for SchemaValidator {
    /// Validate `document` against `version`.
    ///
    /// Only a missing or uncompilable schema bundle is an `Err`; everything
    /// wrong with the document itself lands in the returned result.
    fn validate(&self, document: &Value, version: &VersionId) -> OssaResult<ValidationResult> {
        let (entry, bundle) = self.bundle_for(version)?;
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if entry.api_version.is_none() {
            self.validate_legacy(document, bundle, &mut errors);
        } else {
            self.validate_structured(document, entry, bundle, &mut errors, &mut warnings)?;
        }

        if !errors.is_empty() {
            warn!(version = %entry.id, errors = errors.len(), "manifest failed validation");
        }
        debug!(version = %entry.id, warnings = warnings.len(), "validation complete");
        Ok(ValidationResult::from_parts(errors, warnings))
    }
}

// ── Free helpers ──────────────────────────────────────────────────────────────

fn required_mapping<'d>(
    root: &'d Map<String, Value>,
    key: &str,
    errors: &mut Vec<ValidationIssue>,
) -> Option<&'d Map<String, Value>> {
    match root.get(key) {
        None => {
            errors.push(ValidationIssue::new(key, "is required"));
            None
        }
        Some(Value::Object(map)) => Some(map),
        Some(_) => {
            errors.push(ValidationIssue::new(key, "must be a mapping"));
            None
        }
    }
}

/// Run `schema` over `instance`, reporting each violation at a dotted
/// location under `prefix`. Missing required properties are reported at the
/// property itself rather than at its parent.
fn schema_errors(schema: &Validator, instance: &Value, prefix: &str, errors: &mut Vec<ValidationIssue>) {
    for error in schema.iter_errors(instance) {
        let mut location = dotted(prefix, &error.instance_path.to_string());
        if let ValidationErrorKind::Required { property } = &error.kind {
            if let Some(property) = property.as_str() {
                location = format!("{location}.{property}");
            }
        }
        errors.push(ValidationIssue::new(location, error.to_string()));
    }
}

/// Convert a JSON Pointer into a dotted path under `prefix`.
fn dotted(prefix: &str, pointer: &str) -> String {
    let mut path = prefix.to_string();
    for segment in pointer.split('/').filter(|s| !s.is_empty()) {
        path.push('.');
        path.push_str(&segment.replace("~1", "/").replace("~0", "~"));
    }
    path
}

fn agent_warnings(spec: &Map<String, Value>, version: &VersionId, warnings: &mut Vec<String>) {
    if !spec.contains_key("role") {
        warnings.push("spec.role is not set; describe what the agent is for".to_string());
    }
    if !spec.contains_key("llm") {
        warnings.push("spec.llm is not set; the agent relies on runtime defaults".to_string());
    }
    let has_tools = matches!(spec.get("tools"), Some(Value::Array(tools)) if !tools.is_empty());
    if !has_tools {
        warnings.push("spec.tools is empty; the agent declares no tools".to_string());
    }
    if version.is_current() && spec.contains_key("capabilities") {
        warnings.push("spec.capabilities is superseded by spec.operations".to_string());
    }
}
