//! Source version detection.
//!
//! Detection precedence:
//!
//! 1. `apiVersion` accepted by the current version → `current`
//! 2. a legacy top-level `agent` mapping carrying `id`, `name`, or `role`
//!    directly → `legacy-v1`
//! 3. explicit markers (`apiVersion`, then a top-level `ossaVersion`) matched
//!    against the version table
//! 4. otherwise `UnrecognizedFormat`
//!
//! Detection is pure and never falls back to a default version.

use serde_json::Value;
use tracing::debug;

use ossa_contracts::{
    document::{LegacyManifest, ManifestShape, StructuredManifest},
    error::{OssaError, OssaResult},
    version::{VersionId, VersionTable},
};

const LEGACY_IDENTITY_KEYS: [&str; 3] = ["id", "name", "role"];

/// Determine the schema version `document` was written against.
pub fn detect_version(document: &Value, table: &VersionTable) -> OssaResult<VersionId> {
    let Some(root) = document.as_object() else {
        return Err(OssaError::unrecognized(
            "document root must be a mapping",
            document,
        ));
    };

    let api_version = root.get("apiVersion").and_then(Value::as_str);

    if let (Some(api), Some(current)) = (api_version, table.current()) {
        if current.accepts_api_version(api) {
            debug!(api_version = api, "detected current version");
            return Ok(current.id.clone());
        }
    }

    if is_legacy_agent(root.get("agent")) {
        debug!("detected legacy top-level agent shape");
        return Ok(VersionId::legacy_v1());
    }

    if let Some(entry) = api_version.and_then(|api| table.match_api_version(api)) {
        debug!(version = %entry.id, "detected version from apiVersion");
        return Ok(entry.id.clone());
    }

    if let Some(marker) = root.get("ossaVersion").and_then(Value::as_str) {
        if let Some(entry) = table.match_ossa_version(marker) {
            debug!(version = %entry.id, marker, "detected version from ossaVersion");
            return Ok(entry.id.clone());
        }
    }

    let reason = match api_version {
        Some(api) => format!("apiVersion '{api}' matches no known schema version"),
        None => "no apiVersion, ossaVersion, or legacy agent record found".to_string(),
    };
    Err(OssaError::unrecognized(reason, document))
}

/// Parse `document` into the shape prescribed by `version`.
pub fn parse_shape(document: &Value, version: &VersionId) -> OssaResult<ManifestShape> {
    if version.as_str() == VersionId::LEGACY_V1 {
        LegacyManifest::from_value(document).map(ManifestShape::Legacy)
    } else {
        StructuredManifest::from_value(document).map(ManifestShape::Structured)
    }
}

fn is_legacy_agent(agent: Option<&Value>) -> bool {
    agent
        .and_then(Value::as_object)
        .map(|a| LEGACY_IDENTITY_KEYS.iter().any(|k| a.contains_key(*k)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use ossa_contracts::{
        error::OssaError,
        version::{VersionId, VersionTable},
    };

    use super::{detect_version, parse_shape};

    fn detect(doc: serde_json::Value) -> Result<VersionId, OssaError> {
        detect_version(&doc, &VersionTable::builtin())
    }

    #[test]
    fn legacy_agent_record_is_legacy_v1() {
        let doc = json!({
            "agent": { "id": "a1", "name": "Helper", "version": "1.0.0", "role": "worker" }
        });
        assert_eq!(detect(doc).unwrap(), VersionId::legacy_v1());
    }

    #[test]
    fn current_api_version_wins_over_legacy_shape() {
        let doc = json!({
            "apiVersion": "ossa/v1",
            "agent": { "id": "a1" }
        });
        assert_eq!(detect(doc).unwrap(), VersionId::current());
    }

    #[test]
    fn legacy_shape_wins_over_older_api_version() {
        let doc = json!({
            "apiVersion": "ossa/v0.1.9",
            "agent": { "name": "Helper" }
        });
        assert_eq!(detect(doc).unwrap(), VersionId::legacy_v1());
    }

    #[test]
    fn api_version_marker_selects_mid_version() {
        let doc = json!({ "apiVersion": "ossa/v0.2.2", "kind": "Task" });
        assert_eq!(detect(doc).unwrap(), VersionId::v0_2_2());
    }

    #[test]
    fn ossa_version_marker_is_consulted_last() {
        let doc = json!({ "ossaVersion": "0.1.9", "metadata": { "name": "x" } });
        assert_eq!(detect(doc).unwrap(), VersionId::v0_1_9());
    }

    #[test]
    fn agent_without_identity_keys_is_not_legacy() {
        let doc = json!({ "agent": { "tools": [] } });
        assert!(matches!(detect(doc), Err(OssaError::UnrecognizedFormat { .. })));
    }

    #[test]
    fn unmarked_document_is_unrecognized_with_keys() {
        let doc = json!({ "name": "orphan", "tools": [] });
        match detect(doc) {
            Err(OssaError::UnrecognizedFormat { keys, .. }) => {
                assert_eq!(keys, vec!["name".to_string(), "tools".to_string()]);
            }
            other => panic!("expected UnrecognizedFormat, got {:?}", other),
        }
    }

    #[test]
    fn unknown_api_version_names_the_value() {
        let doc = json!({ "apiVersion": "ossa/v0.3.3", "kind": "Agent" });
        match detect(doc) {
            Err(OssaError::UnrecognizedFormat { reason, .. }) => {
                assert!(reason.contains("ossa/v0.3.3"), "reason: {reason}");
            }
            other => panic!("expected UnrecognizedFormat, got {:?}", other),
        }
    }

    #[test]
    fn non_mapping_root_is_unrecognized() {
        assert!(matches!(
            detect(json!(["not", "a", "manifest"])),
            Err(OssaError::UnrecognizedFormat { .. })
        ));
    }

    #[test]
    fn parse_shape_follows_version() {
        let legacy = json!({ "agent": { "id": "a1" } });
        let shape = parse_shape(&legacy, &VersionId::legacy_v1()).unwrap();
        assert_eq!(shape.shape_name(), "legacy");

        let structured = json!({ "apiVersion": "ossa/v0.2.2" });
        let shape = parse_shape(&structured, &VersionId::v0_2_2()).unwrap();
        assert_eq!(shape.shape_name(), "structured");
    }
}
