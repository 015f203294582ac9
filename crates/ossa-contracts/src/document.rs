//! Typed views over manifest documents.
//!
//! Documents are loaded and persisted as plain `serde_json::Value` trees.
//! Migration rules never walk those trees directly; they receive one of the
//! recognized shapes below and pattern-match on it.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OssaError, OssaResult};

/// An order-preserving string-keyed mapping.
pub type Mapping = serde_json::Map<String, Value>;

/// The resource kinds a structured manifest may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Agent,
    Task,
    Workflow,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Agent, Kind::Task, Kind::Workflow];

    /// Parse the exact, case-sensitive kind name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Agent => "Agent",
            Kind::Task => "Task",
            Kind::Workflow => "Workflow",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pre-`apiVersion` shape: identity and configuration flattened under a
/// single top-level `agent` mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyManifest {
    pub agent: Mapping,
    /// Every other top-level key, in document order.
    pub extra: Mapping,
}

impl LegacyManifest {
    pub fn from_value(document: &Value) -> OssaResult<Self> {
        let map = as_mapping(document)?;
        let mut extra = map.clone();
        let agent = match extra.remove("agent") {
            Some(Value::Object(agent)) => agent,
            _ => {
                return Err(OssaError::unrecognized(
                    "legacy manifest requires a top-level `agent` mapping",
                    document,
                ))
            }
        };
        Ok(Self { agent, extra })
    }

    pub fn into_value(self) -> Value {
        let mut map = Mapping::new();
        map.insert("agent".to_string(), Value::Object(self.agent));
        map.extend(self.extra);
        Value::Object(map)
    }
}

/// The `apiVersion` / `kind` / `metadata` / `spec` shape shared by every
/// post-legacy version.
///
/// `metadata` and `spec` stay `None` when the source omits them so that
/// validation can still report their absence after migration.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredManifest {
    pub api_version: Option<String>,
    pub kind: Option<String>,
    pub metadata: Option<Mapping>,
    pub spec: Option<Mapping>,
    /// Every other top-level key, in document order.
    pub extra: Mapping,
}

impl StructuredManifest {
    pub fn from_value(document: &Value) -> OssaResult<Self> {
        let mut extra = as_mapping(document)?.clone();

        let api_version = match extra.remove("apiVersion") {
            None => None,
            Some(Value::String(s)) => Some(s),
            Some(_) => {
                return Err(OssaError::unrecognized(
                    "`apiVersion` must be a string",
                    document,
                ))
            }
        };
        let kind = match extra.remove("kind") {
            None => None,
            Some(Value::String(s)) => Some(s),
            Some(_) => {
                return Err(OssaError::unrecognized("`kind` must be a string", document))
            }
        };
        let metadata = take_mapping(&mut extra, "metadata", document)?;
        let spec = take_mapping(&mut extra, "spec", document)?;

        Ok(Self {
            api_version,
            kind,
            metadata,
            spec,
            extra,
        })
    }

    pub fn into_value(self) -> Value {
        let mut map = Mapping::new();
        if let Some(api_version) = self.api_version {
            map.insert("apiVersion".to_string(), Value::String(api_version));
        }
        if let Some(kind) = self.kind {
            map.insert("kind".to_string(), Value::String(kind));
        }
        if let Some(metadata) = self.metadata {
            map.insert("metadata".to_string(), Value::Object(metadata));
        }
        if let Some(spec) = self.spec {
            map.insert("spec".to_string(), Value::Object(spec));
        }
        // A typed field always wins over a same-named leftover.
        for (key, value) in self.extra {
            if !map.contains_key(&key) {
                map.insert(key, value);
            }
        }
        Value::Object(map)
    }

    /// The declared kind, when it is one of the known kinds.
    pub fn known_kind(&self) -> Option<Kind> {
        self.kind.as_deref().and_then(Kind::parse)
    }

    /// The spec mapping, created empty if the source had none.
    pub fn spec_mut(&mut self) -> &mut Mapping {
        self.spec.get_or_insert_with(Mapping::new)
    }
}

/// A document parsed into the shape its detected version prescribes.
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestShape {
    Legacy(LegacyManifest),
    Structured(StructuredManifest),
}

impl ManifestShape {
    pub fn into_value(self) -> Value {
        match self {
            ManifestShape::Legacy(doc) => doc.into_value(),
            ManifestShape::Structured(doc) => doc.into_value(),
        }
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            ManifestShape::Legacy(_) => "legacy",
            ManifestShape::Structured(_) => "structured",
        }
    }
}

fn as_mapping(document: &Value) -> OssaResult<&Mapping> {
    document
        .as_object()
        .ok_or_else(|| OssaError::unrecognized("document root must be a mapping", document))
}

fn take_mapping(extra: &mut Mapping, key: &str, document: &Value) -> OssaResult<Option<Mapping>> {
    match extra.remove(key) {
        None => Ok(None),
        Some(Value::Object(m)) => Ok(Some(m)),
        Some(_) => Err(OssaError::unrecognized(
            format!("`{key}` must be a mapping"),
            document,
        )),
    }
}
