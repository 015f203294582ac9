//! On-disk manifest formats.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;

/// A manifest could not be parsed from, or rendered to, its text form.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialization format of a manifest file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
}

impl ManifestFormat {
    /// The format implied by `path`'s extension (case-insensitive), if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(ManifestFormat::Yaml),
            "json" => Some(ManifestFormat::Json),
            _ => None,
        }
    }

    pub fn parse(&self, text: &str) -> Result<Value, FormatError> {
        Ok(match self {
            ManifestFormat::Yaml => serde_yaml::from_str(text)?,
            ManifestFormat::Json => serde_json::from_str(text)?,
        })
    }

    /// Render `document` in this format. JSON output is pretty-printed with a
    /// trailing newline.
    pub fn render(&self, document: &Value) -> Result<String, FormatError> {
        match self {
            ManifestFormat::Yaml => Ok(serde_yaml::to_string(document)?),
            ManifestFormat::Json => {
                let mut text = serde_json::to_string_pretty(document)?;
                text.push('\n');
                Ok(text)
            }
        }
    }
}
