//! Filesystem-backed manifest repository.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde_json::Value;
use tracing::{debug, info};

use ossa_contracts::error::{OssaError, OssaResult};
use ossa_core::traits::ManifestRepository;

use crate::format::ManifestFormat;

/// Reads and writes manifests as files, choosing YAML or JSON by extension.
///
/// Writes go to a sibling temporary file first and are renamed into place,
/// so a failed write never leaves a truncated manifest behind.
#[derive(Debug, Clone, Default)]
pub struct FsManifestRepository;

impl FsManifestRepository {
    pub fn new() -> Self {
        Self
    }

    fn format_for(path: &Path) -> OssaResult<ManifestFormat> {
        ManifestFormat::from_path(path).ok_or_else(|| {
            repository_error(path, "unsupported extension (expected .yaml, .yml, or .json)")
        })
    }
}

impl ManifestRepository for FsManifestRepository {
    fn load(&self, path: &Path) -> OssaResult<Value> {
        let format = Self::format_for(path)?;
        let text = fs::read_to_string(path).map_err(|e| repository_error(path, e))?;
        let document = format
            .parse(&text)
            .map_err(|e| repository_error(path, format!("failed to parse: {e}")))?;
        debug!(path = %path.display(), ?format, "loaded manifest");
        Ok(document)
    }

    fn save(&self, path: &Path, document: &Value) -> OssaResult<()> {
        let format = Self::format_for(path)?;
        let text = format
            .render(document)
            .map_err(|e| repository_error(path, format!("failed to serialize: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| repository_error(parent, e))?;
        }

        let staging = staging_path(path);
        fs::write(&staging, text).map_err(|e| {
            discard(&staging);
            repository_error(&staging, e)
        })?;
        fs::rename(&staging, path).map_err(|e| {
            discard(&staging);
            repository_error(path, e)
        })?;

        info!(path = %path.display(), ?format, "wrote manifest");
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Best-effort removal of a half-written staging file.
fn discard(staging: &Path) {
    if staging.is_file() {
        let _ = fs::remove_file(staging);
    }
}

fn repository_error(path: &Path, reason: impl ToString) -> OssaError {
    OssaError::RepositoryError {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn yaml_save_then_load_keeps_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.yaml");
        let repo = FsManifestRepository::new();
        let doc = json!({ "apiVersion": "ossa/v1", "kind": "Agent", "metadata": { "name": "helper" } });

        repo.save(&path, &doc).unwrap();
        assert_eq!(repo.load(&path).unwrap(), doc);
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn json_file_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("agent.json");
        let repo = FsManifestRepository::new();

        repo.save(&path, &json!({ "agent": { "name": "x" } })).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with('{'));
        assert_eq!(repo.load(&path).unwrap()["agent"]["name"], "x");
    }

    #[test]
    fn missing_file_is_a_repository_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsManifestRepository::new()
            .load(&dir.path().join("absent.yaml"))
            .unwrap_err();
        assert!(matches!(err, OssaError::RepositoryError { .. }));
    }

    #[test]
    fn unparseable_file_is_a_repository_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = FsManifestRepository::new().load(&path).unwrap_err();
        assert!(matches!(err, OssaError::RepositoryError { .. }));
    }

    #[test]
    fn failed_staging_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.yaml");
        // A directory squatting on the staging name makes the write fail.
        fs::create_dir(staging_path(&path)).unwrap();

        let err = FsManifestRepository::new()
            .save(&path, &json!({ "agent": { "name": "x" } }))
            .unwrap_err();

        assert!(matches!(err, OssaError::RepositoryError { .. }));
        assert!(!path.exists());
        assert!(staging_path(&path).is_dir());
    }

    #[test]
    fn discard_removes_a_partial_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let staging = staging_path(&dir.path().join("agent.yaml"));
        fs::write(&staging, "apiVersion: oss").unwrap();

        discard(&staging);
        assert!(!staging.exists());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsManifestRepository::new()
            .save(&dir.path().join("agent.toml"), &json!({}))
            .unwrap_err();
        assert!(matches!(err, OssaError::RepositoryError { .. }));
    }
}
