//! Manifest discovery and output path derivation for batch runs.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use ossa_contracts::error::{OssaError, OssaResult};

use crate::format::ManifestFormat;

/// Infix marking files written by a previous migration run.
pub const MIGRATED_INFIX: &str = ".migrated.";

/// Every manifest file under `root`, sorted by path.
///
/// Only files with a YAML or JSON extension are returned. Files written by a
/// previous run (`*.migrated.*`) and hidden entries are skipped.
pub fn discover(root: &Path) -> OssaResult<Vec<PathBuf>> {
    let mut found = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name().to_str()));

    for entry in walker {
        let entry = entry.map_err(|e| OssaError::RepositoryError {
            path: root.display().to_string(),
            reason: format!("failed to walk directory: {e}"),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if ManifestFormat::from_path(path).is_none() || is_migrated_output(path) {
            continue;
        }
        found.push(path.to_path_buf());
    }

    found.sort();
    debug!(root = %root.display(), count = found.len(), "discovered manifests");
    Ok(found)
}

/// `<stem>.migrated.<ext>` next to `source`.
pub fn default_output_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match source.extension() {
        Some(ext) => format!("{stem}.migrated.{}", ext.to_string_lossy()),
        None => format!("{stem}.migrated"),
    };
    source.with_file_name(name)
}

fn is_migrated_output(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.contains(MIGRATED_INFIX))
}

fn is_hidden(name: Option<&str>) -> bool {
    name.is_some_and(|n| n.starts_with('.'))
}
