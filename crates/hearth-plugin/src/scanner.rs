//! Filesystem scanner: discovers plugin units under the configured roots.
//!
//! A directory is a unit when it directly contains both `<N>.<impl-ext>`
//! and `<N>.<manifest-ext>` for some stem `N`. Directories that are not
//! units are searched recursively. The roots themselves are never units.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use tracing::{debug, warn};

use hearth_core::error::AppError;
use hearth_core::result::AppResult;
use hearth_entity::plugin::PluginInfo;

use crate::layout::ModuleLayout;

/// A unit found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedPlugin {
    /// File stem of the unit's files.
    pub basename: String,
    /// Directory of the unit (root joined with the subpath).
    pub filepath: String,
    /// Parsed manifest.
    pub info: PluginInfo,
}

/// Scan output keyed by registry name.
pub type ScanResult = BTreeMap<String, ScannedPlugin>;

/// One directory listing entry.
struct DirEntry {
    name: String,
    is_dir: bool,
}

/// Read-only discovery of plugin units.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    layout: ModuleLayout,
}

impl Scanner {
    /// Creates a scanner using the given file layout.
    pub fn new(layout: ModuleLayout) -> Self {
        Self { layout }
    }

    /// Scans every root in order and merges the results.
    ///
    /// A later root takes precedence for a name already claimed by an
    /// earlier root; the displaced unit is kept under its directory path.
    /// A second unit with the same name inside one root is likewise kept
    /// under its directory path. No unit is ever dropped on collision.
    pub async fn scan(&self, roots: &[PathBuf]) -> ScanResult {
        let mut result = ScanResult::new();

        for root in roots {
            let mut found = Vec::new();
            let mut visited = HashSet::new();
            self.scan_dir(root.clone(), false, &mut visited, &mut found)
                .await;
            debug!(root = %root.display(), units = found.len(), "Scanned plugin root");

            let mut claimed = HashSet::new();
            for unit in found {
                if !claimed.insert(unit.basename.clone()) {
                    warn!(
                        name = %unit.basename,
                        filepath = %unit.filepath,
                        "Duplicate plugin name in one root, keeping it under its path"
                    );
                    result.insert(unit.filepath.clone(), unit);
                    continue;
                }

                if let Some(previous) = result.remove(&unit.basename) {
                    warn!(
                        name = %unit.basename,
                        overridden = %previous.filepath,
                        by = %unit.filepath,
                        "Plugin overridden by a later root"
                    );
                    result.insert(previous.filepath.clone(), previous);
                }
                result.insert(unit.basename.clone(), unit);
            }
        }

        result
    }

    fn scan_dir<'a>(
        &'a self,
        dir: PathBuf,
        may_be_unit: bool,
        visited: &'a mut HashSet<PathBuf>,
        out: &'a mut Vec<ScannedPlugin>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            // Symlinks are followed, so each real directory is walked once.
            match tokio::fs::canonicalize(&dir).await {
                Ok(real) if !visited.insert(real.clone()) => {
                    debug!(dir = %dir.display(), "Skipping already scanned directory");
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(dir = %dir.display(), error = %e, "Skipping unresolvable directory");
                    return;
                }
            }

            let entries = match read_dir_sorted(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                    return;
                }
            };

            if may_be_unit {
                if let Some(basename) = self.unit_basename(&dir, &entries) {
                    match self.read_manifest(&dir, &basename).await {
                        Ok(info) => out.push(ScannedPlugin {
                            basename,
                            filepath: dir.to_string_lossy().into_owned(),
                            info,
                        }),
                        Err(e) => warn!(
                            dir = %dir.display(),
                            error = %e,
                            "Ignoring plugin with unusable manifest"
                        ),
                    }
                    return;
                }
            }

            for entry in entries.iter().filter(|e| e.is_dir) {
                self.scan_dir(dir.join(&entry.name), true, visited, out)
                    .await;
            }
        })
    }

    /// Picks the unit stem of a directory: the directory's own name when it
    /// qualifies, otherwise the smallest qualifying stem.
    fn unit_basename(&self, dir: &Path, entries: &[DirEntry]) -> Option<String> {
        let files: BTreeSet<&str> = entries
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.name.as_str())
            .collect();

        let suffix = format!(".{}", self.layout.implementation_extension);
        let mut stems = files
            .iter()
            .filter_map(|f| f.strip_suffix(suffix.as_str()))
            .filter(|stem| !stem.is_empty())
            .filter(|stem| files.contains(self.layout.manifest_file(stem).as_str()));

        let dir_name = dir.file_name().and_then(|n| n.to_str());
        let first = stems.next()?;
        if Some(first) == dir_name {
            return Some(first.to_string());
        }
        match dir_name {
            Some(own) if stems.any(|stem| stem == own) => Some(own.to_string()),
            _ => Some(first.to_string()),
        }
    }

    async fn read_manifest(&self, dir: &Path, basename: &str) -> AppResult<PluginInfo> {
        let path = dir.join(self.layout.manifest_file(basename));
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            AppError::manifest(format!("Cannot read manifest '{}': {e}", path.display()))
        })?;
        PluginInfo::from_json(&bytes)
    }
}

async fn read_dir_sorted(dir: &Path) -> std::io::Result<Vec<DirEntry>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        // Follow symlinks, and treat entries that cannot be inspected as files.
        let is_dir = tokio::fs::metadata(entry.path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        entries.push(DirEntry { name, is_dir });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
