//! Executable discovery over an ordered search path.

use crate::model::PathIndex;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Splits `PATH` into directories, dropping empty components.
pub fn search_path_from_env() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|raw| split_search_path(&raw))
        .unwrap_or_default()
}

pub fn split_search_path(raw: &std::ffi::OsStr) -> Vec<PathBuf> {
    std::env::split_paths(raw)
        .filter(|dir| !dir.as_os_str().is_empty())
        .collect()
}

pub struct PathScanner;

impl PathScanner {
    /// Builds a fresh index from `search_path`.
    ///
    /// Never fails: missing or unreadable directories contribute nothing.
    pub fn scan(search_path: &[PathBuf]) -> PathIndex {
        let start = std::time::Instant::now();
        let mut index = PathIndex::new();
        let mut seen: HashSet<String> = HashSet::new();

        for dir in search_path {
            let Some(mut names) = Self::list_executables(dir) else {
                continue;
            };
            names.sort();
            names.retain(|name| seen.insert(name.clone()));
            index.insert_group(dir.clone(), names);
        }

        info!(
            "Path scan complete: {} commands in {} directories ({:?})",
            index.len(),
            index.directories().count(),
            start.elapsed()
        );
        index
    }

    /// Executable regular files directly inside `dir`, or `None` when the
    /// directory cannot be listed.
    fn list_executables(dir: &Path) -> Option<Vec<String>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                warn!("Skipping unreadable directory {}", dir.display());
                return None;
            }
            Err(e) => {
                debug!("Skipping {}: {}", dir.display(), e);
                return None;
            }
        };

        let names = entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                // Follow symlinks; most of /usr/bin is links.
                let path = entry.path();
                let metadata = fs::metadata(&path).ok()?;
                if !metadata.is_file() || !is_executable(&path) {
                    return None;
                }
                entry.file_name().into_string().ok()
            })
            .collect();

        Some(names)
    }
}

/// Whether the current user may execute `path`, as `access(2)` decides.
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    rustix::fs::access(path, rustix::fs::Access::EXEC_OK).is_ok()
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}
