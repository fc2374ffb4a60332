//! On-disk artifact store: one text file per command.

use super::{ArtifactRecord, ArtifactStore, ArtifactSummary, StoreStats};
use crate::error::{ManscopeError, Result};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, trace};

const ARTIFACT_EXT: &str = "txt";
const TMP_SUFFIX: &str = ".tmp";

pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// The root is created lazily on first write.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the artifact for `key`.
    pub fn artifact_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.{ARTIFACT_EXT}")))
    }

    fn key_of(path: &Path) -> Option<String> {
        if path.extension()? != ARTIFACT_EXT {
            return None;
        }
        let key = path.file_stem()?.to_str()?;
        // Skip in-flight temporaries like `.grep.txt.tmp`.
        if key.starts_with('.') {
            return None;
        }
        Some(key.to_string())
    }

    fn artifact_files(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ManscopeError::from_io(&self.root, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ManscopeError::from_io(&self.root, e))?;
            let path = entry.path();
            if path.is_file() && Self::key_of(&path).is_some() {
                files.push(path);
            }
        }
        Ok(files)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn exists(&self, key: &str) -> bool {
        self.artifact_path(key)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    fn read(&self, key: &str) -> Result<ArtifactRecord> {
        let location = self.artifact_path(key)?;
        let bytes = fs::read(&location).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                ManscopeError::NotFound(format!("artifact for {key} at {}", location.display()))
            }
            _ => ManscopeError::from_io(&location, e),
        })?;

        Ok(ArtifactRecord {
            key: key.to_string(),
            content: String::from_utf8_lossy(&bytes).into_owned(),
            location,
        })
    }

    fn write(&self, key: &str, content: &str) -> Result<ArtifactRecord> {
        let location = self.artifact_path(key)?;
        fs::create_dir_all(&self.root).map_err(|e| ManscopeError::from_io(&self.root, e))?;

        // Each write gets its own temporary beside the target, so concurrent
        // writers of one key never rename each other's file.
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{key}."))
            .suffix(TMP_SUFFIX)
            .tempfile_in(&self.root)
            .map_err(|e| ManscopeError::from_io(&self.root, e))?;
        let tmp_path = tmp.path().to_path_buf();
        tmp.write_all(content.as_bytes())
            .map_err(|e| ManscopeError::from_io(&tmp_path, e))?;
        tmp.persist(&location)
            .map_err(|e| ManscopeError::from_io(&location, e.error))?;
        trace!("Stored artifact for {} at {}", key, location.display());

        Ok(ArtifactRecord {
            key: key.to_string(),
            content: content.to_string(),
            location,
        })
    }

    fn list_known_keys(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .artifact_files()?
            .iter()
            .filter_map(|path| Self::key_of(path))
            .collect())
    }

    fn summaries(&self) -> Result<Vec<ArtifactSummary>> {
        let mut summaries = Vec::new();
        for path in self.artifact_files()? {
            let Some(key) = Self::key_of(&path) else {
                continue;
            };
            let metadata = fs::metadata(&path).map_err(|e| ManscopeError::from_io(&path, e))?;
            let modified_at = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);
            summaries.push(ArtifactSummary {
                key,
                path,
                size_bytes: metadata.len(),
                modified_at,
            });
        }
        summaries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(summaries)
    }

    fn stats(&self) -> Result<StoreStats> {
        let summaries = self.summaries()?;
        Ok(StoreStats {
            root: self.root.clone(),
            total_artifacts: summaries.len(),
            total_bytes: summaries.iter().map(|s| s.size_bytes).sum(),
        })
    }

    fn clear(&self) -> Result<usize> {
        let files = self.artifact_files()?;
        let removed = files.len();
        for path in files {
            fs::remove_file(&path).map_err(|e| ManscopeError::from_io(&path, e))?;
        }
        debug!("Removed {} artifacts from {}", removed, self.root.display());
        Ok(removed)
    }
}

/// Keys become file names, so anything that could escape the root is refused.
fn validate_key(key: &str) -> Result<()> {
    let invalid = key.is_empty()
        || key == "."
        || key == ".."
        || key.starts_with('.')
        || key.contains(['/', '\\', '\0']);
    if invalid {
        return Err(ManscopeError::InvalidKey(key.to_string()));
    }
    Ok(())
}
