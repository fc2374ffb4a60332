//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! `MANSCOPE_*` environment variables. Front-ends apply their own flags last.

use crate::error::{ManscopeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_STORE_DIR: &str = "MANSCOPE_STORE_DIR";
pub const ENV_CONCURRENCY: &str = "MANSCOPE_CONCURRENCY";
pub const ENV_EXTRACT_TIMEOUT: &str = "MANSCOPE_EXTRACT_TIMEOUT";

const DEFAULT_EXTRACT_TIMEOUT_SECS: u64 = 30;

/// Base directory for everything manscope keeps on disk.
pub fn manscope_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".manscope")
}

fn default_store_dir() -> PathBuf {
    manscope_home().join("manpages")
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_extract_timeout_secs() -> u64 {
    DEFAULT_EXTRACT_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Directories to scan. `None` reads `PATH` at scan time.
    pub search_path: Option<Vec<PathBuf>>,
    /// Root directory of the artifact store.
    pub store_dir: PathBuf,
    /// Upper bound on concurrently running provisioning units.
    pub concurrency: usize,
    /// Per-command budget for the external extraction call.
    pub extract_timeout_secs: u64,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            search_path: None,
            store_dir: default_store_dir(),
            concurrency: default_concurrency(),
            extract_timeout_secs: default_extract_timeout_secs(),
        }
    }
}

impl ProvisionConfig {
    pub fn default_location() -> PathBuf {
        manscope_home().join("config.json")
    }

    /// Loads defaults, the config file and environment overrides.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_location();
                if default_path.is_file() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ManscopeError::from_io(path, e))?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Applies `MANSCOPE_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_STORE_DIR).filter(|v| !v.is_empty()) {
            self.store_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_CONCURRENCY) {
            self.concurrency = raw.trim().parse().map_err(|_| {
                ManscopeError::Config(format!("{ENV_CONCURRENCY} must be a number, got {raw:?}"))
            })?;
        }
        if let Some(raw) = lookup(ENV_EXTRACT_TIMEOUT) {
            self.extract_timeout_secs = raw.trim().parse().map_err(|_| {
                ManscopeError::Config(format!(
                    "{ENV_EXTRACT_TIMEOUT} must be a number of seconds, got {raw:?}"
                ))
            })?;
        }
        Ok(())
    }

    /// Per-command extraction budget. Zero disables the timeout.
    pub fn extract_timeout(&self) -> Option<Duration> {
        (self.extract_timeout_secs > 0).then(|| Duration::from_secs(self.extract_timeout_secs))
    }

    /// Concurrency actually used for a batch. Zero falls back to the host's parallelism.
    pub fn effective_concurrency(&self, requested: usize) -> usize {
        match (requested, self.concurrency) {
            (0, 0) => default_concurrency(),
            (0, configured) => configured,
            (requested, _) => requested,
        }
    }
}
