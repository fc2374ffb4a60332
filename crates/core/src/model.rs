use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// An executable discovered on the search path. Identity is `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    pub source_dir: PathBuf,
}

/// Commands grouped by the directory that owns them.
///
/// Directories keep search-path order. A name appears under exactly one
/// directory: the first one in which it was seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathIndex {
    directories: IndexMap<PathBuf, Vec<String>>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the sorted, already-deduplicated names owned by `dir`.
    /// Empty groups are not recorded.
    pub(crate) fn insert_group(&mut self, dir: PathBuf, names: Vec<String>) {
        if !names.is_empty() {
            self.directories.insert(dir, names);
        }
    }

    pub fn directories(&self) -> impl Iterator<Item = (&Path, &[String])> {
        self.directories
            .iter()
            .map(|(dir, names)| (dir.as_path(), names.as_slice()))
    }

    pub fn commands_in(&self, dir: &Path) -> Option<&[String]> {
        self.directories.get(dir).map(Vec::as_slice)
    }

    pub fn commands(&self) -> impl Iterator<Item = Command> + '_ {
        self.directories.iter().flat_map(|(dir, names)| {
            names.iter().map(move |name| Command {
                name: name.clone(),
                source_dir: dir.clone(),
            })
        })
    }

    /// The flattened set of every distinct command name.
    pub fn all_names(&self) -> BTreeSet<String> {
        self.directories.values().flatten().cloned().collect()
    }

    pub fn find(&self, name: &str) -> Option<Command> {
        self.directories
            .iter()
            .find(|(_, names)| names.binary_search_by(|n| n.as_str().cmp(name)).is_ok())
            .map(|(dir, _)| Command {
                name: name.to_string(),
                source_dir: dir.clone(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.directories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStatus {
    /// Extracted, persisted and registered during this call.
    Provisioned,
    /// An artifact already existed; it was registered from the store.
    AlreadyCached,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionOutcome {
    pub command: String,
    pub status: ProvisionStatus,
    pub detail: String,
}

impl ProvisionOutcome {
    pub fn provisioned(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            status: ProvisionStatus::Provisioned,
            detail: String::new(),
        }
    }

    pub fn already_cached(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            status: ProvisionStatus::AlreadyCached,
            detail: String::new(),
        }
    }

    pub fn failed(command: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            status: ProvisionStatus::Failed,
            detail: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status != ProvisionStatus::Failed
    }
}

/// Result of a batch, partitioned by status. Sorted so output does not
/// depend on task completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionSummary {
    pub provisioned: BTreeSet<String>,
    pub already_cached: BTreeSet<String>,
    pub failed: BTreeMap<String, String>,
    /// Commands never dispatched because the batch was cancelled.
    pub cancelled: BTreeSet<String>,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl ProvisionSummary {
    pub fn record(&mut self, outcome: ProvisionOutcome) {
        match outcome.status {
            ProvisionStatus::Provisioned => {
                self.provisioned.insert(outcome.command);
            }
            ProvisionStatus::AlreadyCached => {
                self.already_cached.insert(outcome.command);
            }
            ProvisionStatus::Failed => {
                self.failed.insert(outcome.command, outcome.detail);
            }
        }
    }

    pub fn total(&self) -> usize {
        self.provisioned.len() + self.already_cached.len() + self.failed.len() + self.cancelled.len()
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
