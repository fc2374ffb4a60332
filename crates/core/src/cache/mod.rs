//! Persisted artifact cache.
//!
//! The store is the only durable state in manscope. Existence of an artifact
//! is the idempotency oracle for provisioning: a command whose artifact is
//! present is registered from disk and never extracted again.

pub mod artifact_store;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

pub use artifact_store::FsArtifactStore;

/// A persisted document. Immutable once written by the default skip logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub key: String,
    pub content: String,
    pub location: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub key: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub root: PathBuf,
    pub total_artifacts: usize,
    pub total_bytes: u64,
}

/// Key → text storage, keyed by command name.
pub trait ArtifactStore: Send + Sync {
    fn exists(&self, key: &str) -> bool;

    /// Fails with `NotFound` when no artifact is stored under `key`.
    fn read(&self, key: &str) -> Result<ArtifactRecord>;

    /// Persists `content`, replacing any previous artifact.
    fn write(&self, key: &str, content: &str) -> Result<ArtifactRecord>;

    /// Every persisted key. Used to snapshot the cache before a batch.
    fn list_known_keys(&self) -> Result<BTreeSet<String>>;

    fn summaries(&self) -> Result<Vec<ArtifactSummary>>;

    fn stats(&self) -> Result<StoreStats>;

    /// Removes every artifact, returning how many were deleted.
    fn clear(&self) -> Result<usize>;
}
