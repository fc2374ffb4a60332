#![allow(dead_code)]

use async_trait::async_trait;
use manscope_core::cache::{
    ArtifactRecord, ArtifactStore, ArtifactSummary, FsArtifactStore, StoreStats,
};
use manscope_core::config::ProvisionConfig;
use manscope_core::extract::DocumentExtractor;
use manscope_core::runtime::{ProvisionContext, ProvisionOrchestrator};
use manscope_core::{ManscopeError, Result};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Writes an executable script named `name` into `dir`.
pub fn make_executable(dir: &Path, name: &str) {
    use std::os::unix::fs::PermissionsExt;
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, b"#!/bin/sh\nexit 0\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

pub fn make_plain_file(dir: &Path, name: &str) {
    use std::os::unix::fs::PermissionsExt;
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, b"data").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
}

/// Extractor answering from a fixed table. Unknown commands fail.
#[derive(Default)]
pub struct FixtureExtractor {
    pages: HashMap<String, std::result::Result<String, String>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
}

impl FixtureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, command: &str, text: &str) -> Self {
        self.pages.insert(command.to_string(), Ok(text.to_string()));
        self
    }

    pub fn failure(mut self, command: &str, detail: &str) -> Self {
        self.pages.insert(command.to_string(), Err(detail.to_string()));
        self
    }

    pub fn delay(mut self, command: &str, delay: Duration) -> Self {
        self.delays.insert(command.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }
}

#[async_trait]
impl DocumentExtractor for FixtureExtractor {
    async fn extract(&self, command: &str) -> Result<String> {
        self.calls.lock().unwrap().push(command.to_string());
        if let Some(delay) = self.delays.get(command) {
            tokio::time::sleep(*delay).await;
        }
        match self.pages.get(command) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(detail)) => Err(ManscopeError::Extraction(detail.clone())),
            None => Err(ManscopeError::Extraction(format!(
                "No manual entry for {command}"
            ))),
        }
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

/// Filesystem store that records every write and can inject failures.
pub struct RecordingStore {
    inner: FsArtifactStore,
    writes: Mutex<Vec<String>>,
    failing_writes: BTreeSet<String>,
    failing_listing: bool,
    exists_probes: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            inner: FsArtifactStore::new(root),
            writes: Mutex::new(Vec::new()),
            failing_writes: BTreeSet::new(),
            failing_listing: false,
            exists_probes: Mutex::new(Vec::new()),
        }
    }

    /// Writes for `key` fail with an I/O error.
    pub fn fail_write(mut self, key: &str) -> Self {
        self.failing_writes.insert(key.to_string());
        self
    }

    /// `list_known_keys` fails with an I/O error.
    pub fn fail_listing(mut self) -> Self {
        self.failing_listing = true;
        self
    }

    pub fn exists_probes(&self) -> Vec<String> {
        let mut probes = self.exists_probes.lock().unwrap().clone();
        probes.sort();
        probes
    }

    fn injected(&self, what: &str) -> ManscopeError {
        ManscopeError::Io {
            path: self.inner.root().to_path_buf(),
            source: std::io::Error::other(format!("injected {what} failure")),
        }
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

impl ArtifactStore for RecordingStore {
    fn exists(&self, key: &str) -> bool {
        self.exists_probes.lock().unwrap().push(key.to_string());
        self.inner.exists(key)
    }

    fn read(&self, key: &str) -> Result<ArtifactRecord> {
        self.inner.read(key)
    }

    fn write(&self, key: &str, content: &str) -> Result<ArtifactRecord> {
        self.writes.lock().unwrap().push(key.to_string());
        if self.failing_writes.contains(key) {
            return Err(self.injected("write"));
        }
        self.inner.write(key, content)
    }

    fn list_known_keys(&self) -> Result<BTreeSet<String>> {
        if self.failing_listing {
            return Err(self.injected("listing"));
        }
        self.inner.list_known_keys()
    }

    fn summaries(&self) -> Result<Vec<ArtifactSummary>> {
        self.inner.summaries()
    }

    fn stats(&self) -> Result<StoreStats> {
        self.inner.stats()
    }

    fn clear(&self) -> Result<usize> {
        self.inner.clear()
    }
}

pub fn test_config(store_dir: &Path, search_path: Vec<PathBuf>) -> ProvisionConfig {
    ProvisionConfig {
        search_path: Some(search_path),
        store_dir: store_dir.to_path_buf(),
        concurrency: 4,
        extract_timeout_secs: 5,
    }
}

pub struct Harness {
    pub orchestrator: ProvisionOrchestrator,
    pub store: Arc<RecordingStore>,
    pub extractor: Arc<FixtureExtractor>,
}

impl Harness {
    pub fn new(config: ProvisionConfig, extractor: FixtureExtractor) -> Self {
        let store = RecordingStore::new(config.store_dir.clone());
        Self::with_store(config, extractor, store)
    }

    pub fn with_store(
        config: ProvisionConfig,
        extractor: FixtureExtractor,
        store: RecordingStore,
    ) -> Self {
        let store = Arc::new(store);
        let extractor = Arc::new(extractor);
        let ctx = ProvisionContext::new(config, store.clone(), extractor.clone());
        Self {
            orchestrator: ProvisionOrchestrator::new(Arc::new(ctx)),
            store,
            extractor,
        }
    }

    pub fn ctx(&self) -> &Arc<ProvisionContext> {
        self.orchestrator.context()
    }
}
