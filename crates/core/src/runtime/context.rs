use crate::cache::{ArtifactStore, FsArtifactStore};
use crate::config::ProvisionConfig;
use crate::error::{ManscopeError, Result};
use crate::extract::DocumentExtractor;
use crate::model::PathIndex;
use crate::path::{LiveIndex, PathScanner, search_path_from_env};
use crate::registry::{CommandListing, RegistryEntry, ResourceRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Whether an availability check may use the last scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexRefresh {
    /// Answer from the live index as it is.
    #[default]
    UseCached,
    /// Rescan the search path before answering.
    ForceRescan,
}

/// Everything a provisioning run reads or mutates.
///
/// Tests build a fresh context per case; nothing here is process-global.
pub struct ProvisionContext {
    store: Arc<dyn ArtifactStore>,
    extractor: Arc<dyn DocumentExtractor>,
    registry: Arc<ResourceRegistry>,
    index: LiveIndex,
    config: ProvisionConfig,
}

impl ProvisionContext {
    pub fn new(
        config: ProvisionConfig,
        store: Arc<dyn ArtifactStore>,
        extractor: Arc<dyn DocumentExtractor>,
    ) -> Self {
        Self {
            store,
            extractor,
            registry: Arc::new(ResourceRegistry::new()),
            index: LiveIndex::new(),
            config,
        }
    }

    /// Context backed by a filesystem store at `config.store_dir`.
    pub fn with_fs_store(config: ProvisionConfig, extractor: Arc<dyn DocumentExtractor>) -> Self {
        let store = Arc::new(FsArtifactStore::new(config.store_dir.clone()));
        Self::new(config, store, extractor)
    }

    /// Shares an existing registry instead of creating one.
    pub fn with_registry(mut self, registry: Arc<ResourceRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    pub fn extractor(&self) -> &Arc<dyn DocumentExtractor> {
        &self.extractor
    }

    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    pub fn index(&self) -> Arc<PathIndex> {
        self.index.snapshot()
    }

    /// Search path from config, or `PATH` when none is configured.
    pub fn search_path(&self) -> Vec<PathBuf> {
        self.config
            .search_path
            .clone()
            .unwrap_or_else(search_path_from_env)
    }

    /// Scans `search_path`, replaces the live index and (re)registers the
    /// aggregate listing entry.
    pub fn refresh_index_with(&self, search_path: &[PathBuf]) -> Arc<PathIndex> {
        let index = self.index.replace(PathScanner::scan(search_path));
        self.registry
            .register(RegistryEntry::command_listing(CommandListing::new(
                self.index.clone(),
            )));
        index
    }

    /// Rescans the configured search path off the async executor.
    pub async fn refresh_index(self: &Arc<Self>) -> Result<Arc<PathIndex>> {
        let ctx = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let search_path = ctx.search_path();
            ctx.refresh_index_with(&search_path)
        })
        .await
        .map_err(|e| ManscopeError::Internal(format!("path scan task failed: {e}")))
    }

    pub async fn is_command_available(
        self: &Arc<Self>,
        name: &str,
        refresh: IndexRefresh,
    ) -> Result<bool> {
        let index = match refresh {
            IndexRefresh::UseCached => self.index(),
            IndexRefresh::ForceRescan => self.refresh_index().await?,
        };
        let available = index.contains(name);
        debug!("Availability of {} ({:?}): {}", name, refresh, available);
        Ok(available)
    }
}
