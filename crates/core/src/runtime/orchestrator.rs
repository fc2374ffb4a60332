//! Concurrent provisioning of command documents.
//!
//! Each command is one independent unit of work:
//!
//! ```text
//! Unstarted ─┬─ cache hit ──▶ read artifact ─────────────────────────▶ Registered
//!            └─ cache miss ─▶ extract ─┬─ ok ──▶ persist ────────────▶ Registered
//!                                      └─ err ─────────────────────▶ Failed
//! ```
//!
//! Workers never touch the registry. They hand back the entry they built and
//! the coordinating task registers everything once all workers have joined.

use super::context::ProvisionContext;
use crate::error::{ManscopeError, Result};
use crate::model::{ProvisionOutcome, ProvisionStatus, ProvisionSummary};
use crate::registry::{RegistryEntry, ResourceInfo};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What a unit hands back to the coordinator.
struct UnitResult {
    outcome: ProvisionOutcome,
    entry: Option<RegistryEntry>,
}

impl UnitResult {
    fn failed(command: &str, detail: impl Into<String>) -> Self {
        Self {
            outcome: ProvisionOutcome::failed(command, detail),
            entry: None,
        }
    }
}

#[derive(Clone)]
pub struct ProvisionOrchestrator {
    ctx: Arc<ProvisionContext>,
    cancel_token: CancellationToken,
}

impl ProvisionOrchestrator {
    pub fn new(ctx: Arc<ProvisionContext>) -> Self {
        Self {
            ctx,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Uses an externally owned cancellation signal.
    pub fn with_cancel_token(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    pub fn context(&self) -> &Arc<ProvisionContext> {
        &self.ctx
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Provisions a single command and registers its document.
    pub async fn provision_one(&self, command: &str) -> ProvisionOutcome {
        let result = Self::run_unit(
            Arc::clone(&self.ctx),
            command.to_string(),
            None,
            self.cancel_token.clone(),
        )
        .await;

        if let Some(entry) = result.entry {
            self.ctx.registry().register(entry);
        }
        result.outcome
    }

    /// Registers an already persisted artifact without extracting.
    pub async fn register_cached(&self, command: &str) -> Result<ResourceInfo> {
        let store = Arc::clone(self.ctx.store());
        let key = command.to_string();
        let record = blocking(move || store.read(&key)).await?;

        let entry = RegistryEntry::document(command, record.content);
        let info = entry.info();
        self.ctx.registry().register(entry);
        debug!("Registered cached artifact for {}", command);
        Ok(info)
    }

    /// Provisions every command, at most `concurrency` at a time.
    ///
    /// `concurrency == 0` uses the configured default. Always returns a
    /// summary: individual failures are recorded, never propagated.
    pub async fn provision_all<I, S>(&self, commands: I, concurrency: usize) -> ProvisionSummary
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let start = Instant::now();
        let commands: BTreeSet<String> = commands.into_iter().map(Into::into).collect();
        let limit = self.ctx.config().effective_concurrency(concurrency).max(1);
        info!(
            "Provisioning {} commands with concurrency {}",
            commands.len(),
            limit
        );

        // Snapshot the cache once instead of probing the disk inside every unit.
        let store = Arc::clone(self.ctx.store());
        let known_keys = match blocking(move || store.list_known_keys()).await {
            Ok(keys) => Some(Arc::new(keys)),
            Err(e) => {
                warn!("Could not list cached artifacts, probing per command: {}", e);
                None
            }
        };

        let semaphore = Arc::new(Semaphore::new(limit));
        let mut summary = ProvisionSummary::default();
        let mut handles = Vec::with_capacity(commands.len());
        let mut pending = commands.into_iter();

        for command in pending.by_ref() {
            let permit = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                summary.cancelled.insert(command);
                break;
            };

            let cached = known_keys.as_ref().map(|keys| keys.contains(&command));
            let ctx = Arc::clone(&self.ctx);
            let cancel = self.cancel_token.clone();
            let name = command.clone();
            let handle = tokio::spawn(async move {
                let result = Self::run_unit(ctx, name, cached, cancel).await;
                drop(permit);
                result
            });
            handles.push((command, handle));
        }
        summary.cancelled.extend(pending);

        let mut entries = Vec::with_capacity(handles.len());
        for (command, handle) in handles {
            let outcome = match handle.await {
                Ok(UnitResult { outcome, entry }) => {
                    entries.extend(entry);
                    outcome
                }
                Err(e) => ProvisionOutcome::failed(command, format!("provisioning task failed: {e}")),
            };
            if outcome.status == ProvisionStatus::Failed {
                warn!("Failed to provision {}: {}", outcome.command, outcome.detail);
            }
            summary.record(outcome);
        }

        self.ctx.registry().register_batch(entries);

        summary.elapsed = start.elapsed();
        info!(
            "Provisioning finished in {:?}: {} provisioned, {} cached, {} failed, {} cancelled",
            summary.elapsed,
            summary.provisioned.len(),
            summary.already_cached.len(),
            summary.failed.len(),
            summary.cancelled.len()
        );
        summary
    }

    /// Rescans the search path, then provisions every command found on it.
    pub async fn provision_path(&self, concurrency: usize) -> Result<ProvisionSummary> {
        let index = self.ctx.refresh_index().await?;
        Ok(self.provision_all(index.all_names(), concurrency).await)
    }

    /// Runs one unit. `cached` is the snapshot answer, `None` means probe the store.
    async fn run_unit(
        ctx: Arc<ProvisionContext>,
        command: String,
        cached: Option<bool>,
        cancel: CancellationToken,
    ) -> UnitResult {
        match Self::execute_unit(&ctx, &command, cached, &cancel).await {
            Ok(result) => result,
            Err(e) => UnitResult::failed(&command, e.to_string()),
        }
    }

    async fn execute_unit(
        ctx: &ProvisionContext,
        command: &str,
        cached: Option<bool>,
        cancel: &CancellationToken,
    ) -> Result<UnitResult> {
        let cached = match cached {
            Some(cached) => cached,
            None => {
                let store = Arc::clone(ctx.store());
                let key = command.to_string();
                blocking(move || Ok(store.exists(&key))).await?
            }
        };

        if cached {
            let store = Arc::clone(ctx.store());
            let key = command.to_string();
            let record = blocking(move || store.read(&key)).await?;
            return Ok(UnitResult {
                outcome: ProvisionOutcome::already_cached(command),
                entry: Some(RegistryEntry::document(command, record.content)),
            });
        }

        let extraction = ctx.extractor().extract(command);
        let bounded = async {
            match ctx.config().extract_timeout() {
                Some(limit) => tokio::time::timeout(limit, extraction)
                    .await
                    .unwrap_or_else(|_| {
                        Err(ManscopeError::Extraction(format!(
                            "extraction timed out after {limit:?}"
                        )))
                    }),
                None => extraction.await,
            }
        };
        let extracted = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = bounded => Some(result),
        };
        let Some(extracted) = extracted else {
            return Ok(UnitResult::failed(command, "cancelled"));
        };

        // Nothing is written unless extraction succeeded.
        let content = match extracted {
            Ok(content) => content,
            Err(e) => return Ok(UnitResult::failed(command, e.to_string())),
        };

        let store = Arc::clone(ctx.store());
        let key = command.to_string();
        let record = blocking(move || store.write(&key, &content)).await?;

        Ok(UnitResult {
            outcome: ProvisionOutcome::provisioned(command),
            entry: Some(RegistryEntry::document(command, record.content)),
        })
    }
}

/// Runs synchronous store I/O on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ManscopeError::Internal(format!("blocking task failed: {e}")))?
}
