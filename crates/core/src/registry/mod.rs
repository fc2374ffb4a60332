//! URI-addressed resource registry.
//!
//! Documents are registered under `doc://{command}` with fixed content. The
//! aggregate listing `doc://all-commands` is computed on every read from the
//! live path index, so a rescan shows up without re-registration.

pub mod listing;

use crate::error::{ManscopeError, Result};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

pub use listing::CommandListing;

pub const DOC_SCHEME: &str = "doc://";
pub const ALL_COMMANDS_URI: &str = "doc://all-commands";
pub const TEXT_MIME: &str = "text/plain";

pub fn document_uri(command: &str) -> String {
    format!("{DOC_SCHEME}{command}")
}

/// Accepts either a full `doc://` URI or a bare command name.
pub fn resolve_uri(identifier: &str) -> String {
    let identifier = identifier.trim();
    if identifier.starts_with(DOC_SCHEME) {
        identifier.to_string()
    } else {
        document_uri(identifier)
    }
}

/// Produces content at read time.
pub trait ContentSupplier: Send + Sync {
    fn read(&self) -> String;
}

#[derive(Clone)]
pub enum ResourceContent {
    Fixed(Arc<str>),
    Lazy(Arc<dyn ContentSupplier>),
}

impl ResourceContent {
    pub fn read(&self) -> String {
        match self {
            ResourceContent::Fixed(text) => text.to_string(),
            ResourceContent::Lazy(supplier) => supplier.read(),
        }
    }
}

impl std::fmt::Debug for ResourceContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceContent::Fixed(text) => write!(f, "Fixed({} bytes)", text.len()),
            ResourceContent::Lazy(_) => f.write_str("Lazy"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    pub tags: BTreeSet<String>,
    pub content: ResourceContent,
}

impl RegistryEntry {
    /// Entry for a command's man page, holding the text it was built from.
    pub fn document(command: &str, content: impl Into<Arc<str>>) -> Self {
        Self {
            uri: document_uri(command),
            name: format!("Man page for {command}"),
            description: format!("Manual page for {command}"),
            mime_type: TEXT_MIME.to_string(),
            tags: ["man".to_string(), command.to_string()].into(),
            content: ResourceContent::Fixed(content.into()),
        }
    }

    /// Entry for the listing of every command on the search path.
    pub fn command_listing(listing: CommandListing) -> Self {
        Self {
            uri: ALL_COMMANDS_URI.to_string(),
            name: "All available commands in PATH".to_string(),
            description: "Commands found in the system's PATH.".to_string(),
            mime_type: TEXT_MIME.to_string(),
            tags: ["man".to_string(), "all-commands".to_string()].into(),
            content: ResourceContent::Lazy(Arc::new(listing)),
        }
    }

    pub fn info(&self) -> ResourceInfo {
        ResourceInfo {
            uri: self.uri.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Entry metadata without content, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceInfo {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    pub tags: BTreeSet<String>,
}

/// Thread-safe URI → entry map. At most one entry per URI; last writer wins.
#[derive(Default)]
pub struct ResourceRegistry {
    entries: DashMap<String, RegistryEntry>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry under `entry.uri`.
    pub fn register(&self, entry: RegistryEntry) {
        tracing::trace!("Registering {}", entry.uri);
        self.entries.insert(entry.uri.clone(), entry);
    }

    /// Registers many entries; callers use this from a single coordinating task.
    pub fn register_batch(&self, entries: impl IntoIterator<Item = RegistryEntry>) {
        for entry in entries {
            self.register(entry);
        }
    }

    /// Current content under `uri`.
    pub fn read(&self, uri: &str) -> Result<String> {
        // Clone out of the map first so a lazy read never runs under a shard lock.
        let content = self
            .entries
            .get(uri)
            .map(|entry| entry.content.clone())
            .ok_or_else(|| ManscopeError::NotFound(format!("resource {uri}")))?;
        Ok(content.read())
    }

    pub fn get(&self, uri: &str) -> Option<ResourceInfo> {
        self.entries.get(uri).map(|entry| entry.info())
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.entries.contains_key(uri)
    }

    pub fn list_uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        uris.sort();
        uris
    }

    pub fn list(&self) -> Vec<ResourceInfo> {
        let mut infos: Vec<ResourceInfo> = self.entries.iter().map(|e| e.info()).collect();
        infos.sort_by(|a, b| a.uri.cmp(&b.uri));
        infos
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
