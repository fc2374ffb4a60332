use crate::model::PathIndex;
use std::sync::{Arc, RwLock};

/// The latest scan, shared between the context and lazy readers.
///
/// Readers take a cheap `Arc` snapshot; a rescan swaps the whole index.
#[derive(Clone, Default)]
pub struct LiveIndex {
    current: Arc<RwLock<Arc<PathIndex>>>,
}

impl LiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<PathIndex> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Discards the previous index. Latest scan wins.
    pub fn replace(&self, index: PathIndex) -> Arc<PathIndex> {
        let index = Arc::new(index);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::clone(&index);
        index
    }
}
