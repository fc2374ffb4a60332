use super::ContentSupplier;
use crate::path::LiveIndex;

pub const EMPTY_LISTING: &str = "No commands loaded. Run a scan first.";

/// Sorted, deduplicated command names of the latest scan, one per line.
#[derive(Clone)]
pub struct CommandListing {
    index: LiveIndex,
}

impl CommandListing {
    pub fn new(index: LiveIndex) -> Self {
        Self { index }
    }
}

impl ContentSupplier for CommandListing {
    fn read(&self) -> String {
        let names = self.index.snapshot().all_names();
        if names.is_empty() {
            return EMPTY_LISTING.to_string();
        }
        names.into_iter().collect::<Vec<_>>().join("\n")
    }
}
