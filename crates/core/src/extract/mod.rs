//! Document extraction seam.
//!
//! The core never looks inside extracted text; it persists whatever an
//! extractor returns or records the failure detail.

pub mod man;

use crate::error::Result;
use async_trait::async_trait;

pub use man::ManPageExtractor;

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Produces the document for `command`.
    ///
    /// Fails with [`ManscopeError::Extraction`](crate::error::ManscopeError::Extraction)
    /// when the command is unknown to the underlying tool or the tool errors.
    async fn extract(&self, command: &str) -> Result<String>;

    fn name(&self) -> &str;
}
