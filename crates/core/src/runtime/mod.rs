//! Provisioning runtime: the explicit context and the orchestrator driving it.

pub mod context;
pub mod orchestrator;

pub use context::{IndexRefresh, ProvisionContext};
pub use orchestrator::ProvisionOrchestrator;
