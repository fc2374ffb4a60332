use manscope_core::config::ProvisionConfig;
use manscope_core::extract::ManPageExtractor;
use manscope_core::runtime::{ProvisionContext, ProvisionOrchestrator};
use std::sync::Arc;

/// Bootstraps an orchestrator backed by the filesystem store and `man`.
pub fn build_default_orchestrator(config: ProvisionConfig) -> ProvisionOrchestrator {
    tracing::debug!(
        "Artifact store at {}, concurrency {}",
        config.store_dir.display(),
        config.concurrency
    );
    let ctx = ProvisionContext::with_fs_store(config, Arc::new(ManPageExtractor::new()));
    ProvisionOrchestrator::new(Arc::new(ctx))
}

/// Loads configuration from `path` (or the default location) plus environment.
pub fn load_config(
    path: Option<&std::path::Path>,
) -> manscope_core::Result<ProvisionConfig> {
    ProvisionConfig::load(path)
}

/// Initializes logging for a front-end component.
pub fn init_logging(component: &str, to_stderr: bool) -> Option<impl Drop> {
    Some(manscope_core::logging::init_logging(component, to_stderr))
}
