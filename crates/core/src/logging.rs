use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::manscope_home;

/// Installs the global subscriber for `component`.
///
/// Logs always go to a daily file under `~/.manscope/logs`, never to stdout.
pub fn init_logging(component: &str, to_stderr: bool) -> WorkerGuard {
    let log_dir = manscope_home().join("logs");
    let _ = std::fs::create_dir_all(&log_dir);

    // One file per component per day, e.g. ~/.manscope/logs/cli.<date>.
    let file_appender = tracing_appender::rolling::daily(&log_dir, component);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    if to_stderr {
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false);
        let _ = registry.with(stderr_layer).try_init();
    } else {
        let _ = registry.try_init();
    }

    guard
}
