//! Logging initialization.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::LogLevel;

/// Install the process-wide subscriber.
///
/// Logs go to stderr; stdout carries listings and failed items. `RUST_LOG`
/// takes precedence over `level` when set. The engine's worker threads
/// pick up whatever subscriber is current when the engine is built.
pub fn init_logging(level: LogLevel) -> Result<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.is_empty() => EnvFilter::try_new(directives)?,
        _ => EnvFilter::new(level.as_str()),
    };

    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .try_init()
        .map_err(|e| anyhow!("failed to install logger: {e}"))
}
