use crate::error::{EtlError, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the logging system with both console and file output.
///
/// The returned guard flushes the file writer when dropped, so callers keep it alive until exit.
pub fn init_logging(log_dir: &Path) -> Result<WorkerGuard> {
    let file_appender = file_appender(log_dir)?;
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Create a JSON layer for file logging
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    // Create a formatted layer for console logging
    let console_layer = fmt::layer().with_target(true).with_writer(std::io::stdout);

    // Respect RUST_LOG if set; otherwise info for our crate
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("orders_etl=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| EtlError::Logging(e.to_string()))?;

    Ok(guard)
}

/// Daily rolling `etl.log` appender inside `log_dir`, creating the directory if needed
fn file_appender(log_dir: &Path) -> Result<RollingFileAppender> {
    fs::create_dir_all(log_dir).map_err(|e| {
        EtlError::Logging(format!("cannot create log directory '{}': {}", log_dir.display(), e))
    })?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("etl.log")
        .build(log_dir)
        .map_err(|e| EtlError::Logging(format!("cannot open log file in '{}': {}", log_dir.display(), e)))
}
