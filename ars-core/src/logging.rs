//! Structured logging setup using the `tracing` ecosystem.
//!
//! The request engine only emits `tracing` events; embedding applications
//! decide where they go. These helpers cover the common cases: console only,
//! or console plus a daily-rotated file in text or JSON format.

use std::path::Path;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{ArsError, ArsResult};

/// Initialize the global tracing subscriber with the given settings.
///
/// Sets up:
/// - Console output (stderr)
/// - File output with daily rotation
/// - Configurable log level via the `level` parameter
///
/// Debug level is required to see the curl-style request dumps.
pub fn init_logging(level: &str, log_dir: &Path, json_output: bool) -> ArsResult<LogGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::daily(log_dir, "arsenal-client.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();

    let result = if json_output {
        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
    } else {
        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
    };
    result.map_err(|e| ArsError::Config(format!("logging already initialized: {e}")))?;

    tracing::info!("logging initialized at level={level}, dir={}", log_dir.display());

    Ok(LogGuard { _guard: Some(guard) })
}

/// Initialize logging from a [`LoggingConfig`].
///
/// An empty `directory` selects console-only output.
pub fn init_from_config(config: &LoggingConfig) -> ArsResult<LogGuard> {
    if config.directory.is_empty() {
        init_console_logging(&config.level);
        return Ok(LogGuard { _guard: None });
    }
    init_logging(&config.level, Path::new(&config.directory), config.json_output)
}

/// Guard that keeps the non-blocking log writer alive.
/// Drop this to flush and close the log file.
pub struct LogGuard {
    _guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initialize a minimal console-only logger for testing or simple embedding.
pub fn init_console_logging(level: &str) {
    let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true).compact())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_logging_does_not_panic() {
        // Subsequent calls are no-ops.
        init_console_logging("debug");
        init_console_logging("not a level");
    }

    #[test]
    fn test_init_from_config_without_directory() {
        let config = LoggingConfig::default();
        assert!(init_from_config(&config).is_ok());
    }
}
