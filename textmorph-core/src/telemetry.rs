//! Tracing subscriber setup: human-readable stderr plus optional JSON file logs.

use crate::config::{LoggingConfig, default_log_dir};
use crate::error::ConfigError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// File name prefix of the daily-rolling JSON log.
pub const LOG_FILE_NAME: &str = "textmorph.log";

/// Parse a filter directive such as `info` or `textmorph_core=debug,warn`.
pub fn env_filter(level: &str) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_new(level).map_err(|e| ConfigError::Invalid {
        message: format!("invalid logging.level '{level}': {e}"),
    })
}

/// Install the global subscriber. `RUST_LOG` takes precedence over
/// `config.level` for stderr output.
///
/// Keep the returned guard alive for as long as file logs should be flushed.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>, ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => env_filter(&config.level)?,
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter);

    let (json_layer, guard) = if config.json_file {
        let log_dir = config.log_dir.clone().unwrap_or_else(default_log_dir);
        std::fs::create_dir_all(&log_dir).map_err(|e| ConfigError::Logging {
            message: format!("cannot create {}: {e}", log_dir.display()),
        })?;
        let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(EnvFilter::new("debug"));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .try_init()
        .map_err(|e| ConfigError::Logging { message: e.to_string() })?;
    Ok(guard)
}
