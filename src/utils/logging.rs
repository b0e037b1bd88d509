//! Structured logging configuration.
//!
//! Initializes the global `tracing` subscriber from a [`LoggingConfig`].
//! Output goes to the console by default, or to a file when configured;
//! JSON formatting is available for log aggregation pipelines.

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber described by `config`.
///
/// The `RUST_LOG` environment variable, when set, overrides the configured
/// level. Fails if a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if config.log_to_file {
        let path = config.log_file_path.as_ref().ok_or_else(|| {
            ProtocolError::ConfigError("log_to_file is set without log_file_path".to_string())
        })?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open log file: {e}")))?;

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file));

        let result = if config.json_format {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        return result
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to init logging: {e}")));
    }

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| ProtocolError::ConfigError(format!("Failed to init logging: {e}")))
}

/// Install a plain subscriber at the default level, ignoring failure.
/// Convenience for examples and tests.
pub fn init_default() {
    let _ = init(&LoggingConfig::default());
}
