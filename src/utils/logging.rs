//! Logging setup

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{GifError, GifResult};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// Single-line text format
    #[default]
    Compact,
    /// JSON format for structured logging
    Json,
}

/// Build the filter: `RUST_LOG` wins, otherwise `level`
pub fn env_filter(level: &str) -> GifResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| GifError::Config {
            message: format!("invalid log level '{}': {}", level, e),
        })
}

/// Install the global subscriber, writing to stderr
pub fn init_logging(level: &str, format: LogFormat) -> GifResult<()> {
    let filter = env_filter(level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().with_target(false).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| GifError::Config {
        message: format!("failed to initialize logging: {}", e),
    })?;

    tracing::debug!(level, format = ?format, "Logging initialized");
    Ok(())
}
