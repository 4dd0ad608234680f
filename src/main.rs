//! gifsmith CLI
//!
//! Turn video clips into palette-optimized animated GIFs.
//!
//! # Usage
//!
//! ```bash
//! gifsmith encode clip.mp4 --start 00:00:02 --end 00:00:05 --height 320
//! gifsmith encode clip.mov --gestures edit.json --out-dir gifs/
//! gifsmith probe clip.mov --json
//! gifsmith settings set --fps 24 --mpdecimate ""
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use gifsmith::adapters::AppConfig;
use gifsmith::app::DefaultAppContainer;
use gifsmith::cli::{commands, Cli};
use gifsmith::utils::logging::init_logging;

/// Main entry point for the gifsmith CLI application
fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = AppConfig::resolve_path(cli.config.as_deref())?;
    let mut config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let format = cli.log_format.unwrap_or(config.logging.format);
    init_logging(&level, format)?;

    if let Some(binary) = cli.ffmpeg.clone() {
        config.engine.binary = binary;
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        let container = DefaultAppContainer::new(config, config_path)?;
        let result = commands::run(cli, &container).await;
        if let Err(e) = &result {
            error!("Command failed: {:#}", e);
        }
        result
    })
}
