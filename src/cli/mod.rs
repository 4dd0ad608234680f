//! CLI module for gifsmith
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::utils::logging::LogFormat;

pub mod args;
pub mod commands;

/// gifsmith - turn video clips into palette-optimized GIFs
#[derive(Parser, Debug)]
#[command(name = "gifsmith")]
#[command(about = "Turn video clips into palette-optimized animated GIFs")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, env = "GIFSMITH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level or filter (overrides config)
    #[arg(long, global = true, env = "GIFSMITH_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Logging format (overrides config)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// ffmpeg binary (overrides config)
    #[arg(long, global = true, env = "GIFSMITH_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encode one or more videos into GIFs
    Encode(args::EncodeArgs),
    /// Transcode a video into a small browser-playable preview
    Preview(args::PreviewArgs),
    /// Print duration and frame size of a video
    Probe(args::ProbeArgs),
    /// Show or change persisted encoding settings
    #[command(subcommand)]
    Settings(args::SettingsCommand),
}
