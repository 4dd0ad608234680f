//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

fn parse_fps(s: &str) -> Result<u32, String> {
    clap_num::number_range(s, 1, 240)
}

fn parse_height(s: &str) -> Result<u32, String> {
    clap_num::number_range(s, 1, 8192)
}

fn parse_mpdecimate(s: &str) -> Result<u32, String> {
    clap_num::number_range(s, 1, 64)
}

/// How job progress is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProgressMode {
    /// Progress bar on stderr
    Pretty,
    /// Newline-delimited JSON events on stdout
    Json,
    /// No progress output
    None,
}

/// Arguments for the encode command
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Input video files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory receiving the encoded GIFs
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Output frame rate (overrides settings)
    #[arg(long, value_parser = parse_fps)]
    pub fps: Option<u32>,

    /// Output height in pixels (overrides settings)
    #[arg(long, value_parser = parse_height, conflicts_with = "original_height")]
    pub height: Option<u32>,

    /// Keep the source height even if settings name one
    #[arg(long)]
    pub original_height: bool,

    /// Frame deduplication threshold (overrides settings)
    #[arg(long, value_parser = parse_mpdecimate)]
    pub mpdecimate: Option<u32>,

    /// Trim start (HH:MM:SS.mmm, MM:SS, or seconds)
    #[arg(long)]
    pub start: Option<String>,

    /// Trim end (HH:MM:SS.mmm, MM:SS, or seconds)
    #[arg(long)]
    pub end: Option<String>,

    /// Crop in source pixels as W:H:X:Y
    #[arg(long)]
    pub crop: Option<String>,

    /// JSON gesture script replayed through the trim and crop editors
    #[arg(long, conflicts_with_all = ["start", "end", "crop"])]
    pub gestures: Option<PathBuf>,

    /// Progress reporting
    #[arg(long, value_enum, default_value = "pretty")]
    pub progress: ProgressMode,
}

/// Arguments for the preview command
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Input video file
    pub input: PathBuf,

    /// Preview file path (default: next to the input, with an .mp4 extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Transcode even when the input already plays natively
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Input video file
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Persisted encoding settings
#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the stored settings
    Show {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Change stored settings; an empty value clears the field
    Set {
        #[arg(long)]
        fps: Option<String>,
        #[arg(long)]
        height: Option<String>,
        #[arg(long)]
        mpdecimate: Option<String>,
    },
    /// Restore factory settings
    Reset,
}
