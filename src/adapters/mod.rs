// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod fs_output;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use exec_ffmpeg::{FfmpegEngine, FfmpegLoader};
pub use fs_output::TempOutputStore;
pub use toml_config::{AppConfig, TomlSettingsStore};
pub use tracing_log::TracingNotifier;
