// TOML config adapter - Configuration and persisted settings in a TOML file

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::model::EncodingSettings;
use crate::error::{GifError, GifResult};
use crate::ports::SettingsStore;
use crate::utils::logging::LogFormat;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "GIFSMITH_CONFIG";

/// Text whose appearance in an engine log line aborts the job
pub const DEFAULT_ERROR_MARKER: &str = "Aborted()";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path or name of the ffmpeg binary
    pub binary: PathBuf,
    pub error_marker: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            error_marker: DEFAULT_ERROR_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Route first submits through the editor
    pub enabled: bool,
    /// Accepted relative difference between preview and source aspect ratios
    pub aspect_tolerance: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            aspect_tolerance: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Whole configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub encoding: EncodingSettings,
    pub engine: EngineConfig,
    pub editor: EditorConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            encoding: EncodingSettings::factory(),
            engine: EngineConfig::default(),
            editor: EditorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Config file location: explicit path, else the platform config directory
    pub fn resolve_path(explicit: Option<&Path>) -> GifResult<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        dirs::config_dir()
            .map(|dir| dir.join("gifsmith").join("config.toml"))
            .ok_or_else(|| GifError::Config {
                message: format!("no config directory available; set {}", CONFIG_ENV),
            })
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load(path: &Path) -> GifResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| GifError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    pub fn parse(content: &str) -> GifResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| GifError::Config {
            message: format!("failed to parse TOML config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GifResult<()> {
        self.encoding.validate()?;
        if !self.editor.aspect_tolerance.is_finite() || self.editor.aspect_tolerance < 0.0 {
            return Err(GifError::Config {
                message: format!(
                    "editor.aspect_tolerance must be a non-negative number, got {}",
                    self.editor.aspect_tolerance
                ),
            });
        }
        if self.engine.error_marker.is_empty() {
            return Err(GifError::Config {
                message: "engine.error_marker cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn to_toml(&self) -> GifResult<String> {
        toml::to_string_pretty(self).map_err(|e| GifError::Config {
            message: format!("failed to serialize config: {}", e),
        })
    }

    pub fn save(&self, path: &Path) -> GifResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| GifError::Config {
                message: format!("failed to create {}: {}", parent.display(), e),
            })?;
        }
        std::fs::write(path, self.to_toml()?).map_err(|e| GifError::Config {
            message: format!("failed to write {}: {}", path.display(), e),
        })?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }
}

/// Settings persisted in the `[encoding]` section of the config file
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for TomlSettingsStore {
    async fn load_settings(&self) -> GifResult<EncodingSettings> {
        Ok(AppConfig::load(&self.path)?.encoding)
    }

    async fn save_settings(&self, settings: &EncodingSettings) -> GifResult<()> {
        settings.validate()?;
        // other sections are preserved
        let mut config = AppConfig::load(&self.path)?;
        config.encoding = settings.clone();
        config.save(&self.path)
    }
}
