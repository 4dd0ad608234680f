// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::model::*;
use crate::engine::events::EventHub;
use crate::error::GifResult;

/// A loaded transcoding engine with a private, name-keyed filesystem
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Store bytes under `name` in the engine's virtual filesystem
    async fn write_file(&self, name: &str, data: &[u8]) -> GifResult<()>;

    /// Read the bytes stored under `name`
    async fn read_file(&self, name: &str) -> GifResult<Vec<u8>>;

    /// Remove `name`; removing a missing entry is not an error
    async fn delete_file(&self, name: &str) -> GifResult<()>;

    /// Run one invocation to completion and return its exit code.
    ///
    /// Progress and log events are delivered through `events` while running.
    /// Errors are reserved for failures of the engine itself.
    async fn execute(&self, args: &[String], events: &EventHub) -> GifResult<i32>;

    /// Tear down the engine and release its filesystem
    async fn terminate(&self);
}

/// Produces ready engines
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(&self) -> GifResult<Arc<dyn TranscodeEngine>>;
}

/// Publishes encoded outputs at a retrievable location
#[async_trait]
pub trait OutputStore: Send + Sync {
    /// Make `output` retrievable and return where it lives
    async fn publish(&self, output: &OutputFile) -> GifResult<PathBuf>;

    /// Invalidate a location handed out by `publish`
    async fn revoke(&self, location: &Path) -> GifResult<()>;
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message meant for the person driving the encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Port for user-facing notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Port for persisted encoding settings
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load stored settings, or factory defaults when nothing is stored
    async fn load_settings(&self) -> GifResult<EncodingSettings>;

    /// Persist settings
    async fn save_settings(&self, settings: &EncodingSettings) -> GifResult<()>;

    /// Restore and persist factory defaults
    async fn reset_settings(&self) -> GifResult<EncodingSettings> {
        let settings = EncodingSettings::factory();
        self.save_settings(&settings).await?;
        Ok(settings)
    }
}
