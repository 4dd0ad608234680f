//! Error handling module for gifsmith

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for engine and orchestration operations
#[derive(Error, Debug)]
pub enum GifError {
    /// The engine or its assets failed to initialize
    #[error("Failed to load transcoding engine: {message}")]
    EngineLoad { message: String },

    /// A job already holds the engine
    #[error("Another job is using the transcoding engine")]
    Busy,

    /// The engine was used before being loaded or after termination
    #[error("Transcoding engine is not loaded")]
    EngineNotLoaded,

    /// The input could not be fetched or written into the engine
    #[error("Failed to load input '{name}': {message}")]
    Input { name: String, message: String },

    /// A virtual filesystem operation failed
    #[error("Engine filesystem error on '{name}': {message}")]
    Filesystem { name: String, message: String },

    /// The engine invocation itself failed
    #[error("Engine execution failed: {message}")]
    Execute { message: String },

    /// The engine ran to completion but reported failure
    #[error("Engine exited with status {code}")]
    EngineExit { code: i32 },

    /// The encoded output could not be published
    #[error("Failed to publish output: {message}")]
    OutputPublish { message: String },

    /// Configuration could not be read or written
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation failure from the domain layer
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GifError {
    pub fn filesystem(name: &str, err: impl std::fmt::Display) -> Self {
        GifError::Filesystem {
            name: name.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for gifsmith operations
pub type GifResult<T> = std::result::Result<T, GifError>;
