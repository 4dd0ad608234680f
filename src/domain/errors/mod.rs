// Domain errors - Error types for the domain layer

use thiserror::Error;

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// Invalid arguments provided
    #[error("Bad arguments: {0}")]
    BadArgs(String),
    /// A value fell outside its permitted range
    #[error("Out of range: {0}")]
    OutOfRange(String),
    /// Crop geometry cannot be satisfied
    #[error("Invalid crop geometry: {0}")]
    InvalidCrop(String),
    /// Preview and source aspect ratios disagree
    #[error("Aspect ratio mismatch: preview {preview:.4} vs source {source_aspect:.4}")]
    AspectMismatch { preview: f64, source_aspect: f64 },
    /// Media facts could not be derived
    #[error("Probe failed: {0}")]
    ProbeFailed(String),
}
