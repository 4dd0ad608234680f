//! gifsmith library
//!
//! Turns video clips into palette-optimized animated GIFs by driving an
//! external transcoding engine, with interactive trim and crop editors that
//! map pointer gestures over a preview onto source time and pixel coordinates.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod editor;
pub mod engine;
pub mod error;
pub mod ports;
pub mod probe;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::DomainError;
pub use domain::model::{EncodingSettings, JobSnapshot, JobStatus, MediaInfo};
pub use error::{GifError, GifResult};
