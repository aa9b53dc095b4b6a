//! Error types for the image converter.
//!
//! Provides a hierarchy of error types using `thiserror` for ergonomic error handling.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Validation errors for batch inputs and settings.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Path-related validation error
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    /// Invalid settings error
    #[error("Settings error: {0}")]
    Settings(String),
}

/// File path errors.
#[derive(Error, Debug)]
pub enum PathError {
    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotDirectory(PathBuf),
    /// IO error accessing the path
    #[error("IO error: {0}")]
    IO(String),
}

/// Main error type for the converter.
///
/// The first three variants mirror the per-item failure taxonomy: decode,
/// transform, and encode/write errors are each contained inside the failed
/// item's [`ConversionOutcome`](crate::core::ConversionOutcome).
/// [`ConverterError::Cancelled`] is internal control flow for the cooperative
/// cancellation checkpoints and is never recorded as an item failure.
#[derive(Error, Debug)]
pub enum ConverterError {
    /// Source file missing, unreadable, or not a valid image
    #[error("Decode error: {0}")]
    Decode(String),

    /// Crop rectangle outside image bounds or otherwise invalid transform parameters
    #[error("Transform error: {0}")]
    Transform(String),

    /// Encoding failed or the encoded file could not be written
    #[error("Encode error: {0}")]
    Encode(String),

    /// Batch-level input validation failed
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// File IO error
    #[error("IO error: {0}")]
    IO(String),

    /// Cancellation observed at a checkpoint
    #[error("Conversion cancelled")]
    Cancelled,
}

/// Convenience result type for converter operations.
pub type ConverterResult<T> = Result<T, ConverterError>;

// Helper methods for error creation
impl ConverterError {
    pub fn decode<T: Into<String>>(msg: T) -> Self {
        Self::Decode(msg.into())
    }

    pub fn transform<T: Into<String>>(msg: T) -> Self {
        Self::Transform(msg.into())
    }

    pub fn encode<T: Into<String>>(msg: T) -> Self {
        Self::Encode(msg.into())
    }
}

// Helper methods for validation error creation
impl ValidationError {
    pub fn not_a_directory(path: impl Into<PathBuf>) -> Self {
        Self::Path(PathError::NotDirectory(path.into()))
    }

    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }
}

// Convert std::io::Error to ConverterError
impl From<io::Error> for ConverterError {
    fn from(err: io::Error) -> Self {
        Self::IO(err.to_string())
    }
}

// Convert io::Error to PathError
impl From<io::Error> for PathError {
    fn from(err: io::Error) -> Self {
        Self::IO(err.to_string())
    }
}

// Convert PathError to ConverterError
impl From<PathError> for ConverterError {
    fn from(err: PathError) -> Self {
        Self::Validation(ValidationError::Path(err))
    }
}
