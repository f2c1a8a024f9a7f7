//! Error types for the converter.
//!
//! Provides the error taxonomy using `thiserror` for ergonomic error handling.
//! Every variant carries a rendered message so reports can be serialized
//! straight to a collaborator.

use std::io;
use thiserror::Error;
use serde::Serialize;

/// Main error type for the converter.
///
/// Per-file failures (`UnsupportedFormat`, `CorruptImage`, `DimensionsTooLarge`,
/// `Encode`) are local to one ingestion; `RecordNotFound` signals a stale id;
/// `Archive` aborts a whole export.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "camelCase")]
pub enum ConverterError {
    /// Source bytes are not in a recognized raster encoding
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Source was recognized but pixel extraction failed
    #[error("Corrupt image: {0}")]
    CorruptImage(String),

    /// Decoded image would exceed the configured memory budget
    #[error("Dimensions too large: {0}")]
    DimensionsTooLarge(String),

    /// Target encoder failed
    #[error("Encode error: {0}")]
    Encode(String),

    /// No record with this id in the session
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Export failed; no archive was produced
    #[error("Archive error: {0}")]
    Archive(String),

    /// Input or settings rejected before any work started
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration could not be loaded or parsed
    #[error("Config error: {0}")]
    Config(String),

    /// File IO error
    #[error("IO error: {0}")]
    IO(String),

    /// A decode/encode/archive job exceeded its time budget
    #[error("Timed out: {0}")]
    TimedOut(String),

    /// The owning session was torn down before the operation finished
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

/// Convenience result type for converter operations.
pub type ConverterResult<T> = Result<T, ConverterError>;

// Helper methods for error creation
impl ConverterError {
    pub fn unsupported<T: Into<String>>(msg: T) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    pub fn corrupt<T: Into<String>>(msg: T) -> Self {
        Self::CorruptImage(msg.into())
    }

    pub fn too_large<T: Into<String>>(msg: T) -> Self {
        Self::DimensionsTooLarge(msg.into())
    }

    pub fn encode<T: Into<String>>(msg: T) -> Self {
        Self::Encode(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        Self::RecordNotFound(msg.into())
    }

    pub fn archive<T: Into<String>>(msg: T) -> Self {
        Self::Archive(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    pub fn cancelled<T: Into<String>>(msg: T) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Whether this error only affects the file being ingested.
    ///
    /// Batch ingestion skips files failing with a local error and keeps going;
    /// any other error aborts the batch.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_)
                | Self::CorruptImage(_)
                | Self::DimensionsTooLarge(_)
                | Self::Encode(_)
                | Self::Validation(_)
                | Self::TimedOut(_)
        )
    }
}

// Convert std::io::Error to ConverterError
impl From<io::Error> for ConverterError {
    fn from(err: io::Error) -> Self {
        Self::IO(err.to_string())
    }
}

impl From<serde_json::Error> for ConverterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<zip::result::ZipError> for ConverterError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}
