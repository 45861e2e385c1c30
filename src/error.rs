//! Error types surfaced by the pipeline.
//!
//! Every operation on [`ImageHandler`](crate::handler::ImageHandler) returns
//! [`ImageError`]. The first four variants are the failure kinds callers are
//! expected to branch on; they are propagated unchanged from the stage that
//! produced them (no wrapping between `open`, the filter chain and `save`).
//!
//! | Variant | Raised by |
//! |---|---|
//! | [`DriverMissing`](ImageError::DriverMissing) | [`SourceRegistry::resolve`](crate::source::SourceRegistry::resolve), handler without a bound source |
//! | [`FileMissing`](ImageError::FileMissing) | [`Source::read`](crate::source::Source::read) |
//! | [`Format`](ImageError::Format) | format detection, content sniffing, decode, encode |
//! | [`FilterMissing`](ImageError::FilterMissing) | registry lookups and chain normalization |

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Source driver not found: {0}")]
    DriverMissing(String),

    #[error("File not found: {}", .0.display())]
    FileMissing(PathBuf),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Filter not found: {0}")]
    FilterMissing(String),

    #[error("Invalid parameters for filter '{filter}': {message}")]
    InvalidParams { filter: String, message: String },

    #[error("Invalid filter configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discriminant of an [`ImageError`], for callers that only need to branch
/// on the failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DriverMissing,
    FileMissing,
    Format,
    FilterMissing,
    InvalidParams,
    InvalidConfig,
    InvalidPath,
    Io,
}

impl ImageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImageError::DriverMissing(_) => ErrorKind::DriverMissing,
            ImageError::FileMissing(_) => ErrorKind::FileMissing,
            ImageError::Format(_) => ErrorKind::Format,
            ImageError::FilterMissing(_) => ErrorKind::FilterMissing,
            ImageError::InvalidParams { .. } => ErrorKind::InvalidParams,
            ImageError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            ImageError::InvalidPath(_) => ErrorKind::InvalidPath,
            ImageError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn invalid_params(filter: &str, message: impl Into<String>) -> Self {
        ImageError::InvalidParams {
            filter: filter.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, ImageError>;
