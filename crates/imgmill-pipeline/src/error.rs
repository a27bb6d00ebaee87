//! # Design
//!
//! - Provide structured, constant-message errors for the variant pipeline.
//! - Capture operation context (paths, fields, inputs) to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors produced by the variant pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request used an HTTP method other than POST.
    #[error("method not allowed")]
    MethodNotAllowed {
        /// Method carried by the request.
        method: String,
    },
    /// The request content type is not multipart form data.
    #[error("unsupported content type")]
    BadContentType {
        /// Content type carried by the request, when present.
        value: Option<String>,
    },
    /// The multipart boundary parameter is absent or empty.
    #[error("missing multipart boundary")]
    MissingBoundary,
    /// The multipart body carried no file parts.
    #[error("no files uploaded")]
    NoFilesUploaded,
    /// The materialized input area holds no recognized images.
    #[error("no images found in upload")]
    NoImagesFound,
    /// Input validation failures.
    #[error("invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// Image decode or encode failures.
    #[error("image processing failure")]
    Image {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Source file involved in the failure.
        path: PathBuf,
        /// Codec-reported detail.
        message: String,
    },
    /// Zip archive failures.
    #[error("archive failure")]
    Zip {
        /// Operation that triggered the archive failure.
        operation: &'static str,
        /// Path involved in the archive failure.
        path: PathBuf,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },
    /// Walkdir traversal failures.
    #[error("directory traversal failure")]
    Walkdir {
        /// Operation that triggered the walkdir failure.
        operation: &'static str,
        /// Path involved in the walkdir failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// IO failures while interacting with the filesystem.
    #[error("io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl PipelineError {
    /// HTTP status code conveyed by this error at the boundary.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MethodNotAllowed { .. } => 405,
            _ => 500,
        }
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn zip(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: zip::result::ZipError,
    ) -> Self {
        Self::Zip {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn image(
        operation: &'static str,
        path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self::Image {
            operation,
            path: path.into(),
            message: message.into(),
        }
    }
}
