//! Error types for archive-bundler
//!
//! This module provides the error handling surface of the library:
//! - The crate-wide [`Error`] type and [`Result`] alias
//! - [`ArchiveError`], one variant per way a bundle build can fail
//! - HTTP status / machine-readable code mapping via [`ToHttpStatus`]
//! - The structured [`ApiError`] payload handed to callers that report failures over HTTP

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for archive-bundler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for archive-bundler
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_fetches")
        key: Option<String>,
    },

    /// A bundle build failed
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// I/O error outside of a specific build step (e.g., creating the scratch space)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Failures of a single bundle build
///
/// Every variant maps to exactly one [`FailureKind`]; the kind is what callers
/// branch on, the fields are there for logs and error details.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A source location could not be retrieved (network, transport, or non-success status)
    #[error("failed to download {location}: {reason}")]
    RetrievalFailed {
        /// The location that could not be retrieved
        location: String,
        /// Transport-level reason
        reason: String,
    },

    /// A destination file inside the scratch space could not be created
    #[error("failed to create destination file {path}: {source}")]
    DestinationCreateFailed {
        /// The file that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Content could not be streamed into a created destination file
    #[error("failed to write data to {path}: {source}")]
    DestinationWriteFailed {
        /// The file being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Enumerating, encoding, or creating the container file failed
    #[error("failed to package {output}: {reason}")]
    PackagingFailed {
        /// The bundle name being packaged
        output: String,
        /// The reason packaging failed
        reason: String,
    },

    /// The finished container could not be read back into memory
    #[error("failed to read container {path}: {source}")]
    ReadBackFailed {
        /// The container file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A bundle, blob, or location-derived name cannot be used as a single file name
    #[error("invalid name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },
}

impl ArchiveError {
    /// The machine-readable kind of this failure
    pub fn kind(&self) -> FailureKind {
        match self {
            ArchiveError::RetrievalFailed { .. } => FailureKind::RetrievalFailed,
            ArchiveError::DestinationCreateFailed { .. } => FailureKind::DestinationCreateFailed,
            ArchiveError::DestinationWriteFailed { .. } => FailureKind::DestinationWriteFailed,
            ArchiveError::PackagingFailed { .. } => FailureKind::PackagingFailed,
            ArchiveError::ReadBackFailed { .. } => FailureKind::ReadBackFailed,
            ArchiveError::InvalidName { .. } => FailureKind::InvalidName,
        }
    }

    pub(crate) fn packaging(output: &str, reason: impl std::fmt::Display) -> Self {
        ArchiveError::PackagingFailed {
            output: output.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Machine-readable failure category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network/transport error fetching a location
    RetrievalFailed,
    /// Cannot create a file inside the scratch space
    DestinationCreateFailed,
    /// Cannot stream content into a created file
    DestinationWriteFailed,
    /// Enumeration, encode, or output-file error while building the container
    PackagingFailed,
    /// Cannot read the finished container back into memory
    ReadBackFailed,
    /// Name rejected before anything was written
    InvalidName,
    /// Invalid configuration
    Config,
    /// I/O outside of a build step
    Io,
    /// Anything else
    Internal,
}

impl Error {
    /// The machine-readable kind of this error
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Config { .. } => FailureKind::Config,
            Error::Archive(e) => e.kind(),
            Error::Io(_) => FailureKind::Io,
            Error::Other(_) => FailureKind::Internal,
        }
    }
}

/// API error response format
///
/// The structured form of a failed build: a machine-readable code, a transport-style
/// status, a human-readable message, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "ARCHIVER_DOWNLOAD_ERROR",
///     "status": 500,
///     "message": "failed to download file",
///     "details": {
///       "location": "http://bad-host/a.txt"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "ARCHIVER_ZIP_ERROR")
    pub code: String,

    /// HTTP status code suggested for this error
    pub status: u16,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error (location, path, bundle name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code, status and message
    pub fn new(code: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                status,
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        status: u16,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        let mut error = Self::new(code, status, message);
        error.error.details = Some(details);
        error
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - caller supplied something unusable
            Error::Config { .. } => 400,
            Error::Archive(ArchiveError::InvalidName { .. }) => 400,

            // 500 Internal Server Error - everything that fails while building
            Error::Archive(_) => 500,
            Error::Io(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "ARCHIVER_CONFIG_ERROR",
            Error::Archive(e) => match e {
                ArchiveError::RetrievalFailed { .. } => "ARCHIVER_DOWNLOAD_ERROR",
                ArchiveError::DestinationCreateFailed { .. } => "ARCHIVER_CREATE_FILE_ERROR",
                ArchiveError::DestinationWriteFailed { .. } => "ARCHIVER_WRITE_FILE_ERROR",
                ArchiveError::PackagingFailed { .. } => "ARCHIVER_ZIP_ERROR",
                ArchiveError::ReadBackFailed { .. } => "ARCHIVER_READ_FILE_ERROR",
                ArchiveError::InvalidName { .. } => "ARCHIVER_INVALID_NAME",
            },
            Error::Io(_) => "ARCHIVER_IO_ERROR",
            Error::Other(_) => "ARCHIVER_INTERNAL_ERROR",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let status = error.status_code();

        let message = match &error {
            Error::Archive(ArchiveError::RetrievalFailed { .. }) => {
                "failed to download file".to_string()
            }
            Error::Archive(ArchiveError::DestinationCreateFailed { .. }) => {
                "failed to create file".to_string()
            }
            Error::Archive(ArchiveError::DestinationWriteFailed { .. }) => {
                "failed to write downloaded data to file".to_string()
            }
            Error::Archive(ArchiveError::PackagingFailed { .. }) => "failed to zip file".to_string(),
            Error::Archive(ArchiveError::ReadBackFailed { .. }) => "failed to read file".to_string(),
            other => other.to_string(),
        };

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            Error::Archive(ArchiveError::RetrievalFailed { location, reason }) => {
                Some(serde_json::json!({
                    "location": location,
                    "reason": reason,
                }))
            }
            Error::Archive(ArchiveError::DestinationCreateFailed { path, source })
            | Error::Archive(ArchiveError::DestinationWriteFailed { path, source })
            | Error::Archive(ArchiveError::ReadBackFailed { path, source }) => {
                Some(serde_json::json!({
                    "path": path,
                    "reason": source.to_string(),
                }))
            }
            Error::Archive(ArchiveError::PackagingFailed { output, reason }) => {
                Some(serde_json::json!({
                    "output": output,
                    "reason": reason,
                }))
            }
            Error::Archive(ArchiveError::InvalidName { name, reason }) => {
                Some(serde_json::json!({
                    "name": name,
                    "reason": reason,
                }))
            }
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                status,
                message,
                details,
            },
        }
    }
}
