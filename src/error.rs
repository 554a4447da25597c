//! Error types for tube-dl
//!
//! This module provides comprehensive error handling for the library, including:
//! - Domain-specific error types (Validation, Download, Config, etc.)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes
//! - Context information (offending fields, file path, task id, etc.)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for tube-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tube-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "workers")
        key: Option<String>,
    },

    /// Submission rejected during synchronous validation
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    /// Missing API key on a protected endpoint
    #[error("authentication required: provide api_key in the X-Api-Key header or query string")]
    AuthRequired,

    /// Rejected API key on a protected endpoint
    #[error("invalid API key")]
    AuthRejected,

    /// Task not found (unknown id, or already evicted by the cleanup sweep)
    #[error("task not found: {0}")]
    NotFound(String),

    /// Download-related error (produced inside the item executor)
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Attempted backward or skipping status transition (programming invariant)
    #[error("invalid status transition for task {id}: {from} -> {to}")]
    InvalidTransition {
        /// The task whose status was mutated
        id: String,
        /// Status before the attempted transition
        from: String,
        /// Status the caller tried to move to
        to: String,
    },

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Download-related errors
///
/// Produced only inside the item executor and always terminal-but-isolated:
/// they are caught at the dispatcher boundary, converted to a message, and
/// stored on the failing task or item. They never cross the HTTP boundary
/// directly and never terminate the worker pool.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// URL failed to parse or is not a YouTube video URL
    #[error("invalid video URL: {url}")]
    InvalidUrl {
        /// The offending URL
        url: String,
    },

    /// Playlist URL reached the executor (defensive second check)
    #[error("playlist download is not supported: {url}")]
    PlaylistRejected {
        /// The offending URL
        url: String,
    },

    /// The source offers no renditions matching the requested format
    #[error("no {format} streams are available for this video")]
    NoStreamsAvailable {
        /// The requested output format ("mp4" or "mp3")
        format: String,
    },

    /// Upstream request failed (extraction metadata or stream bytes)
    #[error("network failure while {operation}: {reason}")]
    NetworkFailure {
        /// What was being attempted ("probing video", "fetching stream")
        operation: String,
        /// Upstream error detail
        reason: String,
    },

    /// Target folder or file is not writable
    #[error("permission denied writing to {path}")]
    PermissionDenied {
        /// The path that could not be written
        path: PathBuf,
    },

    /// Filesystem reported no space left while writing
    #[error("disk full while writing to {path}")]
    DiskFull {
        /// The path being written when space ran out
        path: PathBuf,
    },

    /// The multiplexer failed to combine audio and video
    #[error("merge failed: {reason}")]
    MergeFailure {
        /// ffmpeg (or equivalent) error detail
        reason: String,
    },

    /// The extraction backend failed in a way not covered above
    #[error("extractor error: {0}")]
    ExtractorFailure(String),
}

/// Structured validation failure naming every offending or missing field
///
/// Returned synchronously by the submission gateway; no task is ever
/// created for a payload that produces one of these. For batch payloads,
/// `video_errors` carries one entry per invalid item with its index.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Error)]
#[error("{message}")]
pub struct ValidationFailure {
    /// Human-readable summary of what is wrong
    pub message: String,

    /// Names of required fields that are missing or empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,

    /// Per-item errors for batch submissions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub video_errors: Vec<VideoError>,
}

impl ValidationFailure {
    /// A failure with just a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            missing_fields: Vec::new(),
            video_errors: Vec::new(),
        }
    }

    /// A failure for missing required fields
    pub fn missing(fields: Vec<String>) -> Self {
        Self {
            message: "Missing required fields.".to_string(),
            missing_fields: fields,
            video_errors: Vec::new(),
        }
    }

    /// A failure aggregating per-item batch errors
    pub fn batch(video_errors: Vec<VideoError>) -> Self {
        Self {
            message: "Invalid videos payload.".to_string(),
            missing_fields: Vec::new(),
            video_errors,
        }
    }
}

/// One invalid item within a batch submission
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VideoError {
    /// Position of the item in the submitted `videos` array
    pub index: usize,
    /// What is wrong with this item
    pub error: String,
    /// Required fields missing from this item, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
/// It follows a standard format with machine-readable error codes,
/// human-readable messages, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "validation_error",
///     "message": "Missing required fields.",
///     "details": {
///       "missing_fields": ["folder", "quality"]
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
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    ///
    /// Clients can use this for programmatic error handling.
    pub code: String,

    /// Human-readable error message
    ///
    /// This is suitable for displaying to end users.
    pub message: String,

    /// Optional additional context about the error
    ///
    /// This can include fields like missing_fields, video_errors, task_id, etc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }

    /// Create a "service unavailable" error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new("service_unavailable", message)
    }
}

/// Convert errors to HTTP status codes for API responses
///
/// This trait maps domain errors to appropriate HTTP status codes.
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,

            // 401/403 - Authentication
            Error::AuthRequired => 401,
            Error::AuthRejected => 403,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 422 Unprocessable Entity - Semantic errors surfaced synchronously
            Error::Download(DownloadError::InvalidUrl { .. }) => 422,
            Error::Download(DownloadError::PlaylistRejected { .. }) => 422,

            // 500 Internal Server Error - Server-side issues
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::InvalidTransition { .. } => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - Upstream/collaborator failures
            Error::Download(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::AuthRequired => "auth_required",
            Error::AuthRejected => "invalid_api_key",
            Error::NotFound(_) => "not_found",
            Error::Download(e) => match e {
                DownloadError::InvalidUrl { .. } => "invalid_url",
                DownloadError::PlaylistRejected { .. } => "playlist_not_supported",
                DownloadError::NoStreamsAvailable { .. } => "no_streams_available",
                DownloadError::NetworkFailure { .. } => "network_failure",
                DownloadError::PermissionDenied { .. } => "permission_denied",
                DownloadError::DiskFull { .. } => "disk_full",
                DownloadError::MergeFailure { .. } => "merge_failure",
                DownloadError::ExtractorFailure(_) => "extractor_failure",
            },
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::ShuttingDown => "shutting_down",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Add contextual details for specific error types
        let details = match &error {
            Error::Validation(failure) => {
                let mut map = serde_json::Map::new();
                if !failure.missing_fields.is_empty() {
                    map.insert(
                        "missing_fields".to_string(),
                        serde_json::json!(failure.missing_fields),
                    );
                }
                if !failure.video_errors.is_empty() {
                    map.insert(
                        "video_errors".to_string(),
                        serde_json::json!(failure.video_errors),
                    );
                }
                if map.is_empty() {
                    None
                } else {
                    Some(serde_json::Value::Object(map))
                }
            }
            Error::Download(DownloadError::PermissionDenied { path }) => {
                Some(serde_json::json!({ "path": path }))
            }
            Error::Download(DownloadError::DiskFull { path }) => {
                Some(serde_json::json!({ "path": path }))
            }
            Error::InvalidTransition { id, from, to } => Some(serde_json::json!({
                "task_id": id,
                "from": from,
                "to": to,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
