//! Error types for feed-push
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Database, Feed)
//! - HTTP status code mapping for the trigger API
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for feed-push operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for feed-push
///
/// Only feed-stage failures abort a notification cycle. Per-recipient delivery
/// failures never surface here; they are classified and reported by the dispatcher.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "feed.url")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Feed could not be fetched, was empty, or could not be parsed
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// Push transport could not be set up (missing or unreadable VAPID key, client init)
    #[error("push transport error: {0}")]
    Push(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Shutdown in progress
    #[error("shutdown in progress")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Feed-stage errors. Any of these aborts the cycle before state is touched.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed transport failed or answered with a non-success status
    #[error("failed to fetch feed {url}: {message}")]
    Fetch {
        /// Feed URL that was requested
        url: String,
        /// HTTP status, when the server answered at all
        status: Option<u16>,
        /// Description of the failure
        message: String,
    },

    /// The feed parsed but contains zero entries
    #[error("feed {url} contains no entries")]
    Empty {
        /// Feed URL that was requested
        url: String,
    },

    /// The document is neither RSS nor Atom
    #[error("failed to parse feed: {0}")]
    Parse(String),
}

/// API error response format
///
/// ```json
/// {
///   "error": {
///     "code": "feed_fetch_failed",
///     "message": "feed error: failed to fetch feed https://example.com/feed: HTTP 503",
///     "details": { "status": 503 }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "feed_empty", "unauthorized")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
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

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
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
            Error::Config { .. } => 400,

            // 502 Bad Gateway - the upstream feed misbehaved
            Error::Feed(_) => 502,
            Error::Network(_) => 502,

            Error::ShuttingDown => 503,

            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Push(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Feed(e) => match e {
                FeedError::Fetch { .. } => "feed_fetch_failed",
                FeedError::Empty { .. } => "feed_empty",
                FeedError::Parse(_) => "feed_parse_failed",
            },
            Error::Push(_) => "push_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ShuttingDown => "shutting_down",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Feed(FeedError::Fetch {
                url,
                status: Some(status),
                ..
            }) => Some(serde_json::json!({
                "url": url,
                "status": status,
            })),
            Error::Feed(FeedError::Fetch { url, .. }) | Error::Feed(FeedError::Empty { url }) => {
                Some(serde_json::json!({ "url": url }))
            }
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
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
