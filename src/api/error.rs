//! Error types for diagram engine API calls.

use thiserror::Error;

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while talking to the diagram engine.
///
/// Every request-level variant names the HTTP method and path so that a
/// failed regression step points at the exact call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The engine answered with a non-2xx status.
    #[error("{method} {path} failed with status {status}: {body}")]
    Status {
        /// HTTP method of the request.
        method: String,
        /// Server-relative request path.
        path: String,
        /// Response status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("{method} {path} failed: {source}")]
    Transport {
        /// HTTP method of the request.
        method: String,
        /// Server-relative request path.
        path: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete within the configured timeout.
    #[error("{method} {path} timed out after {secs}s")]
    Timeout {
        /// HTTP method of the request.
        method: String,
        /// Server-relative request path.
        path: String,
        /// Configured timeout in seconds.
        secs: u64,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected {what} response: {source}")]
    Decode {
        /// What was being decoded (e.g. "lifeline").
        what: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl ApiError {
    /// Returns the HTTP status for [`ApiError::Status`] errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
