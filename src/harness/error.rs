//! Error types for the regression harness.

use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that end a scenario.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// An API call failed (non-2xx, transport, timeout or bad shape).
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A response did not satisfy an expected invariant.
    #[error("{0}")]
    Assertion(String),

    /// The exported image was unusable.
    #[error("export failed: {reason}")]
    Export {
        /// What was wrong with the payload.
        reason: String,
    },

    /// A harness artifact could not be written.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Path that was being written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl HarnessError {
    /// Creates an assertion error.
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }
}

/// Fails with an assertion error built by `message` unless `condition` holds.
///
/// # Errors
///
/// Returns [`HarnessError::Assertion`] when `condition` is false.
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> HarnessResult<()> {
    if condition {
        Ok(())
    } else {
        Err(HarnessError::Assertion(message()))
    }
}
