//! Configuration errors.
//!
//! HTTP errors live in [`crate::api::ApiError`] and scenario errors in
//! [`crate::harness::HarnessError`].

use std::path::PathBuf;

use thiserror::Error;

/// Why a configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// Configuration file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON.
    #[error("invalid configuration in {path}: {source}")]
    Parse {
        /// Configuration file path.
        path: PathBuf,
        /// The underlying JSON error, with line and column.
        #[source]
        source: serde_json::Error,
    },

    /// A file named on the command line does not exist.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// The path that was given.
        path: PathBuf,
    },

    /// A setting has an unusable value.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Dotted name of the setting, e.g. `api.timeout_secs`.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_path() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/etc/timing/config.json"),
        };
        assert_eq!(
            error.to_string(),
            "configuration file not found: /etc/timing/config.json"
        );
    }

    #[test]
    fn invalid_names_the_field() {
        let error = ConfigError::Invalid {
            field: "api.timeout_secs",
            reason: "must be positive".to_string(),
        };
        assert_eq!(error.to_string(), "invalid api.timeout_secs: must be positive");
    }

    #[test]
    fn parse_error_includes_position() {
        let source = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let error = ConfigError::Parse {
            path: PathBuf::from("config.json"),
            source,
        };
        assert!(error.to_string().contains("line 1"));
    }
}
