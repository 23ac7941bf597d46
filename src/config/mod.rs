//! Configuration file loading and parsing.
//!
//! Both binaries share one JSON configuration file. It is searched in the
//! following order:
//!
//! 1. Path given as the first positional CLI argument
//! 2. Default location:
//!    - **Linux/macOS:** `~/.timing-diagram-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.timing-diagram-mcp\config.json`
//!
//! An explicit path must exist. When the default file is absent the built-in
//! defaults are used, so a stock diagram engine on localhost works with no
//! configuration at all.

mod settings;

pub use settings::{ApiConfig, Config, HarnessConfig, LoggingConfig, DEFAULT_API_URL};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".timing-diagram-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads, parses and validates the configuration file.
///
/// If `path` is `None`, uses the platform-specific default location and
/// falls back to [`Config::default`] when no file exists there.
///
/// # Errors
///
/// Returns an error if:
/// - An explicit `path` does not exist
/// - The file cannot be read
/// - The JSON is malformed or has unknown fields
/// - Validation fails
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => {
                tracing::debug!("No configuration file found, using defaults");
                return Ok(Config::default());
            }
        },
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Read {
        path: config_path.clone(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: config_path.clone(),
        source: e,
    })?;

    config.validate()?;

    Ok(config)
}
