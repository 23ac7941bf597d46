//! Logging setup shared by both binaries.
//!
//! Logs always go to stderr: stdout carries the MCP stream for the server
//! and the step report for the regression harness.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Resolves the log level from `-v`/`-q` flags and the configured level.
///
/// `-q` wins over everything. Each `-v` raises the level from info up to
/// trace; without `-v` the configured level applies, falling back to warn.
#[must_use]
pub fn level_for(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => config_level.parse().unwrap_or(Level::WARN),
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs the global subscriber. `RUST_LOG` directives are honoured on
/// top of `level`.
pub fn init(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
