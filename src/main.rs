//! timing-diagram-mcp: MCP server for AI-assisted timing diagram editing
//!
//! Forwards MCP tool calls to a running diagram engine over HTTP.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use timing_diagram_mcp::api::{ApiClient, TimingApi};
use timing_diagram_mcp::config;
use timing_diagram_mcp::logging;
use timing_diagram_mcp::mcp::McpServer;

/// MCP server for AI-assisted timing diagram editing.
///
/// Exposes timing diagrams, lifelines, timing states and time segments of a
/// running diagram engine as MCP tools over stdio.
#[derive(Parser, Debug)]
#[command(name = "timing-diagram-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Diagram engine base URL (overrides api.base_url)
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let mut cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(url) = args.api_url {
        cfg.api.base_url = url;
        if let Err(e) = cfg.validate() {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    }

    logging::init(logging::level_for(args.verbose, args.quiet, &cfg.logging.level));

    eprintln!(
        "timing-diagram-mcp {}  This program comes with ABSOLUTELY NO WARRANTY.",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");

    info!(
        version = env!("CARGO_PKG_VERSION"),
        engine = %cfg.api.base_url,
        timeout_secs = cfg.api.timeout_secs,
        "Starting timing-diagram-mcp server"
    );

    let client = match ApiClient::from_config(&cfg.api) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to create HTTP client");
            return ExitCode::FAILURE;
        }
    };
    let mut server = McpServer::new(TimingApi::new(client));

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server.run()) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn api_url_flag() {
        let args = Args::parse_from(["timing-diagram-mcp", "--api-url", "http://engine:9000", "-vv"]);
        assert_eq!(args.api_url.as_deref(), Some("http://engine:9000"));
        assert_eq!(args.verbose, 2);
        assert!(args.config.is_none());
    }
}
