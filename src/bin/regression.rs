//! timing-regression: end-to-end regression run of the timing diagram API
//!
//! Builds a two-lifeline timing diagram on a running engine, checks every
//! read and update path, exports it and deletes it. Exits 0 only if every
//! step passed.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use timing_diagram_mcp::api::ApiClient;
use timing_diagram_mcp::config;
use timing_diagram_mcp::harness::scenarios::timing;
use timing_diagram_mcp::harness::{run_test, RunOptions};
use timing_diagram_mcp::logging;

/// Regression harness for the diagram engine's timing diagram API.
#[derive(Parser, Debug)]
#[command(name = "timing-regression")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Diagram engine base URL (overrides api.base_url)
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Directory for exported images (overrides harness.work_dir)
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Fail the run if any step is left unresolved
    #[arg(long)]
    strict: bool,

    /// Print the scenario's step names and exit
    #[arg(long)]
    list_steps: bool,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.list_steps {
        for (i, step) in timing::STEPS.iter().enumerate() {
            println!("{:>2}. {step}", i + 1);
        }
        return ExitCode::SUCCESS;
    }

    let mut cfg = match config::load_config(args.config.as_deref()) {
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
    if let Some(dir) = args.work_dir {
        cfg.harness.work_dir = Some(dir);
    }

    logging::init(logging::level_for(args.verbose, args.quiet, &cfg.logging.level));

    let client = match ApiClient::from_config(&cfg.api) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to create HTTP client");
            return ExitCode::FAILURE;
        }
    };

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

    let options = RunOptions {
        strict_steps: args.strict || cfg.harness.strict_steps,
    };
    let report = runtime.block_on(run_test(
        timing::NAME,
        cfg.harness.work_dir(),
        client,
        options,
        timing::run,
    ));

    report.exit_code()
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
    fn overrides_parse() {
        let args = Args::parse_from([
            "timing-regression",
            "cfg.json",
            "--api-url",
            "http://127.0.0.1:58321",
            "--work-dir",
            "out",
            "--strict",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("cfg.json")));
        assert_eq!(args.work_dir, Some(PathBuf::from("out")));
        assert!(args.strict);
        assert!(!args.list_steps);
    }
}
