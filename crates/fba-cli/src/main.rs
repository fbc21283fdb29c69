//! # fba CLI entry point
//!
//! Parses command-line arguments, installs logging, loads configuration from
//! the environment, and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fba_cli::inspect::{run_inspect, InspectArgs};
use fba_cli::verify::{run_verify, VerifyArgs};
use fba_context::ContextConfig;

/// Packaged app artifact tool.
///
/// Inspects and verifies `.fba` artifacts: ZIP containers holding a
/// manifest, per-device bundles, and an optional companion bundle.
#[derive(Parser, Debug)]
#[command(name = "fba", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load an artifact and print what it contains.
    Inspect(InspectArgs),

    /// Check artifacts and report every rejection with its offset.
    Verify(VerifyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match ContextConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(2);
        }
    };
    tracing::debug!(?config, "loaded configuration");

    let result = match cli.command {
        Commands::Inspect(args) => run_inspect(&args, &config),
        Commands::Verify(args) => run_verify(&args, &config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
