//! # surety CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use surety_cli::audit::{run_audit, AuditArgs};
use surety_cli::inspect::{run_inspect, InspectArgs};
use surety_cli::params::{run_params, ParamsArgs};
use surety_cli::simulate::{run_simulate, SimulateArgs};

/// Flight surety protocol toolchain.
///
/// Runs in-process protocol scenarios, prints effective parameters, audits
/// oracle index assignments, and summarises ledger snapshots.
#[derive(Parser, Debug)]
#[command(name = "surety", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deploy in-process, resolve the demo flights, and withdraw payouts.
    Simulate(SimulateArgs),

    /// Print the effective protocol parameters.
    Params(ParamsArgs),

    /// Recompute oracle index assignments from their seeds.
    #[command(name = "audit-indexes")]
    AuditIndexes(AuditArgs),

    /// Summarise a ledger snapshot file.
    Inspect(InspectArgs),
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

    let result = match cli.command {
        Commands::Simulate(args) => run_simulate(&args),
        Commands::Params(args) => run_params(&args),
        Commands::AuditIndexes(args) => run_audit(&args),
        Commands::Inspect(args) => run_inspect(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
