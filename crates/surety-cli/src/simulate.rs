//! # Simulate Subcommand
//!
//! Runs a complete scenario against an in-process ledger: demo bootstrap,
//! demo flights, policy sales, one status request per flight answered by
//! the oracle simulator, and withdrawal of every credited payout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use surety_api::bootstrap::{deploy, run_demo_setup, seed_demo_flights, BootstrapOptions, DEFAULT_OWNER};
use surety_api::simulator::{OracleSimulator, StatusPolicy};
use surety_core::{AccountId, Amount, FlightKey, FlightStatus};
use surety_state::LedgerSummary;

/// Arguments for the `surety simulate` subcommand.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Protocol parameters YAML. Defaults apply when omitted.
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Hex seed key (64 characters). Random when omitted.
    #[arg(long)]
    pub seed_key: Option<String>,

    /// Number of simulated oracles.
    #[arg(long, default_value_t = 20)]
    pub oracles: usize,

    /// Passengers insuring every demo flight.
    #[arg(long, default_value_t = 3)]
    pub passengers: usize,

    /// Premium each passenger pays per flight, in units.
    #[arg(long, default_value = "0.5")]
    pub premium: String,

    /// Status every oracle reports (name or code). Random per flight when omitted.
    #[arg(long)]
    pub status: Option<String>,

    /// Write the final ledger snapshot to this file.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// How one flight's round ended.
#[derive(Debug, Clone, Serialize)]
pub struct FlightOutcome {
    pub key: FlightKey,
    pub reported: Option<FlightStatus>,
    pub status: FlightStatus,
    pub accepted: usize,
    pub ignored: usize,
    pub rejected: usize,
}

/// Result of a simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub flights: Vec<FlightOutcome>,
    pub withdrawals: Vec<(AccountId, Amount)>,
    pub summary: LedgerSummary,
}

/// Execute the simulate subcommand.
pub fn run_simulate(args: &SimulateArgs) -> Result<u8> {
    let report = run_simulation(args)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(0)
}

/// Run the scenario and return what happened.
pub fn run_simulation(args: &SimulateArgs) -> Result<SimulationReport> {
    let premium = Amount::parse_units(&args.premium)
        .with_context(|| format!("invalid premium {:?}", args.premium))?;
    let policy = match &args.status {
        Some(status) => StatusPolicy::Fixed(status.parse().map_err(anyhow::Error::msg)?),
        None => StatusPolicy::Random,
    };

    let options = BootstrapOptions {
        config_path: args.params.clone(),
        seed_key: args.seed_key.clone(),
        oracle_count: args.oracles,
        ..BootstrapOptions::default()
    };
    let protocol = Arc::new(deploy(&options)?);
    let owner = AccountId::new(DEFAULT_OWNER)?;
    let setup = run_demo_setup(&protocol, &owner, args.oracles);
    let keys = seed_demo_flights(&protocol);

    let passengers = (1..=args.passengers)
        .map(|i| AccountId::new(format!("passenger-{i}")))
        .collect::<Result<Vec<_>, _>>()?;
    for passenger in &passengers {
        for key in &keys {
            if let Err(e) = protocol.purchase_insurance(passenger, key, premium) {
                tracing::warn!(%passenger, flight = %key, error = %e, "purchase rejected");
            }
        }
    }

    let simulator = OracleSimulator::new(protocol.clone(), setup.oracles, policy);
    let mut flights = Vec::with_capacity(keys.len());
    for key in &keys {
        let request = protocol.request_flight_status(key)?;
        let tally = simulator.respond(request.index, key);
        flights.push(FlightOutcome {
            key: key.clone(),
            reported: tally.status,
            status: protocol.flight_status(key)?,
            accepted: tally.accepted,
            ignored: tally.ignored,
            rejected: tally.rejected,
        });
    }

    let mut withdrawals = Vec::new();
    for passenger in &passengers {
        if protocol.balance(passenger).is_zero() {
            continue;
        }
        let amount = protocol.withdraw(passenger)?;
        withdrawals.push((passenger.clone(), amount));
    }

    if let Some(out) = &args.out {
        write_snapshot(&protocol.snapshot(), out)?;
    }

    Ok(SimulationReport {
        flights,
        withdrawals,
        summary: protocol.summary(),
    })
}

fn write_snapshot(snapshot: &surety_state::LedgerSnapshot, path: &Path) -> Result<()> {
    let json = snapshot.to_json()?;
    std::fs::write(path, json).with_context(|| format!("writing snapshot {}", path.display()))?;
    tracing::info!(path = %path.display(), "snapshot written");
    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!("FLIGHTS");
    for flight in &report.flights {
        let reported = flight
            .reported
            .map_or("-", |s| s.as_str());
        println!(
            "  {:<36} {:<15} reported {:<15} accepted {} ignored {} rejected {}",
            String::from(flight.key.clone()),
            flight.status.as_str(),
            reported,
            flight.accepted,
            flight.ignored,
            flight.rejected
        );
    }
    println!("WITHDRAWALS");
    if report.withdrawals.is_empty() {
        println!("  none");
    }
    for (passenger, amount) in &report.withdrawals {
        println!("  {:<16} {amount}", passenger.as_str());
    }
    let s = &report.summary;
    println!("LEDGER");
    println!("  height {} events {}", s.height, s.events);
    println!(
        "  airlines {} operational {} oracles {} policies {}",
        s.airlines_registered, s.airlines_operational, s.oracles, s.policies
    );
    println!(
        "  premiums {} payouts {} oracle fees {}",
        s.premiums_collected, s.payouts_credited, s.oracle_fees_collected
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(status: &str) -> SimulateArgs {
        SimulateArgs {
            params: None,
            seed_key: Some("42".repeat(32)),
            oracles: 20,
            passengers: 2,
            premium: "0.5".into(),
            status: Some(status.into()),
            out: None,
            json: false,
        }
    }

    #[test]
    fn late_airline_pays_every_passenger() {
        let report = run_simulation(&args("LATE_AIRLINE")).unwrap();
        assert_eq!(report.flights.len(), 6);
        assert_eq!(report.summary.policies, 12);

        let resolved = report
            .flights
            .iter()
            .filter(|f| f.status == FlightStatus::LateAirline)
            .count();
        // 0.75 per resolved flight per passenger.
        for (_, amount) in &report.withdrawals {
            assert_eq!(*amount, Amount::fraction(3, 4).checked_mul_ratio(resolved as u32, 1).unwrap());
        }
        if resolved > 0 {
            assert_eq!(report.withdrawals.len(), 2);
        }
    }

    #[test]
    fn on_time_pays_nothing() {
        let report = run_simulation(&args("10")).unwrap();
        assert!(report.withdrawals.is_empty());
        assert!(report.summary.payouts_credited.is_zero());
    }

    #[test]
    fn snapshot_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("ledger.json");
        let mut args = args("ON_TIME");
        args.out = Some(out.clone());
        run_simulation(&args).unwrap();
        let snapshot = crate::read_snapshot(&out).unwrap();
        assert_eq!(snapshot.state.flights.len(), 6);
    }

    #[test]
    fn bad_inputs_fail() {
        let mut bad_status = args("SOMETIMES");
        assert!(run_simulation(&bad_status).is_err());
        bad_status.status = None;
        bad_status.premium = "lots".into();
        assert!(run_simulation(&bad_status).is_err());
    }
}
