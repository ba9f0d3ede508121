//! # Inspect Subcommand
//!
//! Summarises a ledger snapshot: aggregate counters, flight statuses and
//! event counts per kind.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use surety_state::{LedgerSnapshot, LedgerSummary};

/// Arguments for the `surety inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Snapshot file written by `surety simulate --out`.
    pub snapshot: PathBuf,

    /// Print as JSON instead of YAML.
    #[arg(long)]
    pub json: bool,
}

/// What `inspect` reports.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub taken_at: String,
    pub summary: LedgerSummary,
    /// Flight key → status name.
    pub flights: BTreeMap<String, String>,
    /// Event name → occurrences.
    pub events: BTreeMap<&'static str, usize>,
}

/// Execute the inspect subcommand.
pub fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let snapshot = crate::read_snapshot(&args.snapshot)?;
    let inspection = inspect(&snapshot);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
    } else {
        print!("{}", serde_yaml::to_string(&inspection)?);
    }
    Ok(0)
}

/// Summarise a snapshot.
pub fn inspect(snapshot: &LedgerSnapshot) -> Inspection {
    let mut events = BTreeMap::new();
    for record in &snapshot.events {
        *events.entry(record.event.name()).or_insert(0) += 1;
    }
    Inspection {
        taken_at: snapshot.taken_at.to_rfc3339(),
        summary: LedgerSummary::of(&snapshot.state, snapshot.events.len() as u64),
        flights: snapshot
            .state
            .flights
            .iter()
            .map(|f| (String::from(f.key.clone()), f.status.as_str().to_string()))
            .collect(),
        events,
    }
}
