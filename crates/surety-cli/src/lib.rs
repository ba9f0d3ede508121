//! # surety-cli — Flight Surety Command-Line Interface
//!
//! ## Subcommands
//!
//! - `simulate` — Deploy in-process, run the demo bootstrap, sell policies,
//!   resolve every demo flight through the oracle simulator, and withdraw
//!   payouts. Optionally writes the resulting ledger snapshot.
//! - `params` — Print the effective protocol parameters as YAML.
//! - `audit-indexes` — Recompute oracle index assignments from their seeds.
//! - `inspect` — Summarise a ledger snapshot file.
//!
//! ## Crate Policy
//!
//! - CLI construction (argument parsing) is separated from business logic.
//! - Handler functions delegate to `surety-state` and `surety-api`.
//! - Handlers return an exit code; errors propagate as `anyhow::Error`.

pub mod audit;
pub mod inspect;
pub mod params;
pub mod simulate;

use std::path::Path;

use anyhow::{Context, Result};

use surety_core::ProtocolParams;
use surety_state::LedgerSnapshot;

/// Load parameters from `path`, or the defaults when `None`.
pub fn load_params(path: Option<&Path>) -> Result<ProtocolParams> {
    match path {
        Some(path) => surety_api::bootstrap::load_params(path)
            .with_context(|| format!("loading parameters from {}", path.display())),
        None => Ok(ProtocolParams::default()),
    }
}

/// Read a ledger snapshot written by `simulate --out`.
pub fn read_snapshot(path: &Path) -> Result<LedgerSnapshot> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    LedgerSnapshot::from_json(&json).with_context(|| format!("parsing snapshot {}", path.display()))
}
