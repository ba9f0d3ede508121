//! # Audit Indexes Subcommand
//!
//! Oracle index sets are drawn from a per-oracle seed recorded on the
//! ledger. This command recomputes assignments so anyone holding a seed
//! (or a snapshot) can check the ledger did not hand out indexes of its
//! own choosing.
//!
//! - `surety audit-indexes --seed <hex>` — print the set a seed yields.
//! - `surety audit-indexes --snapshot <file>` — recompute every oracle in a
//!   snapshot; exits 1 on any mismatch.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use surety_core::AccountId;
use surety_state::{draw_indexes, LedgerSnapshot, Seed};

/// Arguments for the `surety audit-indexes` subcommand.
#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Hex assignment seed of one oracle.
    #[arg(long, conflicts_with = "snapshot")]
    pub seed: Option<String>,

    /// Ledger snapshot whose oracles are audited.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Indexes per oracle (with `--seed`).
    #[arg(long)]
    pub count: Option<u8>,

    /// Size of the index range.
    #[arg(long)]
    pub range: Option<u8>,

    /// Parameter file supplying count and range defaults.
    #[arg(long)]
    pub params: Option<PathBuf>,
}

/// One audited oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFinding {
    pub oracle: AccountId,
    pub recorded: Vec<u8>,
    pub recomputed: Vec<u8>,
}

impl AuditFinding {
    pub fn matches(&self) -> bool {
        self.recorded == self.recomputed
    }
}

/// Execute the audit-indexes subcommand.
pub fn run_audit(args: &AuditArgs) -> Result<u8> {
    let params = crate::load_params(args.params.as_deref())?;
    let range = args.range.unwrap_or(params.index_range);

    if let Some(seed) = &args.seed {
        let seed = Seed::from_hex(seed).map_err(anyhow::Error::msg)?;
        let count = args.count.unwrap_or(params.indexes_per_oracle);
        let indexes = draw_indexes(seed, count, range);
        println!("{indexes:?}");
        return Ok(0);
    }

    let Some(path) = &args.snapshot else {
        bail!("either --seed or --snapshot is required");
    };
    let snapshot = crate::read_snapshot(path)?;
    let findings = audit_snapshot(&snapshot, range);
    let mismatches = findings.iter().filter(|f| !f.matches()).count();
    for finding in &findings {
        let verdict = if finding.matches() { "ok" } else { "MISMATCH" };
        println!(
            "{:<16} {:<8} recorded {:?} recomputed {:?}",
            finding.oracle.as_str(),
            verdict,
            finding.recorded,
            finding.recomputed
        );
    }
    println!("{} oracles audited, {mismatches} mismatches", findings.len());
    Ok(if mismatches == 0 { 0 } else { 1 })
}

/// Recompute every oracle's assignment in `snapshot`.
pub fn audit_snapshot(snapshot: &LedgerSnapshot, range: u8) -> Vec<AuditFinding> {
    snapshot
        .state
        .oracles
        .oracles()
        .map(|oracle| {
            let count = u8::try_from(oracle.indexes.len()).unwrap_or(u8::MAX);
            AuditFinding {
                oracle: oracle.id.clone(),
                recorded: oracle.indexes.clone(),
                recomputed: draw_indexes(oracle.seed, count, range),
            }
        })
        .collect()
}
