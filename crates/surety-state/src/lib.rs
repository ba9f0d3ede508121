//! # surety-state — Governance and Consensus State Machines
//!
//! The state of the flight surety protocol and the rules that move it.
//!
//! ## Components
//!
//! - **Airlines** (`airline.rs`): direct admission below the multiparty
//!   threshold, vote-based admission above it, funding.
//!
//! - **Flights** (`flight.rs`): flights of operational airlines and their
//!   consensus-resolved status.
//!
//! - **Insurance** (`insurance.rs`): capped policies, payout crediting on
//!   `LateAirline`, withdrawable balances.
//!
//! - **Oracles** (`oracle.rs`): index assignment, status requests, threshold
//!   agreement over concurrently submitted reports.
//!
//! - **Seeds** (`seed.rs`): keyed, auditable seeds and the deterministic
//!   index generator.
//!
//! - **Ledger** (`ledger.rs`): one mutex-protected state with
//!   copy-on-write transactions and an append-only event log.
//!
//! - **Protocol** (`protocol.rs`): the operation surface, one ledger
//!   transaction per operation.

pub mod airline;
pub mod flight;
pub mod insurance;
pub mod ledger;
pub mod oracle;
pub mod protocol;
pub mod seed;
pub mod transfer;

// ─── Registries ─────────────────────────────────────────────────────

pub use airline::{Admission, AdmissionStatus, Airline, AirlineRegistry, VoteTally};
pub use flight::{Flight, FlightRegistry};
pub use insurance::{InsurancePool, Policy};
pub use oracle::{ConsensusRound, Oracle, OracleCoordinator, ResponseOutcome, StatusRequest};

// ─── Ledger and protocol ────────────────────────────────────────────

pub use ledger::{EventRecord, EventSink, Ledger, LedgerSnapshot, LedgerState};
pub use protocol::{FlightSurety, LedgerSummary, ReportOutcome};
pub use seed::{draw_index, draw_indexes, Entropy, KeyedSeedSource, Seed, SeedDomain, SeedSource};
pub use transfer::{PayoutTransfer, RecordingTransfer, TransferError};
