//! # surety-core — Foundational Types for the Flight Surety Protocol
//!
//! Every other crate in the workspace depends on `surety-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `AccountId`, `FlightKey`,
//!    `PolicyId` — validated constructors, no bare strings in signatures.
//!
//! 2. **Fixed-point `Amount`.** All value flows (airline funding, oracle fees,
//!    premiums, payouts) use 18-decimal base units in a `u128`. Floats are
//!    never used for money.
//!
//! 3. **Single `FlightStatus` enum.** One definition with the numeric wire
//!    codes (0, 10, 20, 30, 40, 50), exhaustive `match` everywhere.
//!
//! 4. **Single `SuretyError` taxonomy.** Every rejected state transition maps
//!    to one stable error kind.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `surety-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod error;
pub mod event;
pub mod identity;
pub mod params;
pub mod status;

// Re-export primary types for ergonomic imports.
pub use amount::{Amount, AmountParseError, BASE_UNITS_PER_UNIT, DECIMALS};
pub use error::{IdentityError, ParamsError, SuretyError};
pub use event::ProtocolEvent;
pub use identity::{AccountId, FlightKey, PolicyId, RoundId};
pub use params::{PayoutRatio, ProtocolParams};
pub use status::FlightStatus;
