//! # API Route Modules
//!
//! - `airlines` — admission, voting and funding.
//! - `flights` — flight registration, status and oracle requests.
//! - `insurance` — policies, passenger balances and withdrawals.
//! - `oracles` — oracle registration, index assignments and reports.
//! - `protocol` — ledger summary, parameters, operating status, event feed.
//! - `demo` — demo flight seeding.

pub mod airlines;
pub mod demo;
pub mod flights;
pub mod insurance;
pub mod oracles;
pub mod protocol;
