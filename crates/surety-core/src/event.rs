//! # Protocol Events
//!
//! Observable events emitted by committed operations. Oracle clients watch for
//! [`ProtocolEvent::OracleRequest`] and dashboards consume the rest. Events
//! are only published for operations that committed; a rejected operation
//! emits nothing.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::identity::{AccountId, FlightKey, PolicyId, RoundId};
use crate::status::FlightStatus;

/// An event emitted by a committed protocol operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    /// An airline finished admission (directly or by vote).
    AirlineRegistered {
        airline: AccountId,
        /// Number of approving votes it held, zero for direct admission.
        votes: usize,
    },
    /// An airline entered the pending state awaiting votes.
    AirlineNominated {
        candidate: AccountId,
        nominated_by: AccountId,
        required_votes: usize,
    },
    /// An airline paid its funding contribution.
    AirlineFunded { airline: AccountId, amount: Amount },
    /// A flight was registered with status `Unknown`.
    FlightRegistered { key: FlightKey },
    /// A passenger bought a policy.
    InsurancePurchased {
        passenger: AccountId,
        key: FlightKey,
        policy: PolicyId,
        amount: Amount,
    },
    /// An oracle registered and received its index set.
    OracleRegistered { oracle: AccountId, indexes: Vec<u8> },
    /// A consensus round was opened. Oracles holding `index` should report.
    OracleRequest {
        index: u8,
        key: FlightKey,
        round: RoundId,
    },
    /// An oracle report was accepted into a round.
    OracleReport {
        oracle: AccountId,
        key: FlightKey,
        status: FlightStatus,
        matching: usize,
    },
    /// A round reached the agreement threshold.
    FlightResolved {
        key: FlightKey,
        status: FlightStatus,
        round: RoundId,
    },
    /// A payout was credited to a passenger's withdrawable balance.
    PayoutCredited {
        passenger: AccountId,
        policy: PolicyId,
        amount: Amount,
    },
    /// A passenger withdrew their credited balance.
    Withdrawn { passenger: AccountId, amount: Amount },
    /// The owner paused or resumed the protocol.
    OperatingStatusChanged { operational: bool },
}

impl ProtocolEvent {
    /// Short snake_case name of the event variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AirlineRegistered { .. } => "airline_registered",
            Self::AirlineNominated { .. } => "airline_nominated",
            Self::AirlineFunded { .. } => "airline_funded",
            Self::FlightRegistered { .. } => "flight_registered",
            Self::InsurancePurchased { .. } => "insurance_purchased",
            Self::OracleRegistered { .. } => "oracle_registered",
            Self::OracleRequest { .. } => "oracle_request",
            Self::OracleReport { .. } => "oracle_report",
            Self::FlightResolved { .. } => "flight_resolved",
            Self::PayoutCredited { .. } => "payout_credited",
            Self::Withdrawn { .. } => "withdrawn",
            Self::OperatingStatusChanged { .. } => "operating_status_changed",
        }
    }
}
