//! # Error Types — Protocol Error Taxonomy
//!
//! Every rejected state transition in the protocol is reported as exactly one
//! [`SuretyError`] kind. Errors are terminal outcomes of the attempted
//! operation, never control flow: the ledger guarantees that a failed
//! operation leaves every registry untouched.
//!
//! `RequestClosed` is the one benign kind. Late or duplicated oracle traffic
//! for an already-finalized round is expected on a real network, so callers
//! treat it as a no-op (see [`SuretyError::is_benign`]).

use thiserror::Error;

use crate::identity::{AccountId, FlightKey};
use crate::status::FlightStatus;

/// Top-level error type for protocol operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SuretyError {
    /// The caller lacks the role required for this operation.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// The airline is registered but not funded (or not registered at all).
    #[error("airline {0} is not operational")]
    NotOperational(AccountId),

    /// The airline, flight, or oracle is already present.
    #[error("already registered: {0}")]
    AlreadyRegistered(String),

    /// The voter already cast a vote for this candidate.
    #[error("{voter} has already voted for {candidate}")]
    AlreadyVoted {
        /// The airline casting the vote.
        voter: AccountId,
        /// The candidate airline.
        candidate: AccountId,
    },

    /// A payment was below the required minimum or a balance is empty.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// No flight is registered under the key.
    #[error("unknown flight {0}")]
    UnknownFlight(FlightKey),

    /// No airline (registered or pending) exists for the identity.
    #[error("unknown airline {0}")]
    UnknownAirline(AccountId),

    /// The purchase would exceed the per-flight insurance cap.
    #[error("insurance cap exceeded: requested {requested}, cap {cap}")]
    CapExceeded {
        /// Total premium the passenger would hold on this flight.
        requested: String,
        /// Configured cap.
        cap: String,
    },

    /// The oracle already reported in the current round.
    #[error("oracle {oracle} already responded for {key}")]
    DuplicateResponse {
        /// Reporting oracle.
        oracle: AccountId,
        /// Flight the round belongs to.
        key: FlightKey,
    },

    /// The index does not match the oracle's assignment or the round.
    #[error("invalid oracle index {index}: {reason}")]
    InvalidIndex {
        /// Submitted index.
        index: u8,
        /// Which check failed.
        reason: String,
    },

    /// Oracles may only report terminal status codes.
    #[error("status {0} cannot be reported")]
    InvalidStatus(FlightStatus),

    /// The round for this flight is already finalized. Benign.
    #[error("request for {0} is already closed")]
    RequestClosed(FlightKey),

    /// No status request was ever opened for the flight.
    #[error("no open status request for {0}")]
    NoOpenRequest(FlightKey),

    /// The protocol owner has paused state-changing operations.
    #[error("protocol is paused")]
    ProtocolPaused,

    /// An amount of zero or an otherwise unusable value.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A malformed account id or flight designator.
    #[error(transparent)]
    InvalidIdentifier(#[from] IdentityError),

    /// The external transfer failed; the credited balance was restored.
    #[error("transfer to {passenger} failed: {reason}")]
    TransferFailed {
        /// Recipient of the failed transfer.
        passenger: AccountId,
        /// Transport-level reason.
        reason: String,
    },
}

impl SuretyError {
    /// Whether this outcome is a tolerated no-op rather than a failure.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::RequestClosed(_))
    }

    /// Stable machine-readable code for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotAuthorized(_) => "NOT_AUTHORIZED",
            Self::NotOperational(_) => "NOT_OPERATIONAL",
            Self::AlreadyRegistered(_) => "ALREADY_REGISTERED",
            Self::AlreadyVoted { .. } => "ALREADY_VOTED",
            Self::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            Self::UnknownFlight(_) => "UNKNOWN_FLIGHT",
            Self::UnknownAirline(_) => "UNKNOWN_AIRLINE",
            Self::CapExceeded { .. } => "CAP_EXCEEDED",
            Self::DuplicateResponse { .. } => "DUPLICATE_RESPONSE",
            Self::InvalidIndex { .. } => "INVALID_INDEX",
            Self::InvalidStatus(_) => "INVALID_STATUS",
            Self::RequestClosed(_) => "REQUEST_CLOSED",
            Self::NoOpenRequest(_) => "NO_OPEN_REQUEST",
            Self::ProtocolPaused => "PROTOCOL_PAUSED",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            Self::TransferFailed { .. } => "TRANSFER_FAILED",
        }
    }
}

/// Error constructing a validated identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Account identifiers must be non-empty.
    #[error("account id must not be empty")]
    EmptyAccount,

    /// Account identifiers are at most 128 characters and never contain `|`.
    #[error("invalid account id: {0:?}")]
    InvalidAccount(String),

    /// Flight designators are 2–16 ASCII alphanumerics.
    #[error("invalid flight designator: {0:?}")]
    InvalidDesignator(String),

    /// The string form of a flight key is `airline|designator|timestamp`.
    #[error("malformed flight key: {0:?}")]
    MalformedFlightKey(String),
}

/// Error validating [`ProtocolParams`](crate::ProtocolParams).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamsError {
    /// A parameter that must be positive was zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// The index range cannot supply enough distinct indexes per oracle.
    #[error("index range {range} cannot supply {per_oracle} distinct indexes")]
    IndexRangeTooSmall {
        /// Size of the index range.
        range: u8,
        /// Indexes required per oracle.
        per_oracle: u8,
    },

    /// A payout ratio below 1 would pay less than the premium.
    #[error("payout ratio {numerator}/{denominator} is below 1")]
    PayoutBelowPremium {
        /// Ratio numerator.
        numerator: u32,
        /// Ratio denominator.
        denominator: u32,
    },
}
