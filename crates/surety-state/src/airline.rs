//! # Airline Registry
//!
//! Admission and funding state of airlines.
//!
//! ## Admission
//!
//! ```text
//!   genesis ──────────────────────────────▶ Registered (owner)
//!   register() while below multiparty ────▶ Registered
//!   register() at/above multiparty ───────▶ Pending ──vote()×k──▶ Registered
//! ```
//!
//! `k = ceil(registered / vote_divisor)` approving votes from distinct
//! registered airlines, evaluated against the registered count at the time of
//! each vote. A rejected vote (`approve = false`) is recorded and blocks a
//! second vote from the same airline but never counts toward `k`.
//!
//! ## Funding
//!
//! A registered airline becomes funded by contributing at least the minimum.
//! Operational means registered and funded; only operational airlines can
//! register flights.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use surety_core::{AccountId, Amount, ProtocolEvent, ProtocolParams, SuretyError};

/// Admission state of an airline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdmissionStatus {
    /// Nominated, waiting for votes.
    Pending,
    /// Admitted.
    Registered,
}

impl AdmissionStatus {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Registered => "REGISTERED",
        }
    }
}

impl std::fmt::Display for AdmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An airline known to the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airline {
    pub id: AccountId,
    pub status: AdmissionStatus,
    /// Total contributed funding.
    pub funding: Amount,
    /// Set once a contribution at or above the minimum was accepted.
    pub funded: bool,
    /// Votes received while pending: voter → approve.
    pub votes: BTreeMap<AccountId, bool>,
    /// The airline that nominated this one, `None` for the owner.
    pub nominated_by: Option<AccountId>,
}

impl Airline {
    fn new(id: AccountId, status: AdmissionStatus, nominated_by: Option<AccountId>) -> Self {
        Self {
            id,
            status,
            funding: Amount::ZERO,
            funded: false,
            votes: BTreeMap::new(),
            nominated_by,
        }
    }

    /// Whether the airline has been admitted.
    pub fn is_registered(&self) -> bool {
        self.status == AdmissionStatus::Registered
    }

    /// Registered and funded.
    pub fn is_operational(&self) -> bool {
        self.is_registered() && self.funded
    }

    /// Number of approving votes.
    pub fn approvals(&self) -> usize {
        self.votes.values().filter(|approve| **approve).count()
    }
}

/// Result of a `register` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "admission", rename_all = "snake_case")]
pub enum Admission {
    /// Admitted without a vote.
    Registered,
    /// Waiting for votes.
    Pending { required_votes: usize },
}

/// Result of a `vote` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub approvals: usize,
    pub required: usize,
    pub registered: bool,
}

/// Registry of all airlines, registered and pending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirlineRegistry {
    airlines: BTreeMap<AccountId, Airline>,
    registered_count: usize,
}

impl AirlineRegistry {
    /// Registry holding only the protocol owner, admitted implicitly.
    pub fn with_owner(owner: AccountId) -> Self {
        let mut airlines = BTreeMap::new();
        airlines.insert(
            owner.clone(),
            Airline::new(owner, AdmissionStatus::Registered, None),
        );
        Self {
            airlines,
            registered_count: 1,
        }
    }

    /// Nominate or directly admit `candidate` on behalf of `requester`.
    pub fn register(
        &mut self,
        params: &ProtocolParams,
        requester: &AccountId,
        candidate: &AccountId,
        events: &mut Vec<ProtocolEvent>,
    ) -> Result<Admission, SuretyError> {
        if !self.is_registered(requester) {
            return Err(SuretyError::NotAuthorized(format!(
                "{requester} is not a registered airline"
            )));
        }
        if let Some(existing) = self.airlines.get(candidate) {
            return Err(SuretyError::AlreadyRegistered(format!(
                "airline {candidate} is {}",
                existing.status
            )));
        }

        if params.admits_directly(self.registered_count) {
            self.airlines.insert(
                candidate.clone(),
                Airline::new(
                    candidate.clone(),
                    AdmissionStatus::Registered,
                    Some(requester.clone()),
                ),
            );
            self.registered_count += 1;
            events.push(ProtocolEvent::AirlineRegistered {
                airline: candidate.clone(),
                votes: 0,
            });
            return Ok(Admission::Registered);
        }

        let required_votes = params.required_votes(self.registered_count);
        self.airlines.insert(
            candidate.clone(),
            Airline::new(
                candidate.clone(),
                AdmissionStatus::Pending,
                Some(requester.clone()),
            ),
        );
        events.push(ProtocolEvent::AirlineNominated {
            candidate: candidate.clone(),
            nominated_by: requester.clone(),
            required_votes,
        });
        Ok(Admission::Pending { required_votes })
    }

    /// Record `voter`'s vote on a pending `candidate`.
    pub fn vote(
        &mut self,
        params: &ProtocolParams,
        voter: &AccountId,
        candidate: &AccountId,
        approve: bool,
        events: &mut Vec<ProtocolEvent>,
    ) -> Result<VoteTally, SuretyError> {
        let voter_record = self.airlines.get(voter).filter(|a| a.is_registered());
        let Some(voter_record) = voter_record else {
            return Err(SuretyError::NotAuthorized(format!(
                "{voter} is not a registered airline"
            )));
        };
        if params.require_funded_voter && !voter_record.funded {
            return Err(SuretyError::NotOperational(voter.clone()));
        }
        if voter == candidate {
            return Err(SuretyError::NotAuthorized(format!(
                "{voter} cannot vote for itself"
            )));
        }

        let required = params.required_votes(self.registered_count);
        let record = self
            .airlines
            .get_mut(candidate)
            .ok_or_else(|| SuretyError::UnknownAirline(candidate.clone()))?;
        if record.is_registered() {
            return Err(SuretyError::AlreadyRegistered(format!(
                "airline {candidate} is REGISTERED"
            )));
        }
        if record.votes.contains_key(voter) {
            return Err(SuretyError::AlreadyVoted {
                voter: voter.clone(),
                candidate: candidate.clone(),
            });
        }

        record.votes.insert(voter.clone(), approve);
        let approvals = record.approvals();
        let registered = approvals >= required;
        if registered {
            record.status = AdmissionStatus::Registered;
            self.registered_count += 1;
            events.push(ProtocolEvent::AirlineRegistered {
                airline: candidate.clone(),
                votes: approvals,
            });
        }
        Ok(VoteTally {
            approvals,
            required,
            registered,
        })
    }

    /// Accept a funding contribution from a registered airline.
    pub fn fund(
        &mut self,
        params: &ProtocolParams,
        airline: &AccountId,
        amount: Amount,
        events: &mut Vec<ProtocolEvent>,
    ) -> Result<Amount, SuretyError> {
        let record = self
            .airlines
            .get_mut(airline)
            .ok_or_else(|| SuretyError::UnknownAirline(airline.clone()))?;
        if !record.is_registered() {
            return Err(SuretyError::NotAuthorized(format!(
                "{airline} must be registered before funding"
            )));
        }
        if amount < params.min_airline_funding {
            return Err(SuretyError::InsufficientFunds(format!(
                "funding {amount} is below the minimum {}",
                params.min_airline_funding
            )));
        }
        record.funding = record
            .funding
            .checked_add(amount)
            .ok_or_else(|| SuretyError::InvalidAmount(format!("funding {amount} overflows")))?;
        record.funded = true;
        events.push(ProtocolEvent::AirlineFunded {
            airline: airline.clone(),
            amount,
        });
        Ok(record.funding)
    }

    /// Look up an airline.
    pub fn get(&self, airline: &AccountId) -> Option<&Airline> {
        self.airlines.get(airline)
    }

    /// Whether the airline has been admitted.
    pub fn is_registered(&self, airline: &AccountId) -> bool {
        self.airlines.get(airline).is_some_and(Airline::is_registered)
    }

    /// Whether the airline is registered and funded.
    pub fn is_operational(&self, airline: &AccountId) -> bool {
        self.airlines.get(airline).is_some_and(Airline::is_operational)
    }

    /// Total funding contributed by the airline.
    pub fn funding(&self, airline: &AccountId) -> Result<Amount, SuretyError> {
        self.airlines
            .get(airline)
            .map(|a| a.funding)
            .ok_or_else(|| SuretyError::UnknownAirline(airline.clone()))
    }

    /// Approving votes received by a candidate.
    pub fn vote_count(&self, airline: &AccountId) -> Result<usize, SuretyError> {
        self.airlines
            .get(airline)
            .map(Airline::approvals)
            .ok_or_else(|| SuretyError::UnknownAirline(airline.clone()))
    }

    /// Number of registered airlines.
    pub fn registered_count(&self) -> usize {
        self.registered_count
    }

    /// All airlines in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &Airline> {
        self.airlines.values()
    }
}
