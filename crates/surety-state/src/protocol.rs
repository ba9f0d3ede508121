//! # Flight Surety Protocol
//!
//! [`FlightSurety`] is the operation surface of the protocol. Each method is
//! one ledger transaction over the registries, so every operation is
//! all-or-nothing and serialized against every other.
//!
//! While the owner has paused the protocol, every mutating operation fails
//! with `ProtocolPaused`. Reads keep working.
//!
//! ## Withdrawal
//!
//! ```text
//!   tx 1: debit balance to zero ──▶ transfer (no lock held) ──ok──▶ tx 2: emit Withdrawn
//!                                                          └─err─▶ tx 2: restore balance
//! ```
//!
//! The balance is zero for the whole duration of the transfer, so a
//! re-entrant withdrawal sees nothing to withdraw.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use surety_core::{
    AccountId, Amount, FlightKey, FlightStatus, ParamsError, PolicyId, ProtocolEvent,
    ProtocolParams, SuretyError,
};

use crate::airline::{Admission, Airline, VoteTally};
use crate::flight::Flight;
use crate::insurance::Policy;
use crate::ledger::{EventRecord, EventSink, Ledger, LedgerSnapshot, LedgerState};
use crate::oracle::{ConsensusRound, Oracle, ResponseOutcome, StatusRequest};
use crate::seed::{Entropy, SeedSource};
use crate::transfer::PayoutTransfer;

/// Outcome of an oracle report as seen by the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReportOutcome {
    /// The report was counted.
    Accepted(ResponseOutcome),
    /// The round had already finalized; nothing changed.
    Ignored,
}

/// Aggregate counters over the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub owner: AccountId,
    pub operational: bool,
    pub height: u64,
    pub events: u64,
    pub airlines_registered: usize,
    pub airlines_operational: usize,
    pub airlines_pending: usize,
    pub flights: usize,
    pub flights_resolved: usize,
    pub policies: usize,
    pub oracles: usize,
    pub open_rounds: usize,
    pub premiums_collected: Amount,
    pub payouts_credited: Amount,
    pub oracle_fees_collected: Amount,
}

impl LedgerSummary {
    pub fn of(state: &LedgerState, events: u64) -> Self {
        let airlines: Vec<&Airline> = state.airlines.iter().collect();
        Self {
            owner: state.owner.clone(),
            operational: state.operational,
            height: state.height,
            events,
            airlines_registered: state.airlines.registered_count(),
            airlines_operational: airlines.iter().filter(|a| a.is_operational()).count(),
            airlines_pending: airlines.iter().filter(|a| !a.is_registered()).count(),
            flights: state.flights.len(),
            flights_resolved: state
                .flights
                .iter()
                .filter(|f| f.status.is_terminal())
                .count(),
            policies: state.pool.policy_count(),
            oracles: state.oracles.oracle_count(),
            open_rounds: state.oracles.open_rounds().count(),
            premiums_collected: state.pool.premiums_collected(),
            payouts_credited: state.pool.payouts_credited(),
            oracle_fees_collected: state.oracles.fees_collected(),
        }
    }
}

/// The flight surety protocol over a single ledger.
pub struct FlightSurety {
    ledger: Ledger,
    params: ProtocolParams,
    seeds: Arc<dyn SeedSource>,
    transfer: Arc<dyn PayoutTransfer>,
}

impl std::fmt::Debug for FlightSurety {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightSurety")
            .field("ledger", &self.ledger)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl FlightSurety {
    /// Deploy the protocol with `owner` as the first airline.
    pub fn new(
        owner: AccountId,
        params: ProtocolParams,
        seeds: Arc<dyn SeedSource>,
        transfer: Arc<dyn PayoutTransfer>,
    ) -> Result<Self, ParamsError> {
        params.validate()?;
        tracing::info!(%owner, "flight surety protocol deployed");
        Ok(Self {
            ledger: Ledger::new(owner),
            params,
            seeds,
            transfer,
        })
    }

    /// Resume from a snapshot.
    pub fn from_snapshot(
        snapshot: LedgerSnapshot,
        params: ProtocolParams,
        seeds: Arc<dyn SeedSource>,
        transfer: Arc<dyn PayoutTransfer>,
    ) -> Result<Self, ParamsError> {
        params.validate()?;
        Ok(Self {
            ledger: Ledger::from_snapshot(snapshot),
            params,
            seeds,
            transfer,
        })
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    /// Forward committed events to `sink`.
    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.ledger.subscribe(sink);
    }

    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut LedgerState, &mut Vec<ProtocolEvent>) -> Result<R, SuretyError>,
    ) -> Result<R, SuretyError> {
        self.ledger.transact(|state, events| {
            if !state.operational {
                return Err(SuretyError::ProtocolPaused);
            }
            f(state, events)
        })
    }

    // -- Governance ------------------------------------------------------------

    /// Pause or resume the protocol. Owner only.
    pub fn set_operating_status(
        &self,
        caller: &AccountId,
        operational: bool,
    ) -> Result<bool, SuretyError> {
        let changed = self.ledger.transact(|state, events| {
            if caller != &state.owner {
                return Err(SuretyError::NotAuthorized(format!(
                    "{caller} is not the protocol owner"
                )));
            }
            let changed = state.operational != operational;
            if changed {
                state.operational = operational;
                events.push(ProtocolEvent::OperatingStatusChanged { operational });
            }
            Ok(changed)
        })?;
        if changed {
            tracing::info!(operational, "operating status changed");
        }
        Ok(changed)
    }

    pub fn is_operational(&self) -> bool {
        self.ledger.read(|s| s.operational)
    }

    pub fn register_airline(
        &self,
        requester: &AccountId,
        candidate: &AccountId,
    ) -> Result<Admission, SuretyError> {
        let admission = self.mutate(|state, events| {
            state
                .airlines
                .register(&self.params, requester, candidate, events)
        })?;
        match admission {
            Admission::Registered => {
                tracing::info!(%candidate, %requester, "airline registered");
            }
            Admission::Pending { required_votes } => {
                tracing::info!(%candidate, %requester, required_votes, "airline nominated");
            }
        }
        Ok(admission)
    }

    pub fn vote(
        &self,
        voter: &AccountId,
        candidate: &AccountId,
        approve: bool,
    ) -> Result<VoteTally, SuretyError> {
        let tally = self.mutate(|state, events| {
            state
                .airlines
                .vote(&self.params, voter, candidate, approve, events)
        })?;
        if tally.registered {
            tracing::info!(%candidate, approvals = tally.approvals, "airline registered by vote");
        } else {
            tracing::debug!(
                %candidate,
                %voter,
                approve,
                approvals = tally.approvals,
                required = tally.required,
                "vote recorded"
            );
        }
        Ok(tally)
    }

    /// Contribute funding. Returns the airline's total funding.
    pub fn fund(&self, airline: &AccountId, amount: Amount) -> Result<Amount, SuretyError> {
        let total = self.mutate(|state, events| {
            state.airlines.fund(&self.params, airline, amount, events)
        })?;
        tracing::info!(%airline, %amount, %total, "airline funded");
        Ok(total)
    }

    // -- Flights and insurance -------------------------------------------------

    pub fn register_flight(
        &self,
        airline: &AccountId,
        designator: &str,
        scheduled_at: u64,
    ) -> Result<FlightKey, SuretyError> {
        let key = self.mutate(|state, events| {
            let height = state.height;
            state
                .flights
                .register(&state.airlines, airline, designator, scheduled_at, height, events)
        })?;
        tracing::info!(flight = %key, "flight registered");
        Ok(key)
    }

    pub fn flight_status(&self, key: &FlightKey) -> Result<FlightStatus, SuretyError> {
        self.ledger.read(|s| s.flights.status(key))
    }

    pub fn purchase_insurance(
        &self,
        passenger: &AccountId,
        key: &FlightKey,
        amount: Amount,
    ) -> Result<PolicyId, SuretyError> {
        let policy = self.mutate(|state, events| {
            let height = state.height;
            state
                .pool
                .purchase(&self.params, &state.flights, passenger, key, amount, height, events)
        })?;
        tracing::info!(%passenger, flight = %key, %amount, %policy, "insurance purchased");
        Ok(policy)
    }

    /// Transfer the passenger's credited balance out of the pool.
    pub fn withdraw(&self, passenger: &AccountId) -> Result<Amount, SuretyError> {
        let amount = self.mutate(|state, _| state.pool.debit_balance(passenger))?;

        match self.transfer.transfer(passenger, amount) {
            Ok(()) => {
                self.ledger.transact(|_, events| {
                    events.push(ProtocolEvent::Withdrawn {
                        passenger: passenger.clone(),
                        amount,
                    });
                    Ok(())
                })?;
                tracing::info!(%passenger, %amount, "payout withdrawn");
                Ok(amount)
            }
            Err(err) => {
                self.ledger.transact(|state, _| {
                    state.pool.restore_balance(passenger, amount);
                    Ok(())
                })?;
                tracing::warn!(%passenger, %amount, error = %err, "withdrawal transfer failed, balance restored");
                Err(SuretyError::TransferFailed {
                    passenger: passenger.clone(),
                    reason: err.to_string(),
                })
            }
        }
    }

    // -- Oracles ---------------------------------------------------------------

    /// Register an oracle. Returns its assigned indexes.
    pub fn register_oracle(
        &self,
        candidate: &AccountId,
        fee: Amount,
    ) -> Result<Vec<u8>, SuretyError> {
        let indexes = self.mutate(|state, events| {
            let height = state.height;
            let mut entropy = Entropy::new(self.seeds.as_ref(), &mut state.nonce);
            state
                .oracles
                .register_oracle(&self.params, candidate, fee, &mut entropy, height, events)
        })?;
        tracing::info!(oracle = %candidate, ?indexes, "oracle registered");
        Ok(indexes)
    }

    pub fn get_my_indexes(&self, oracle: &AccountId) -> Result<Vec<u8>, SuretyError> {
        self.ledger.read(|s| s.oracles.indexes_of(oracle))
    }

    /// Open (or return the open) consensus round for a flight.
    pub fn request_flight_status(&self, key: &FlightKey) -> Result<StatusRequest, SuretyError> {
        let request = self.mutate(|state, events| {
            let height = state.height;
            let mut entropy = Entropy::new(self.seeds.as_ref(), &mut state.nonce);
            state
                .oracles
                .request_status(&self.params, &state.flights, key, &mut entropy, height, events)
        })?;
        if request.opened {
            tracing::info!(flight = %key, round = %request.round, index = request.index, "status requested");
        } else {
            tracing::debug!(flight = %key, round = %request.round, "status request already open");
        }
        Ok(request)
    }

    /// Submit an oracle report. Reports for an already-finalized round are
    /// ignored rather than rejected.
    pub fn submit_oracle_response(
        &self,
        oracle: &AccountId,
        index: u8,
        key: &FlightKey,
        status: FlightStatus,
    ) -> Result<ReportOutcome, SuretyError> {
        let result = self.mutate(|state, events| {
            state.oracles.submit_response(
                &self.params,
                &mut state.flights,
                &mut state.pool,
                oracle,
                index,
                key,
                status,
                events,
            )
        });
        match result {
            Ok(outcome @ ResponseOutcome::Finalized { round, status, credited }) => {
                tracing::info!(flight = %key, %round, %status, %credited, "flight resolved");
                Ok(ReportOutcome::Accepted(outcome))
            }
            Ok(outcome) => {
                tracing::debug!(flight = %key, %oracle, %status, "oracle report recorded");
                Ok(ReportOutcome::Accepted(outcome))
            }
            Err(err) if err.is_benign() => {
                tracing::debug!(flight = %key, %oracle, "late oracle report ignored");
                Ok(ReportOutcome::Ignored)
            }
            Err(err) => Err(err),
        }
    }

    // -- Reads -----------------------------------------------------------------

    pub fn airline(&self, airline: &AccountId) -> Option<Airline> {
        self.ledger.read(|s| s.airlines.get(airline).cloned())
    }

    pub fn airlines(&self) -> Vec<Airline> {
        self.ledger.read(|s| s.airlines.iter().cloned().collect())
    }

    pub fn is_airline_registered(&self, airline: &AccountId) -> bool {
        self.ledger.read(|s| s.airlines.is_registered(airline))
    }

    pub fn is_airline_operational(&self, airline: &AccountId) -> bool {
        self.ledger.read(|s| s.airlines.is_operational(airline))
    }

    pub fn airline_funding(&self, airline: &AccountId) -> Result<Amount, SuretyError> {
        self.ledger.read(|s| s.airlines.funding(airline))
    }

    pub fn airline_votes(&self, airline: &AccountId) -> Result<usize, SuretyError> {
        self.ledger.read(|s| s.airlines.vote_count(airline))
    }

    pub fn flight(&self, key: &FlightKey) -> Option<Flight> {
        self.ledger.read(|s| s.flights.get(key).cloned())
    }

    pub fn flights(&self) -> Vec<Flight> {
        self.ledger.read(|s| s.flights.iter().cloned().collect())
    }

    pub fn policies_of(&self, passenger: &AccountId) -> Vec<Policy> {
        self.ledger
            .read(|s| s.pool.policies_of(passenger).cloned().collect())
    }

    pub fn policies_for(&self, key: &FlightKey) -> Vec<Policy> {
        self.ledger.read(|s| s.pool.policies_for(key).cloned().collect())
    }

    /// Credited, not yet withdrawn balance.
    pub fn balance(&self, passenger: &AccountId) -> Amount {
        self.ledger.read(|s| s.pool.balance(passenger))
    }

    pub fn oracle(&self, oracle: &AccountId) -> Option<Oracle> {
        self.ledger.read(|s| s.oracles.oracle(oracle).cloned())
    }

    pub fn oracles(&self) -> Vec<Oracle> {
        self.ledger.read(|s| s.oracles.oracles().cloned().collect())
    }

    pub fn open_round(&self, key: &FlightKey) -> Option<ConsensusRound> {
        self.ledger.read(|s| s.oracles.open_round(key).cloned())
    }

    pub fn last_closed_round(&self, key: &FlightKey) -> Option<ConsensusRound> {
        self.ledger
            .read(|s| s.oracles.last_closed_round(key).cloned())
    }

    pub fn summary(&self) -> LedgerSummary {
        let events = self.ledger.event_count();
        self.ledger.read(|s| LedgerSummary::of(s, events))
    }

    pub fn events_after(&self, after: u64, limit: usize) -> Vec<EventRecord> {
        self.ledger.events_after(after, limit)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }
}
