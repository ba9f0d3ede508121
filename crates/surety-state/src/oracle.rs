//! # Oracle Coordinator
//!
//! Oracle registration, status requests and threshold consensus.
//!
//! ## Rounds
//!
//! ```text
//!   request_status(key) ──▶ Open { index, buckets } ──report×N──▶ Closed { outcome }
//!          ▲                        │                                  │
//!          └── idempotent while open (unless stale) ◀──────────────────┘ new request
//! ```
//!
//! A round collects reports into one bucket per status code. The first
//! bucket to reach the agreement threshold wins: the round closes, the
//! flight registry records the status and, for `LateAirline`, the insurance
//! pool credits payouts. Buckets that never reach the threshold are dropped
//! with the round.
//!
//! ## Report validation order
//!
//! 1. the reporter is a registered oracle (`NotAuthorized`)
//! 2. the index is one of its assigned indexes (`InvalidIndex`)
//! 3. the status is terminal (`InvalidStatus`)
//! 4. a round is open for the flight (`RequestClosed` when the last round
//!    already finalized, `NoOpenRequest` when none was ever requested)
//! 5. the index equals the round's request index (`InvalidIndex`)
//! 6. the oracle has not reported in this round (`DuplicateResponse`)

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use surety_core::{
    AccountId, Amount, FlightKey, FlightStatus, ProtocolEvent, ProtocolParams, RoundId,
    SuretyError,
};

use crate::flight::FlightRegistry;
use crate::insurance::InsurancePool;
use crate::seed::{draw_index, draw_indexes, Entropy, Seed, SeedDomain};

/// A registered oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Oracle {
    pub id: AccountId,
    /// Assigned indexes, ascending. Immutable once granted.
    pub indexes: Vec<u8>,
    /// Seed the assignment was drawn from.
    pub seed: Seed,
    /// Ledger nonce consumed by the draw.
    pub nonce: u64,
    pub fee: Amount,
    pub registered_at: u64,
}

impl Oracle {
    pub fn holds(&self, index: u8) -> bool {
        self.indexes.contains(&index)
    }
}

/// One consensus round for a flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusRound {
    pub id: RoundId,
    pub key: FlightKey,
    /// Request index; only oracles holding it may report.
    pub index: u8,
    pub seed: Seed,
    pub opened_at: u64,
    /// Status code → oracles that reported it.
    pub responses: BTreeMap<FlightStatus, BTreeSet<AccountId>>,
    /// Winning status once closed.
    pub outcome: Option<FlightStatus>,
}

impl ConsensusRound {
    pub fn is_closed(&self) -> bool {
        self.outcome.is_some()
    }

    /// Whether the oracle already reported any status in this round.
    pub fn has_responded(&self, oracle: &AccountId) -> bool {
        self.responses.values().any(|voters| voters.contains(oracle))
    }

    /// Number of reports matching `status`.
    pub fn matching(&self, status: FlightStatus) -> usize {
        self.responses.get(&status).map_or(0, BTreeSet::len)
    }

    /// Total reports across all buckets.
    pub fn total_responses(&self) -> usize {
        self.responses.values().map(BTreeSet::len).sum()
    }

    fn is_stale(&self, params: &ProtocolParams, height: u64) -> bool {
        params
            .stale_round_after
            .is_some_and(|after| height.saturating_sub(self.opened_at) >= after)
    }
}

/// Result of `request_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequest {
    pub round: RoundId,
    pub index: u8,
    /// `false` when an already-open round was returned.
    pub opened: bool,
}

/// Result of an accepted report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResponseOutcome {
    /// Counted; the round stays open.
    Recorded {
        round: RoundId,
        status: FlightStatus,
        matching: usize,
    },
    /// This report crossed the threshold and closed the round.
    Finalized {
        round: RoundId,
        status: FlightStatus,
        credited: Amount,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleCoordinator {
    oracles: BTreeMap<AccountId, Oracle>,
    open_rounds: BTreeMap<FlightKey, ConsensusRound>,
    /// Most recently closed round per flight.
    closed_rounds: BTreeMap<FlightKey, ConsensusRound>,
    next_round: u64,
    fees_collected: Amount,
}

impl OracleCoordinator {
    /// Register an oracle and draw its index set.
    pub fn register_oracle(
        &mut self,
        params: &ProtocolParams,
        candidate: &AccountId,
        fee: Amount,
        entropy: &mut Entropy<'_>,
        height: u64,
        events: &mut Vec<ProtocolEvent>,
    ) -> Result<Vec<u8>, SuretyError> {
        if self.oracles.contains_key(candidate) {
            return Err(SuretyError::AlreadyRegistered(format!("oracle {candidate}")));
        }
        if fee < params.oracle_registration_fee {
            return Err(SuretyError::InsufficientFunds(format!(
                "registration fee {fee} is below {}",
                params.oracle_registration_fee
            )));
        }

        let (seed, nonce) =
            entropy.next_seed(SeedDomain::OracleAssignment, candidate.as_str().as_bytes());
        let indexes = draw_indexes(seed, params.indexes_per_oracle, params.index_range);
        self.oracles.insert(
            candidate.clone(),
            Oracle {
                id: candidate.clone(),
                indexes: indexes.clone(),
                seed,
                nonce,
                fee,
                registered_at: height,
            },
        );
        self.fees_collected = self.fees_collected.saturating_add(fee);
        events.push(ProtocolEvent::OracleRegistered {
            oracle: candidate.clone(),
            indexes: indexes.clone(),
        });
        Ok(indexes)
    }

    /// Open a round for `key`, or return the one already open.
    pub fn request_status(
        &mut self,
        params: &ProtocolParams,
        flights: &FlightRegistry,
        key: &FlightKey,
        entropy: &mut Entropy<'_>,
        height: u64,
        events: &mut Vec<ProtocolEvent>,
    ) -> Result<StatusRequest, SuretyError> {
        flights.ensure_exists(key)?;
        if let Some(open) = self.open_rounds.get(key) {
            if !open.is_stale(params, height) {
                return Ok(StatusRequest {
                    round: open.id,
                    index: open.index,
                    opened: false,
                });
            }
            tracing::info!(
                flight = %key,
                round = %open.id,
                reports = open.total_responses(),
                "replacing stale consensus round"
            );
        }

        self.next_round += 1;
        let round = RoundId(self.next_round);
        let (seed, _) = entropy.next_seed(SeedDomain::StatusRequest, &key.seed_material());
        let index = draw_index(seed, params.index_range);
        self.open_rounds.insert(
            key.clone(),
            ConsensusRound {
                id: round,
                key: key.clone(),
                index,
                seed,
                opened_at: height,
                responses: BTreeMap::new(),
                outcome: None,
            },
        );
        events.push(ProtocolEvent::OracleRequest {
            index,
            key: key.clone(),
            round,
        });
        Ok(StatusRequest {
            round,
            index,
            opened: true,
        })
    }

    /// Validate and count one oracle report, finalizing the round when the
    /// agreement threshold is reached.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_response(
        &mut self,
        params: &ProtocolParams,
        flights: &mut FlightRegistry,
        pool: &mut InsurancePool,
        oracle: &AccountId,
        index: u8,
        key: &FlightKey,
        status: FlightStatus,
        events: &mut Vec<ProtocolEvent>,
    ) -> Result<ResponseOutcome, SuretyError> {
        let record = self.oracles.get(oracle).ok_or_else(|| {
            SuretyError::NotAuthorized(format!("{oracle} is not a registered oracle"))
        })?;
        if !record.holds(index) {
            return Err(SuretyError::InvalidIndex {
                index,
                reason: format!("not assigned to {oracle}"),
            });
        }
        if !status.is_terminal() {
            return Err(SuretyError::InvalidStatus(status));
        }

        let Some(round) = self.open_rounds.get_mut(key) else {
            return Err(match self.closed_rounds.get(key) {
                Some(closed) if closed.index != index => SuretyError::InvalidIndex {
                    index,
                    reason: format!("{} expects index {}", closed.id, closed.index),
                },
                Some(_) => SuretyError::RequestClosed(key.clone()),
                None => SuretyError::NoOpenRequest(key.clone()),
            });
        };
        if round.index != index {
            return Err(SuretyError::InvalidIndex {
                index,
                reason: format!("{} expects index {}", round.id, round.index),
            });
        }
        if round.has_responded(oracle) {
            return Err(SuretyError::DuplicateResponse {
                oracle: oracle.clone(),
                key: key.clone(),
            });
        }

        round
            .responses
            .entry(status)
            .or_default()
            .insert(oracle.clone());
        let matching = round.matching(status);
        let round_id = round.id;
        events.push(ProtocolEvent::OracleReport {
            oracle: oracle.clone(),
            key: key.clone(),
            status,
            matching,
        });
        if matching < params.agreement_threshold {
            return Ok(ResponseOutcome::Recorded {
                round: round_id,
                status,
                matching,
            });
        }

        if let Some(mut closed) = self.open_rounds.remove(key) {
            closed.outcome = Some(status);
            self.closed_rounds.insert(key.clone(), closed);
        }
        let credited = if flights.resolve(key, status, round_id)? {
            events.push(ProtocolEvent::FlightResolved {
                key: key.clone(),
                status,
                round: round_id,
            });
            pool.credit_payout(params, key, status, events)?
        } else {
            Amount::ZERO
        };
        Ok(ResponseOutcome::Finalized {
            round: round_id,
            status,
            credited,
        })
    }

    pub fn oracle(&self, oracle: &AccountId) -> Option<&Oracle> {
        self.oracles.get(oracle)
    }

    /// Assigned indexes of a registered oracle.
    pub fn indexes_of(&self, oracle: &AccountId) -> Result<Vec<u8>, SuretyError> {
        self.oracles
            .get(oracle)
            .map(|o| o.indexes.clone())
            .ok_or_else(|| SuretyError::NotAuthorized(format!("{oracle} is not a registered oracle")))
    }

    pub fn open_round(&self, key: &FlightKey) -> Option<&ConsensusRound> {
        self.open_rounds.get(key)
    }

    pub fn last_closed_round(&self, key: &FlightKey) -> Option<&ConsensusRound> {
        self.closed_rounds.get(key)
    }

    pub fn open_rounds(&self) -> impl Iterator<Item = &ConsensusRound> {
        self.open_rounds.values()
    }

    pub fn oracles(&self) -> impl Iterator<Item = &Oracle> {
        self.oracles.values()
    }

    pub fn oracle_count(&self) -> usize {
        self.oracles.len()
    }

    pub fn fees_collected(&self) -> Amount {
        self.fees_collected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airline::AirlineRegistry;
    use crate::seed::KeyedSeedSource;

    fn id(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    /// Every oracle holds all three indexes, so any oracle may answer.
    fn full_coverage() -> ProtocolParams {
        ProtocolParams {
            index_range: 3,
            ..ProtocolParams::default()
        }
    }

    struct Fixture {
        params: ProtocolParams,
        source: KeyedSeedSource,
        nonce: u64,
        flights: FlightRegistry,
        pool: InsurancePool,
        coordinator: OracleCoordinator,
        key: FlightKey,
        events: Vec<ProtocolEvent>,
    }

    impl Fixture {
        fn new(params: ProtocolParams, oracles: usize) -> Self {
            let mut events = Vec::new();
            let mut airlines = AirlineRegistry::with_owner(id("a1"));
            airlines.fund(&params, &id("a1"), Amount::units(10), &mut events).unwrap();
            let mut flights = FlightRegistry::default();
            let key = flights
                .register(&airlines, &id("a1"), "NY9200", 1_000, 0, &mut events)
                .unwrap();
            let mut fixture = Self {
                params,
                source: KeyedSeedSource::new([3u8; 32]),
                nonce: 0,
                flights,
                pool: InsurancePool::default(),
                coordinator: OracleCoordinator::default(),
                key,
                events,
            };
            for i in 0..oracles {
                fixture.register(&format!("o{i}")).unwrap();
            }
            fixture
        }

        fn register(&mut self, oracle: &str) -> Result<Vec<u8>, SuretyError> {
            let mut entropy = Entropy::new(&self.source, &mut self.nonce);
            self.coordinator.register_oracle(
                &self.params,
                &id(oracle),
                Amount::units(1),
                &mut entropy,
                0,
                &mut self.events,
            )
        }

        fn request(&mut self, height: u64) -> StatusRequest {
            let mut entropy = Entropy::new(&self.source, &mut self.nonce);
            self.coordinator
                .request_status(
                    &self.params,
                    &self.flights,
                    &self.key,
                    &mut entropy,
                    height,
                    &mut self.events,
                )
                .unwrap()
        }

        fn report(
            &mut self,
            oracle: &str,
            index: u8,
            status: FlightStatus,
        ) -> Result<ResponseOutcome, SuretyError> {
            let key = self.key.clone();
            self.coordinator.submit_response(
                &self.params,
                &mut self.flights,
                &mut self.pool,
                &id(oracle),
                index,
                &key,
                status,
                &mut self.events,
            )
        }
    }

    #[test]
    fn registration_assigns_three_distinct_indexes() {
        let mut f = Fixture::new(ProtocolParams::default(), 0);
        let indexes = f.register("o1").unwrap();
        assert_eq!(indexes.len(), 3);
        assert!(indexes.windows(2).all(|w| w[0] < w[1]));
        assert!(indexes.iter().all(|i| *i < 10));
        assert_eq!(f.coordinator.indexes_of(&id("o1")).unwrap(), indexes);

        let record = f.coordinator.oracle(&id("o1")).unwrap();
        assert_eq!(draw_indexes(record.seed, 3, 10), indexes);
    }

    #[test]
    fn registration_rejects_low_fee_and_duplicates() {
        let mut f = Fixture::new(ProtocolParams::default(), 1);
        assert!(matches!(f.register("o0"), Err(SuretyError::AlreadyRegistered(_))));
        let mut entropy = Entropy::new(&f.source, &mut f.nonce);
        let err = f
            .coordinator
            .register_oracle(
                &f.params,
                &id("cheap"),
                Amount::fraction(1, 2),
                &mut entropy,
                0,
                &mut f.events,
            )
            .unwrap_err();
        assert!(matches!(err, SuretyError::InsufficientFunds(_)));
        assert_eq!(f.coordinator.oracle_count(), 1);
    }

    #[test]
    fn request_is_idempotent_while_open() {
        let mut f = Fixture::new(full_coverage(), 0);
        let first = f.request(1);
        assert!(first.opened);
        let again = f.request(2);
        assert_eq!(again.round, first.round);
        assert_eq!(again.index, first.index);
        assert!(!again.opened);
    }

    #[test]
    fn request_for_unknown_flight_fails() {
        let mut f = Fixture::new(full_coverage(), 0);
        f.key = FlightKey::new(id("a1"), "ZZ0001", 9).unwrap();
        let mut entropy = Entropy::new(&f.source, &mut f.nonce);
        assert!(matches!(
            f.coordinator.request_status(
                &f.params,
                &f.flights,
                &f.key,
                &mut entropy,
                1,
                &mut f.events
            ),
            Err(SuretyError::UnknownFlight(_))
        ));
    }

    #[test]
    fn three_matching_reports_finalize() {
        let mut f = Fixture::new(full_coverage(), 4);
        let req = f.request(1);
        for (i, oracle) in ["o0", "o1"].into_iter().enumerate() {
            let outcome = f.report(oracle, req.index, FlightStatus::OnTime).unwrap();
            assert_eq!(
                outcome,
                ResponseOutcome::Recorded {
                    round: req.round,
                    status: FlightStatus::OnTime,
                    matching: i + 1
                }
            );
        }
        let outcome = f.report("o2", req.index, FlightStatus::OnTime).unwrap();
        assert_eq!(
            outcome,
            ResponseOutcome::Finalized {
                round: req.round,
                status: FlightStatus::OnTime,
                credited: Amount::ZERO
            }
        );
        assert_eq!(f.flights.status(&f.key).unwrap(), FlightStatus::OnTime);
        assert!(f.coordinator.open_round(&f.key).is_none());
        assert!(f.coordinator.last_closed_round(&f.key).unwrap().is_closed());

        // Late fourth report is benign and changes nothing.
        assert_eq!(
            f.report("o3", req.index, FlightStatus::LateAirline),
            Err(SuretyError::RequestClosed(f.key.clone()))
        );
        assert_eq!(f.flights.status(&f.key).unwrap(), FlightStatus::OnTime);
    }

    #[test]
    fn split_votes_leave_round_open() {
        let mut f = Fixture::new(full_coverage(), 4);
        let req = f.request(1);
        f.report("o0", req.index, FlightStatus::LateAirline).unwrap();
        f.report("o1", req.index, FlightStatus::LateAirline).unwrap();
        f.report("o2", req.index, FlightStatus::LateWeather).unwrap();
        f.report("o3", req.index, FlightStatus::LateWeather).unwrap();
        let round = f.coordinator.open_round(&f.key).unwrap();
        assert!(!round.is_closed());
        assert_eq!(round.total_responses(), 4);
        assert_eq!(f.flights.status(&f.key).unwrap(), FlightStatus::Unknown);
    }

    #[test]
    fn validation_order() {
        let mut f = Fixture::new(ProtocolParams::default(), 1);
        let held = f.coordinator.indexes_of(&id("o0")).unwrap();
        let not_held = (0..10).find(|i| !held.contains(i)).unwrap();

        assert!(matches!(
            f.report("stranger", held[0], FlightStatus::OnTime),
            Err(SuretyError::NotAuthorized(_))
        ));
        assert!(matches!(
            f.report("o0", not_held, FlightStatus::OnTime),
            Err(SuretyError::InvalidIndex { .. })
        ));
        assert_eq!(
            f.report("o0", held[0], FlightStatus::Unknown),
            Err(SuretyError::InvalidStatus(FlightStatus::Unknown))
        );
        assert_eq!(
            f.report("o0", held[0], FlightStatus::OnTime),
            Err(SuretyError::NoOpenRequest(f.key.clone()))
        );
    }

    #[test]
    fn late_report_with_wrong_index_is_rejected() {
        let mut f = Fixture::new(full_coverage(), 4);
        let req = f.request(1);
        for o in ["o0", "o1", "o2"] {
            f.report(o, req.index, FlightStatus::OnTime).unwrap();
        }
        let other = (req.index + 1) % 3;
        assert!(matches!(
            f.report("o3", other, FlightStatus::OnTime),
            Err(SuretyError::InvalidIndex { index, .. }) if index == other
        ));
        assert_eq!(
            f.report("o3", req.index, FlightStatus::OnTime),
            Err(SuretyError::RequestClosed(f.key.clone()))
        );
    }

    #[test]
    fn index_must_match_round() {
        let mut f = Fixture::new(full_coverage(), 1);
        let req = f.request(1);
        let other = (req.index + 1) % 3;
        assert!(matches!(
            f.report("o0", other, FlightStatus::OnTime),
            Err(SuretyError::InvalidIndex { index, .. }) if index == other
        ));
    }

    #[test]
    fn duplicate_report_rejected_even_with_new_status() {
        let mut f = Fixture::new(full_coverage(), 1);
        let req = f.request(1);
        f.report("o0", req.index, FlightStatus::OnTime).unwrap();
        assert!(matches!(
            f.report("o0", req.index, FlightStatus::LateOther),
            Err(SuretyError::DuplicateResponse { .. })
        ));
        assert_eq!(f.coordinator.open_round(&f.key).unwrap().total_responses(), 1);
    }

    #[test]
    fn new_request_after_close_opens_new_round() {
        let mut f = Fixture::new(full_coverage(), 3);
        let first = f.request(1);
        for o in ["o0", "o1", "o2"] {
            f.report(o, first.index, FlightStatus::LateOther).unwrap();
        }
        let second = f.request(5);
        assert!(second.opened);
        assert!(second.round > first.round);
        for o in ["o0", "o1", "o2"] {
            f.report(o, second.index, FlightStatus::OnTime).unwrap();
        }
        assert_eq!(f.flights.status(&f.key).unwrap(), FlightStatus::OnTime);
    }

    #[test]
    fn stale_round_is_replaced_and_buckets_discarded() {
        let params = ProtocolParams {
            stale_round_after: Some(10),
            ..full_coverage()
        };
        let mut f = Fixture::new(params, 3);
        let first = f.request(1);
        f.report("o0", first.index, FlightStatus::LateAirline).unwrap();
        f.report("o1", first.index, FlightStatus::LateAirline).unwrap();

        assert!(!f.request(5).opened);
        let replaced = f.request(11);
        assert!(replaced.opened);
        assert_ne!(replaced.round, first.round);
        assert_eq!(f.coordinator.open_round(&f.key).unwrap().total_responses(), 0);
    }

    #[test]
    fn rounds_never_go_stale_by_default() {
        let mut f = Fixture::new(full_coverage(), 0);
        let first = f.request(1);
        assert_eq!(f.request(1_000_000).round, first.round);
    }
}
