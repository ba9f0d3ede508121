//! # Protocol Scenarios
//!
//! End-to-end flows through `FlightSurety`: airline admission by vote,
//! policy sales, oracle consensus, payout crediting and withdrawal.

use std::sync::Arc;
use std::thread;

use surety_core::{AccountId, Amount, FlightKey, FlightStatus, ProtocolParams, SuretyError};
use surety_state::{
    Admission, FlightSurety, KeyedSeedSource, RecordingTransfer, ReportOutcome, ResponseOutcome,
};

// =========================================================================
// Fixtures
// =========================================================================

fn account(s: &str) -> AccountId {
    AccountId::new(s).unwrap()
}

fn deploy_with(params: ProtocolParams) -> (FlightSurety, Arc<RecordingTransfer>) {
    let transfer = Arc::new(RecordingTransfer::new());
    let protocol = FlightSurety::new(
        account("A1"),
        params,
        Arc::new(KeyedSeedSource::new([11; 32])),
        transfer.clone(),
    )
    .unwrap();
    (protocol, transfer)
}

/// Index range equal to the per-oracle count, so every oracle holds every
/// index and any request reaches all of them.
fn deploy() -> (FlightSurety, Arc<RecordingTransfer>) {
    deploy_with(ProtocolParams {
        index_range: 3,
        ..ProtocolParams::default()
    })
}

/// Funded owner, one flight, five oracles.
fn flight_with_oracles(protocol: &FlightSurety) -> (FlightKey, Vec<AccountId>) {
    protocol.fund(&account("A1"), Amount::units(10)).unwrap();
    let key = protocol
        .register_flight(&account("A1"), "NY9200", 1_700_000_000)
        .unwrap();
    let oracles: Vec<AccountId> = (1..=5).map(|i| account(&format!("oracle-{i}"))).collect();
    for oracle in &oracles {
        protocol.register_oracle(oracle, Amount::units(1)).unwrap();
    }
    (key, oracles)
}

fn report(
    protocol: &FlightSurety,
    oracle: &AccountId,
    index: u8,
    key: &FlightKey,
    status: FlightStatus,
) -> ReportOutcome {
    protocol
        .submit_oracle_response(oracle, index, key, status)
        .unwrap()
}

// =========================================================================
// Airline admission
// =========================================================================

#[test]
fn fifth_airline_flips_on_second_vote() {
    let (protocol, _) = deploy();
    let a1 = account("A1");
    for name in ["A2", "A3", "A4"] {
        assert_eq!(
            protocol.register_airline(&a1, &account(name)).unwrap(),
            Admission::Registered
        );
    }

    let a5 = account("A5");
    assert_eq!(
        protocol.register_airline(&a1, &a5).unwrap(),
        Admission::Pending { required_votes: 2 }
    );
    assert!(!protocol.is_airline_registered(&a5));

    let first = protocol.vote(&account("A2"), &a5, true).unwrap();
    assert_eq!((first.approvals, first.required, first.registered), (1, 2, false));
    assert!(!protocol.is_airline_registered(&a5));

    let second = protocol.vote(&account("A3"), &a5, true).unwrap();
    assert!(second.registered);
    assert!(protocol.is_airline_registered(&a5));
    // Registered but unfunded.
    assert!(!protocol.is_airline_operational(&a5));
}

#[test]
fn double_vote_is_not_double_counted() {
    let (protocol, _) = deploy();
    let a1 = account("A1");
    for name in ["A2", "A3", "A4", "A5"] {
        protocol.register_airline(&a1, &account(name)).unwrap();
    }
    let a2 = account("A2");
    protocol.vote(&a2, &account("A5"), true).unwrap();
    let err = protocol.vote(&a2, &account("A5"), true).unwrap_err();
    assert!(matches!(err, SuretyError::AlreadyVoted { .. }));
    assert_eq!(protocol.airline_votes(&account("A5")).unwrap(), 1);
    assert!(!protocol.is_airline_registered(&account("A5")));
}

#[test]
fn vote_threshold_grows_with_the_registry() {
    let (protocol, _) = deploy();
    let a1 = account("A1");
    for name in ["A2", "A3", "A4"] {
        protocol.register_airline(&a1, &account(name)).unwrap();
    }
    // 4 registered → 2 votes; 5 registered → 3 votes.
    protocol.register_airline(&a1, &account("A5")).unwrap();
    protocol.vote(&account("A2"), &account("A5"), true).unwrap();
    protocol.vote(&account("A3"), &account("A5"), true).unwrap();

    assert_eq!(
        protocol.register_airline(&a1, &account("A6")).unwrap(),
        Admission::Pending { required_votes: 3 }
    );
}

#[test]
fn underfunding_has_no_effect() {
    let (protocol, _) = deploy();
    let a1 = account("A1");
    let err = protocol.fund(&a1, Amount::units(9)).unwrap_err();
    assert!(matches!(err, SuretyError::InsufficientFunds(_)));
    assert!(protocol.airline_funding(&a1).unwrap().is_zero());
    assert!(!protocol.is_airline_operational(&a1));

    let err = protocol.register_flight(&a1, "NY9200", 1).unwrap_err();
    assert!(matches!(err, SuretyError::NotOperational(_)));

    protocol.fund(&a1, Amount::units(10)).unwrap();
    assert!(protocol.is_airline_operational(&a1));
    let key = protocol.register_flight(&a1, "NY9200", 1).unwrap();
    assert_eq!(protocol.flight_status(&key).unwrap(), FlightStatus::Unknown);
}

// =========================================================================
// Insurance and consensus
// =========================================================================

#[test]
fn late_airline_pays_one_and_a_half_times_the_premium() {
    let (protocol, transfer) = deploy();
    let (key, oracles) = flight_with_oracles(&protocol);
    let passenger = account("passenger-1");
    protocol
        .purchase_insurance(&passenger, &key, Amount::fraction(1, 2))
        .unwrap();

    let request = protocol.request_flight_status(&key).unwrap();
    for oracle in &oracles[..2] {
        assert!(matches!(
            report(&protocol, oracle, request.index, &key, FlightStatus::LateAirline),
            ReportOutcome::Accepted(ResponseOutcome::Recorded { .. })
        ));
    }
    match report(&protocol, &oracles[2], request.index, &key, FlightStatus::LateAirline) {
        ReportOutcome::Accepted(ResponseOutcome::Finalized { status, credited, .. }) => {
            assert_eq!(status, FlightStatus::LateAirline);
            assert_eq!(credited, Amount::fraction(3, 4));
        }
        other => panic!("expected finalization, got {other:?}"),
    }

    assert_eq!(protocol.flight_status(&key).unwrap(), FlightStatus::LateAirline);
    assert_eq!(protocol.balance(&passenger), Amount::fraction(3, 4));
    assert!(protocol.policies_of(&passenger)[0].claimed);

    assert_eq!(protocol.withdraw(&passenger).unwrap(), Amount::fraction(3, 4));
    assert_eq!(transfer.total_to(&passenger), Amount::fraction(3, 4));
    assert!(matches!(
        protocol.withdraw(&passenger).unwrap_err(),
        SuretyError::InsufficientFunds(_)
    ));
}

#[test]
fn fourth_report_is_a_no_op() {
    let (protocol, _) = deploy();
    let (key, oracles) = flight_with_oracles(&protocol);
    let passenger = account("passenger-1");
    protocol
        .purchase_insurance(&passenger, &key, Amount::fraction(1, 2))
        .unwrap();
    let request = protocol.request_flight_status(&key).unwrap();
    for oracle in &oracles[..3] {
        report(&protocol, oracle, request.index, &key, FlightStatus::LateAirline);
    }
    let height = protocol.summary().height;

    assert_eq!(
        report(&protocol, &oracles[3], request.index, &key, FlightStatus::OnTime),
        ReportOutcome::Ignored
    );
    assert_eq!(protocol.flight_status(&key).unwrap(), FlightStatus::LateAirline);
    assert_eq!(protocol.balance(&passenger), Amount::fraction(3, 4));
    assert_eq!(protocol.summary().height, height);
}

#[test]
fn split_reports_keep_the_round_open() {
    let (protocol, _) = deploy();
    let (key, oracles) = flight_with_oracles(&protocol);
    let request = protocol.request_flight_status(&key).unwrap();

    report(&protocol, &oracles[0], request.index, &key, FlightStatus::OnTime);
    report(&protocol, &oracles[1], request.index, &key, FlightStatus::OnTime);
    report(&protocol, &oracles[2], request.index, &key, FlightStatus::LateWeather);
    report(&protocol, &oracles[3], request.index, &key, FlightStatus::LateWeather);

    assert_eq!(protocol.flight_status(&key).unwrap(), FlightStatus::Unknown);
    let round = protocol.open_round(&key).unwrap();
    assert_eq!(round.matching(FlightStatus::OnTime), 2);
    assert_eq!(round.matching(FlightStatus::LateWeather), 2);

    // A fifth report breaks the tie.
    report(&protocol, &oracles[4], request.index, &key, FlightStatus::LateWeather);
    assert_eq!(protocol.flight_status(&key).unwrap(), FlightStatus::LateWeather);
    assert!(protocol.open_round(&key).is_none());
}

#[test]
fn on_time_leaves_policies_unclaimed() {
    let (protocol, _) = deploy();
    let (key, oracles) = flight_with_oracles(&protocol);
    let passenger = account("passenger-1");
    protocol
        .purchase_insurance(&passenger, &key, Amount::units(1))
        .unwrap();
    let request = protocol.request_flight_status(&key).unwrap();
    for oracle in &oracles[..3] {
        report(&protocol, oracle, request.index, &key, FlightStatus::OnTime);
    }
    assert_eq!(protocol.flight_status(&key).unwrap(), FlightStatus::OnTime);
    assert!(protocol.balance(&passenger).is_zero());
    assert!(!protocol.policies_for(&key)[0].claimed);
}

#[test]
fn purchase_limits() {
    let (protocol, _) = deploy();
    let (key, _) = flight_with_oracles(&protocol);
    let passenger = account("passenger-1");

    let err = protocol
        .purchase_insurance(&passenger, &key, Amount::fraction(3, 2))
        .unwrap_err();
    assert!(matches!(err, SuretyError::CapExceeded { .. }));

    let ghost = FlightKey::new(account("A1"), "ZZ0001", 1).unwrap();
    let err = protocol
        .purchase_insurance(&passenger, &ghost, Amount::fraction(1, 2))
        .unwrap_err();
    assert!(matches!(err, SuretyError::UnknownFlight(_)));
    assert!(protocol.policies_of(&passenger).is_empty());
}

#[test]
fn failed_transfer_restores_the_balance() {
    let (protocol, transfer) = deploy();
    let (key, oracles) = flight_with_oracles(&protocol);
    let passenger = account("passenger-1");
    protocol
        .purchase_insurance(&passenger, &key, Amount::fraction(1, 2))
        .unwrap();
    let request = protocol.request_flight_status(&key).unwrap();
    for oracle in &oracles[..3] {
        report(&protocol, oracle, request.index, &key, FlightStatus::LateAirline);
    }

    transfer.set_failure(Some("recipient rejected"));
    let err = protocol.withdraw(&passenger).unwrap_err();
    assert!(matches!(err, SuretyError::TransferFailed { .. }));
    assert_eq!(protocol.balance(&passenger), Amount::fraction(3, 4));

    transfer.set_failure(None);
    assert_eq!(protocol.withdraw(&passenger).unwrap(), Amount::fraction(3, 4));
}

#[test]
fn stale_round_is_replaced() {
    let (protocol, _) = deploy_with(ProtocolParams {
        index_range: 3,
        stale_round_after: Some(2),
        ..ProtocolParams::default()
    });
    let (key, oracles) = flight_with_oracles(&protocol);
    let first = protocol.request_flight_status(&key).unwrap();
    report(&protocol, &oracles[0], first.index, &key, FlightStatus::OnTime);
    report(&protocol, &oracles[1], first.index, &key, FlightStatus::OnTime);

    let second = protocol.request_flight_status(&key).unwrap();
    assert!(second.opened);
    assert_ne!(second.round, first.round);
    assert_eq!(protocol.open_round(&key).unwrap().total_responses(), 0);
}

#[test]
fn late_report_with_foreign_index_is_an_error_not_a_no_op() {
    let (protocol, _) = deploy();
    let (key, oracles) = flight_with_oracles(&protocol);
    let request = protocol.request_flight_status(&key).unwrap();
    for oracle in &oracles[..3] {
        report(&protocol, oracle, request.index, &key, FlightStatus::OnTime);
    }

    let other = (request.index + 1) % 3;
    let err = protocol
        .submit_oracle_response(&oracles[3], other, &key, FlightStatus::OnTime)
        .unwrap_err();
    assert!(matches!(err, SuretyError::InvalidIndex { index, .. } if index == other));
    assert_eq!(
        report(&protocol, &oracles[3], request.index, &key, FlightStatus::OnTime),
        ReportOutcome::Ignored
    );
}

// =========================================================================
// Concurrent callers
// =========================================================================

#[test]
fn concurrent_reports_finalize_exactly_once() {
    let (protocol, _) = deploy();
    protocol.fund(&account("A1"), Amount::units(10)).unwrap();
    let key = protocol
        .register_flight(&account("A1"), "NY9200", 1_700_000_000)
        .unwrap();
    let oracles: Vec<AccountId> = (0..16).map(|i| account(&format!("oracle-{i}"))).collect();
    for oracle in &oracles {
        protocol.register_oracle(oracle, Amount::units(1)).unwrap();
    }
    let passenger = account("passenger-1");
    protocol
        .purchase_insurance(&passenger, &key, Amount::fraction(1, 2))
        .unwrap();
    let request = protocol.request_flight_status(&key).unwrap();

    let protocol = Arc::new(protocol);
    let outcomes: Vec<ReportOutcome> = thread::scope(|scope| {
        let handles: Vec<_> = oracles
            .iter()
            .map(|oracle| {
                let protocol = Arc::clone(&protocol);
                let key = key.clone();
                scope.spawn(move || {
                    report(&protocol, oracle, request.index, &key, FlightStatus::LateAirline)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let finalized = outcomes
        .iter()
        .filter(|o| matches!(o, ReportOutcome::Accepted(ResponseOutcome::Finalized { .. })))
        .count();
    let recorded = outcomes
        .iter()
        .filter(|o| matches!(o, ReportOutcome::Accepted(ResponseOutcome::Recorded { .. })))
        .count();
    assert_eq!(finalized, 1);
    assert_eq!(recorded, 2);
    assert_eq!(outcomes.len() - finalized - recorded, 13);
    assert_eq!(protocol.balance(&passenger), Amount::fraction(3, 4));
}

#[test]
fn concurrent_withdrawals_pay_once() {
    let (protocol, transfer) = deploy();
    let (key, oracles) = flight_with_oracles(&protocol);
    let passenger = account("passenger-1");
    protocol
        .purchase_insurance(&passenger, &key, Amount::fraction(1, 2))
        .unwrap();
    let request = protocol.request_flight_status(&key).unwrap();
    for oracle in &oracles[..3] {
        report(&protocol, oracle, request.index, &key, FlightStatus::LateAirline);
    }

    let protocol = Arc::new(protocol);
    let results: Vec<Result<Amount, SuretyError>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let protocol = Arc::clone(&protocol);
                let passenger = passenger.clone();
                scope.spawn(move || protocol.withdraw(&passenger))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let paid: Vec<&Amount> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(paid, vec![&Amount::fraction(3, 4)]);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(SuretyError::InsufficientFunds(_)))));
    assert_eq!(transfer.total_to(&passenger), Amount::fraction(3, 4));
}

#[test]
fn concurrent_votes_admit_once() {
    let (protocol, _) = deploy();
    let a1 = account("A1");
    for name in ["A2", "A3", "A4"] {
        protocol.register_airline(&a1, &account(name)).unwrap();
    }
    let candidate = account("A5");
    protocol.register_airline(&a1, &candidate).unwrap();

    let protocol = Arc::new(protocol);
    let voters = ["A1", "A2", "A3", "A4"].map(account);
    let tallies: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = voters
            .iter()
            .map(|voter| {
                let protocol = Arc::clone(&protocol);
                let candidate = candidate.clone();
                scope.spawn(move || protocol.vote(voter, &candidate, true))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let admitted = tallies
        .iter()
        .filter(|t| matches!(t, Ok(tally) if tally.registered))
        .count();
    assert_eq!(admitted, 1);
    // Votes after admission find the candidate already registered.
    assert!(tallies
        .iter()
        .filter(|t| t.is_err())
        .all(|t| matches!(t, Err(SuretyError::AlreadyRegistered(_)))));
    assert_eq!(protocol.summary().airlines_registered, 5);
}

// =========================================================================
// Operating status
// =========================================================================

#[test]
fn pause_blocks_mutations_but_not_reads() {
    let (protocol, _) = deploy();
    let (key, _) = flight_with_oracles(&protocol);
    let owner = account("A1");

    let err = protocol
        .set_operating_status(&account("oracle-1"), false)
        .unwrap_err();
    assert!(matches!(err, SuretyError::NotAuthorized(_)));

    assert!(protocol.set_operating_status(&owner, false).unwrap());
    assert!(!protocol.set_operating_status(&owner, false).unwrap());
    assert!(matches!(
        protocol.register_airline(&owner, &account("A2")).unwrap_err(),
        SuretyError::ProtocolPaused
    ));
    assert!(matches!(
        protocol
            .purchase_insurance(&account("p"), &key, Amount::fraction(1, 2))
            .unwrap_err(),
        SuretyError::ProtocolPaused
    ));
    assert!(matches!(
        protocol.request_flight_status(&key).unwrap_err(),
        SuretyError::ProtocolPaused
    ));
    assert_eq!(protocol.flight_status(&key).unwrap(), FlightStatus::Unknown);

    assert!(protocol.set_operating_status(&owner, true).unwrap());
    protocol.register_airline(&owner, &account("A2")).unwrap();
}
