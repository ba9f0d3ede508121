//! # Oracle Simulator
//!
//! In-process stand-in for the off-ledger oracle network. The simulator
//! subscribes to committed events; on every `OracleRequest` it picks one
//! status and submits it from each simulated oracle holding the request
//! index. Rejected reports are logged and otherwise ignored.

use std::sync::Arc;

use rand::Rng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use surety_core::{AccountId, FlightKey, FlightStatus, ProtocolEvent};
use surety_state::{EventRecord, FlightSurety, ReportOutcome, ResponseOutcome};

/// How simulated oracles choose the status they report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Uniform over the terminal codes (10, 20, 30, 40, 50).
    Random,
    /// Always the same status.
    Fixed(FlightStatus),
}

impl StatusPolicy {
    pub fn pick(&self) -> FlightStatus {
        match self {
            Self::Random => {
                let terminal = &FlightStatus::ALL[1..];
                terminal[rand::thread_rng().gen_range(0..terminal.len())]
            }
            Self::Fixed(status) => *status,
        }
    }
}

/// What happened to one request's reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseTally {
    /// Status the oracles reported.
    pub status: Option<FlightStatus>,
    pub accepted: usize,
    pub ignored: usize,
    pub rejected: usize,
    /// Set when a report finalized the round.
    pub finalized: Option<FlightStatus>,
}

/// Simulated oracle clients.
#[derive(Debug, Clone)]
pub struct OracleSimulator {
    protocol: Arc<FlightSurety>,
    oracles: Vec<AccountId>,
    policy: StatusPolicy,
}

impl OracleSimulator {
    pub fn new(protocol: Arc<FlightSurety>, oracles: Vec<AccountId>, policy: StatusPolicy) -> Self {
        Self {
            protocol,
            oracles,
            policy,
        }
    }

    pub fn oracles(&self) -> &[AccountId] {
        &self.oracles
    }

    /// Answer one status request from every oracle holding `index`.
    pub fn respond(&self, index: u8, key: &FlightKey) -> ResponseTally {
        let status = self.policy.pick();
        let mut tally = ResponseTally {
            status: Some(status),
            ..ResponseTally::default()
        };

        for oracle in &self.oracles {
            let holds = self
                .protocol
                .oracle(oracle)
                .is_some_and(|record| record.holds(index));
            if !holds {
                continue;
            }
            match self
                .protocol
                .submit_oracle_response(oracle, index, key, status)
            {
                Ok(ReportOutcome::Accepted(ResponseOutcome::Finalized { status, .. })) => {
                    tally.accepted += 1;
                    tally.finalized = Some(status);
                }
                Ok(ReportOutcome::Accepted(_)) => tally.accepted += 1,
                Ok(ReportOutcome::Ignored) => tally.ignored += 1,
                Err(e) => {
                    tracing::warn!(%oracle, flight = %key, index, error = %e, "simulated report rejected");
                    tally.rejected += 1;
                }
            }
        }

        tracing::debug!(
            flight = %key,
            index,
            %status,
            accepted = tally.accepted,
            ignored = tally.ignored,
            rejected = tally.rejected,
            "simulated oracles responded"
        );
        tally
    }

    /// Answer every `OracleRequest` read from `events` until the channel closes.
    ///
    /// Reports go through the ledger's blocking lock, so each request is
    /// answered on the blocking pool, one request at a time.
    pub fn spawn(self, mut events: broadcast::Receiver<EventRecord>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(oracles = self.oracles.len(), policy = ?self.policy, "oracle simulator started");
            loop {
                match events.recv().await {
                    Ok(record) => {
                        if let ProtocolEvent::OracleRequest { index, key, .. } = record.event {
                            let simulator = self.clone();
                            let answered =
                                tokio::task::spawn_blocking(move || simulator.respond(index, &key)).await;
                            if let Err(e) = answered {
                                tracing::warn!(error = %e, "simulated oracle responses aborted");
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "oracle simulator lagged behind the event feed");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::info!("oracle simulator stopped");
        })
    }
}
