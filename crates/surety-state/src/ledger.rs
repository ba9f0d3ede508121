//! # Ledger
//!
//! Single-writer transactional store for the whole protocol state.
//!
//! Every operation runs through [`Ledger::transact`]: the closure receives a
//! cloned working copy of [`LedgerState`] and an event buffer. If it returns
//! `Ok`, the copy replaces the committed state, the height advances, and the
//! buffered events are appended to the log and handed to every subscribed
//! [`EventSink`]. If it returns `Err`, the copy and the buffer are dropped,
//! so a failed operation never leaves partial state behind. The working copy
//! is a full clone, so each operation costs time proportional to the total
//! state size (airlines, flights, policies, oracles and rounds).
//!
//! The lock is a `parking_lot::Mutex` held for the whole closure, which gives
//! every check-and-update (vote thresholds, duplicate responses, balances)
//! one global serialized order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use surety_core::{AccountId, ProtocolEvent, SuretyError};

use crate::airline::AirlineRegistry;
use crate::flight::FlightRegistry;
use crate::insurance::InsurancePool;
use crate::oracle::OracleCoordinator;

// -- State --------------------------------------------------------------------

/// The complete persisted protocol state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Contract owner, the implicitly admitted first airline.
    pub owner: AccountId,
    /// Cleared while the owner has paused the protocol.
    pub operational: bool,
    /// Number of committed operations.
    pub height: u64,
    /// Seed derivation counter.
    pub nonce: u64,
    pub airlines: AirlineRegistry,
    pub flights: FlightRegistry,
    pub pool: InsurancePool,
    pub oracles: OracleCoordinator,
}

impl LedgerState {
    /// Fresh state with `owner` registered as the first airline.
    pub fn genesis(owner: AccountId) -> Self {
        Self {
            airlines: AirlineRegistry::with_owner(owner.clone()),
            owner,
            operational: true,
            height: 0,
            nonce: 0,
            flights: FlightRegistry::default(),
            pool: InsurancePool::default(),
            oracles: OracleCoordinator::default(),
        }
    }
}

/// A committed event with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// 1-based position in the event log.
    pub sequence: u64,
    /// Height of the operation that emitted the event.
    pub height: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: ProtocolEvent,
}

/// Receives committed events.
///
/// Called while the ledger lock is held so subscribers observe events in
/// commit order. Implementations must not call back into the ledger.
pub trait EventSink: Send + Sync {
    fn publish(&self, record: &EventRecord);
}

/// Serializable copy of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub taken_at: DateTime<Utc>,
    pub state: LedgerState,
    pub events: Vec<EventRecord>,
}

impl LedgerSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// -- Ledger -------------------------------------------------------------------

struct Inner {
    state: LedgerState,
    log: Vec<EventRecord>,
}

/// Mutex-protected protocol state with an append-only event log.
pub struct Ledger {
    inner: Mutex<Inner>,
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Ledger")
            .field("height", &inner.state.height)
            .field("events", &inner.log.len())
            .field("sinks", &self.sinks.read().len())
            .finish()
    }
}

impl Ledger {
    /// Start a ledger at genesis.
    pub fn new(owner: AccountId) -> Self {
        Self::from_state(LedgerState::genesis(owner), Vec::new())
    }

    /// Resume from a snapshot.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self::from_state(snapshot.state, snapshot.events)
    }

    fn from_state(state: LedgerState, log: Vec<EventRecord>) -> Self {
        Self {
            inner: Mutex::new(Inner { state, log }),
            sinks: RwLock::new(Vec::new()),
        }
    }

    /// Register a sink for events committed from now on.
    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().push(sink);
    }

    /// Run `f` against a working copy and commit it only on success.
    pub fn transact<R>(
        &self,
        f: impl FnOnce(&mut LedgerState, &mut Vec<ProtocolEvent>) -> Result<R, SuretyError>,
    ) -> Result<R, SuretyError> {
        let mut inner = self.inner.lock();
        let mut working = inner.state.clone();
        let mut events = Vec::new();
        let value = f(&mut working, &mut events)?;

        let height = working.height;
        working.height += 1;
        inner.state = working;

        let recorded_at = Utc::now();
        let first = inner.log.len() as u64 + 1;
        let records: Vec<EventRecord> = events
            .into_iter()
            .enumerate()
            .map(|(i, event)| EventRecord {
                sequence: first + i as u64,
                height,
                recorded_at,
                event,
            })
            .collect();
        let sinks = self.sinks.read();
        for record in &records {
            for sink in sinks.iter() {
                sink.publish(record);
            }
        }
        inner.log.extend(records);
        Ok(value)
    }

    /// Read the committed state.
    pub fn read<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> R {
        f(&self.inner.lock().state)
    }

    /// Number of committed operations.
    pub fn height(&self) -> u64 {
        self.inner.lock().state.height
    }

    /// Up to `limit` events with a sequence number greater than `after`.
    pub fn events_after(&self, after: u64, limit: usize) -> Vec<EventRecord> {
        let inner = self.inner.lock();
        let start = usize::try_from(after).unwrap_or(usize::MAX).min(inner.log.len());
        inner.log[start..].iter().take(limit).cloned().collect()
    }

    /// Total events in the log.
    pub fn event_count(&self) -> u64 {
        self.inner.lock().log.len() as u64
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let inner = self.inner.lock();
        LedgerSnapshot {
            taken_at: Utc::now(),
            state: inner.state.clone(),
            events: inner.log.clone(),
        }
    }
}
