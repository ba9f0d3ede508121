//! # Flight Registry
//!
//! Registered flights and their resolved status. A flight is created with
//! status `Unknown` by an operational airline and updated only by the oracle
//! coordinator when a consensus round finalizes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use surety_core::{AccountId, FlightKey, FlightStatus, ProtocolEvent, RoundId, SuretyError};

use crate::airline::AirlineRegistry;

/// A registered flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub key: FlightKey,
    pub status: FlightStatus,
    /// Ledger height at which the flight was registered.
    pub registered_at: u64,
    /// Round that produced the current status, if any.
    pub resolved_in: Option<RoundId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRegistry {
    flights: BTreeMap<FlightKey, Flight>,
}

impl FlightRegistry {
    /// Register a flight for an operational airline.
    pub fn register(
        &mut self,
        airlines: &AirlineRegistry,
        airline: &AccountId,
        designator: &str,
        scheduled_at: u64,
        height: u64,
        events: &mut Vec<ProtocolEvent>,
    ) -> Result<FlightKey, SuretyError> {
        if !airlines.is_operational(airline) {
            return Err(SuretyError::NotOperational(airline.clone()));
        }
        let key = FlightKey::new(airline.clone(), designator, scheduled_at)?;
        if self.flights.contains_key(&key) {
            return Err(SuretyError::AlreadyRegistered(format!("flight {key}")));
        }
        self.flights.insert(
            key.clone(),
            Flight {
                key: key.clone(),
                status: FlightStatus::Unknown,
                registered_at: height,
                resolved_in: None,
            },
        );
        events.push(ProtocolEvent::FlightRegistered { key: key.clone() });
        Ok(key)
    }

    /// Current status of a flight.
    pub fn status(&self, key: &FlightKey) -> Result<FlightStatus, SuretyError> {
        self.flights
            .get(key)
            .map(|f| f.status)
            .ok_or_else(|| SuretyError::UnknownFlight(key.clone()))
    }

    /// Fail with `UnknownFlight` unless the key is registered.
    pub fn ensure_exists(&self, key: &FlightKey) -> Result<(), SuretyError> {
        self.status(key).map(|_| ())
    }

    /// Record the outcome of `round`. Returns `false` when the round was
    /// already applied.
    pub(crate) fn resolve(
        &mut self,
        key: &FlightKey,
        status: FlightStatus,
        round: RoundId,
    ) -> Result<bool, SuretyError> {
        let flight = self
            .flights
            .get_mut(key)
            .ok_or_else(|| SuretyError::UnknownFlight(key.clone()))?;
        if flight.resolved_in == Some(round) {
            return Ok(false);
        }
        flight.status = status;
        flight.resolved_in = Some(round);
        Ok(true)
    }

    pub fn get(&self, key: &FlightKey) -> Option<&Flight> {
        self.flights.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flight> {
        self.flights.values()
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }
}
