//! # Flight API
//!
//! ## Endpoints
//!
//! - `POST   /v1/flights`                         — Register a flight
//! - `GET    /v1/flights`                         — List flights
//! - `GET    /v1/flights/{key}/status`            — Resolved status of a flight
//! - `POST   /v1/flights/{key}/status-requests`   — Ask the oracles for a status
//! - `GET    /v1/flights/{key}/round`             — Open and last closed consensus rounds
//!
//! `{key}` is the flight key `airline|designator|scheduled_at`, percent-encoded
//! in paths (`airline-1%7CNY9200%7C1700000000`).

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use surety_core::{AccountId, FlightKey, FlightStatus, RoundId};
use surety_state::{ConsensusRound, Flight};

use crate::error::AppError;
use crate::extractors::{extract_json, flight_key};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request to register a flight.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterFlightRequest {
    pub airline: AccountId,
    pub designator: String,
    /// Scheduled departure, Unix seconds.
    pub scheduled_at: u64,
}

/// A flight's current state.
#[derive(Debug, Serialize, Deserialize)]
pub struct FlightResponse {
    pub key: FlightKey,
    pub airline: AccountId,
    pub designator: String,
    pub scheduled_at: u64,
    pub status: FlightStatus,
    pub status_code: u8,
    pub registered_at: u64,
    pub resolved_in: Option<RoundId>,
}

impl FlightResponse {
    pub(crate) fn from_flight(flight: &Flight) -> Self {
        Self {
            key: flight.key.clone(),
            airline: flight.key.airline().clone(),
            designator: flight.key.designator().to_string(),
            scheduled_at: flight.key.scheduled_at(),
            status: flight.status,
            status_code: flight.status.code(),
            registered_at: flight.registered_at,
            resolved_in: flight.resolved_in,
        }
    }
}

/// Flight list.
#[derive(Debug, Serialize, Deserialize)]
pub struct FlightListResponse {
    pub flights: Vec<FlightResponse>,
    pub total: usize,
}

/// Status of a flight.
#[derive(Debug, Serialize, Deserialize)]
pub struct FlightStatusResponse {
    pub key: FlightKey,
    pub status: FlightStatus,
    pub status_code: u8,
}

/// Response after requesting a status from the oracles.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusRequestResponse {
    pub key: FlightKey,
    pub round: RoundId,
    /// Only oracles holding this index may answer.
    pub index: u8,
    /// `false` when the open round was reused.
    pub opened: bool,
}

/// A consensus round with its report buckets.
#[derive(Debug, Serialize, Deserialize)]
pub struct RoundResponse {
    pub id: RoundId,
    pub index: u8,
    pub opened_at: u64,
    /// Status name → reporting oracles.
    pub responses: BTreeMap<FlightStatus, Vec<AccountId>>,
    pub outcome: Option<FlightStatus>,
}

impl RoundResponse {
    fn from_round(round: &ConsensusRound) -> Self {
        Self {
            id: round.id,
            index: round.index,
            opened_at: round.opened_at,
            responses: round
                .responses
                .iter()
                .map(|(status, oracles)| (*status, oracles.iter().cloned().collect()))
                .collect(),
            outcome: round.outcome,
        }
    }
}

/// Rounds of one flight.
#[derive(Debug, Serialize, Deserialize)]
pub struct FlightRoundsResponse {
    pub key: FlightKey,
    pub open: Option<RoundResponse>,
    pub last_closed: Option<RoundResponse>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the flight router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/flights", post(register_flight).get(list_flights))
        .route("/v1/flights/{key}/status", get(get_flight_status))
        .route("/v1/flights/{key}/status-requests", post(request_status))
        .route("/v1/flights/{key}/round", get(get_rounds))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/flights — Register a flight for an operational airline.
async fn register_flight(
    State(state): State<AppState>,
    body: Result<Json<RegisterFlightRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FlightResponse>), AppError> {
    let req = extract_json(body)?;
    let key = state
        .protocol
        .register_flight(&req.airline, &req.designator, req.scheduled_at)?;
    let flight = state
        .protocol
        .flight(&key)
        .ok_or_else(|| AppError::Internal(format!("flight {key} missing after registration")))?;
    Ok((StatusCode::CREATED, Json(FlightResponse::from_flight(&flight))))
}

/// GET /v1/flights — List registered flights.
async fn list_flights(State(state): State<AppState>) -> Json<FlightListResponse> {
    let flights: Vec<FlightResponse> = state
        .protocol
        .flights()
        .iter()
        .map(FlightResponse::from_flight)
        .collect();
    let total = flights.len();
    Json(FlightListResponse { flights, total })
}

/// GET /v1/flights/{key}/status — Current status of a flight.
async fn get_flight_status(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<FlightStatusResponse>, AppError> {
    let key = flight_key(&key)?;
    let status = state.protocol.flight_status(&key)?;
    Ok(Json(FlightStatusResponse {
        key,
        status,
        status_code: status.code(),
    }))
}

/// POST /v1/flights/{key}/status-requests — Open a consensus round.
async fn request_status(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<(StatusCode, Json<StatusRequestResponse>), AppError> {
    let key = flight_key(&key)?;
    let request = state.protocol.request_flight_status(&key)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StatusRequestResponse {
            key,
            round: request.round,
            index: request.index,
            opened: request.opened,
        }),
    ))
}

/// GET /v1/flights/{key}/round — Consensus rounds of a flight.
async fn get_rounds(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<FlightRoundsResponse>, AppError> {
    let key = flight_key(&key)?;
    if state.protocol.flight(&key).is_none() {
        return Err(surety_core::SuretyError::UnknownFlight(key).into());
    }
    let open = state.protocol.open_round(&key);
    let last_closed = state.protocol.last_closed_round(&key);
    Ok(Json(FlightRoundsResponse {
        open: open.as_ref().map(RoundResponse::from_round),
        last_closed: last_closed.as_ref().map(RoundResponse::from_round),
        key,
    }))
}
