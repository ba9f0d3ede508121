//! # Protocol API
//!
//! Ledger-wide reads and owner governance.
//!
//! ## Endpoints
//!
//! - `GET    /v1/protocol`                     — Ledger summary
//! - `GET    /v1/protocol/params`              — Effective protocol parameters
//! - `PUT    /v1/protocol/operating-status`    — Pause or resume (owner only)
//! - `GET    /v1/events?after=N&limit=M`       — Committed events after sequence `N`

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use surety_core::{AccountId, ProtocolParams};
use surety_state::{EventRecord, LedgerSummary};

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Page size when `limit` is omitted.
const DEFAULT_EVENT_LIMIT: usize = 100;
/// Largest page served.
const MAX_EVENT_LIMIT: usize = 1000;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request to change the operating status.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperatingStatusRequest {
    /// Must be the protocol owner.
    pub caller: AccountId,
    pub operational: bool,
}

/// Response after an operating status change.
#[derive(Debug, Serialize, Deserialize)]
pub struct OperatingStatusResponse {
    pub operational: bool,
    /// `false` when the protocol was already in the requested state.
    pub changed: bool,
}

/// Event log paging.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub after: u64,
    pub limit: Option<usize>,
}

/// A page of the event log.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<EventRecord>,
    /// Pass as `after` to fetch the next page.
    pub next_after: u64,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the protocol router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/protocol", get(get_summary))
        .route("/v1/protocol/params", get(get_params))
        .route("/v1/protocol/operating-status", put(set_operating_status))
        .route("/v1/events", get(list_events))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /v1/protocol — Ledger summary.
async fn get_summary(State(state): State<AppState>) -> Json<LedgerSummary> {
    Json(state.protocol.summary())
}

/// GET /v1/protocol/params — Effective parameters.
async fn get_params(State(state): State<AppState>) -> Json<ProtocolParams> {
    Json(state.protocol.params().clone())
}

/// PUT /v1/protocol/operating-status — Pause or resume the protocol.
async fn set_operating_status(
    State(state): State<AppState>,
    body: Result<Json<OperatingStatusRequest>, JsonRejection>,
) -> Result<Json<OperatingStatusResponse>, AppError> {
    let req = extract_json(body)?;
    let changed = state
        .protocol
        .set_operating_status(&req.caller, req.operational)?;
    Ok(Json(OperatingStatusResponse {
        operational: state.protocol.is_operational(),
        changed,
    }))
}

/// GET /v1/events — Page through committed events.
async fn list_events(
    State(state): State<AppState>,
    query: Result<Query<EventsQuery>, QueryRejection>,
) -> Result<Json<EventsResponse>, AppError> {
    let Query(query) = query.map_err(|err| AppError::BadRequest(err.body_text()))?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT);
    let events = state.protocol.events_after(query.after, limit);
    let next_after = events.last().map_or(query.after, |record| record.sequence);
    Ok(Json(EventsResponse { events, next_after }))
}
