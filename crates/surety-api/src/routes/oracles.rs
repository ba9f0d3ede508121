//! # Oracle API
//!
//! ## Endpoints
//!
//! - `POST   /v1/oracles`                        — Register an oracle (pays the fee)
//! - `GET    /v1/oracles`                        — List oracles and their indexes
//! - `GET    /v1/oracles/{oracle}/indexes`       — Assigned indexes and seed
//! - `POST   /v1/oracles/{oracle}/responses`     — Report a flight status
//!
//! A report for a round that already finalized answers `200` with
//! `{"result": "ignored"}` rather than an error.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use surety_core::{AccountId, Amount, FlightKey, FlightStatus};
use surety_state::{Oracle, ReportOutcome};

use crate::error::AppError;
use crate::extractors::{account, extract_json};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request to register an oracle.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterOracleRequest {
    pub oracle: AccountId,
    /// Registration fee as a decimal unit string.
    pub fee: Amount,
}

/// An oracle report.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracleReportRequest {
    pub index: u8,
    pub key: FlightKey,
    /// Status name (`LATE_AIRLINE`) or numeric code (`20`).
    pub status: FlightStatus,
}

/// An oracle's assignment.
#[derive(Debug, Serialize, Deserialize)]
pub struct OracleResponse {
    pub oracle: AccountId,
    pub indexes: Vec<u8>,
    /// Hex seed the indexes were drawn from.
    pub seed: String,
    pub nonce: u64,
    pub registered_at: u64,
}

impl OracleResponse {
    fn from_oracle(oracle: &Oracle) -> Self {
        Self {
            oracle: oracle.id.clone(),
            indexes: oracle.indexes.clone(),
            seed: oracle.seed.to_hex(),
            nonce: oracle.nonce,
            registered_at: oracle.registered_at,
        }
    }
}

/// Oracle list.
#[derive(Debug, Serialize, Deserialize)]
pub struct OracleListResponse {
    pub oracles: Vec<OracleResponse>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the oracle router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/oracles", post(register_oracle).get(list_oracles))
        .route("/v1/oracles/{oracle}/indexes", get(get_indexes))
        .route("/v1/oracles/{oracle}/responses", post(submit_response))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn current(state: &AppState, id: &AccountId) -> Result<OracleResponse, AppError> {
    state
        .protocol
        .oracle(id)
        .map(|oracle| OracleResponse::from_oracle(&oracle))
        .ok_or_else(|| AppError::NotFound(format!("oracle {id} not found")))
}

/// POST /v1/oracles — Register an oracle.
async fn register_oracle(
    State(state): State<AppState>,
    body: Result<Json<RegisterOracleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OracleResponse>), AppError> {
    let req = extract_json(body)?;
    state.protocol.register_oracle(&req.oracle, req.fee)?;
    Ok((StatusCode::CREATED, Json(current(&state, &req.oracle)?)))
}

/// GET /v1/oracles — List oracles.
async fn list_oracles(State(state): State<AppState>) -> Json<OracleListResponse> {
    let oracles: Vec<OracleResponse> = state
        .protocol
        .oracles()
        .iter()
        .map(OracleResponse::from_oracle)
        .collect();
    let total = oracles.len();
    Json(OracleListResponse { oracles, total })
}

/// GET /v1/oracles/{oracle}/indexes — Assigned indexes.
async fn get_indexes(
    State(state): State<AppState>,
    Path(oracle): Path<String>,
) -> Result<Json<OracleResponse>, AppError> {
    let id = account(&oracle)?;
    // Unknown oracles are NotAuthorized at the protocol level.
    state.protocol.get_my_indexes(&id)?;
    Ok(Json(current(&state, &id)?))
}

/// POST /v1/oracles/{oracle}/responses — Report a flight status.
async fn submit_response(
    State(state): State<AppState>,
    Path(oracle): Path<String>,
    body: Result<Json<OracleReportRequest>, JsonRejection>,
) -> Result<Json<ReportOutcome>, AppError> {
    let id = account(&oracle)?;
    let req = extract_json(body)?;
    let outcome = state
        .protocol
        .submit_oracle_response(&id, req.index, &req.key, req.status)?;
    Ok(Json(outcome))
}
