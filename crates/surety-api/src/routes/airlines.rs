//! # Airline Governance API
//!
//! Admission, voting and funding of airlines.
//!
//! ## Endpoints
//!
//! - `POST   /v1/airlines`                   — Register (or nominate) an airline
//! - `GET    /v1/airlines`                   — List airlines, registered and pending
//! - `GET    /v1/airlines/{airline}`         — Get one airline
//! - `POST   /v1/airlines/{airline}/votes`   — Vote on a pending candidate
//! - `POST   /v1/airlines/{airline}/fund`    — Contribute airline funding
//!
//! The first airlines are admitted directly by any registered airline. Past
//! the multiparty threshold a registration only nominates the candidate,
//! who is admitted once enough registered airlines approve.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use surety_core::{AccountId, Amount};
use surety_state::{Admission, Airline};

use crate::error::AppError;
use crate::extractors::{account, extract_json};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request to register an airline.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterAirlineRequest {
    /// A registered airline sponsoring the candidate.
    pub requester: AccountId,
    pub candidate: AccountId,
}

/// Request to vote on a pending airline.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    pub voter: AccountId,
    /// Defaults to an approving vote.
    #[serde(default = "approve_by_default")]
    pub approve: bool,
}

fn approve_by_default() -> bool {
    true
}

/// Request to contribute funding. Amounts are decimal unit strings.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FundRequest {
    pub amount: Amount,
}

/// An airline's current state.
#[derive(Debug, Serialize, Deserialize)]
pub struct AirlineResponse {
    pub id: AccountId,
    /// `REGISTERED` or `PENDING`.
    pub status: String,
    pub funding: Amount,
    pub funded: bool,
    /// Registered and funded.
    pub operational: bool,
    pub approvals: usize,
    pub votes_cast: usize,
    pub nominated_by: Option<AccountId>,
}

impl AirlineResponse {
    fn from_airline(airline: &Airline) -> Self {
        Self {
            id: airline.id.clone(),
            status: airline.status.as_str().to_string(),
            funding: airline.funding,
            funded: airline.funded,
            operational: airline.is_operational(),
            approvals: airline.approvals(),
            votes_cast: airline.votes.len(),
            nominated_by: airline.nominated_by.clone(),
        }
    }
}

/// Response after a registration request.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterAirlineResponse {
    #[serde(flatten)]
    pub admission: Admission,
    pub airline: AirlineResponse,
}

/// Response after a vote.
#[derive(Debug, Serialize, Deserialize)]
pub struct VoteResponse {
    pub approvals: usize,
    pub required: usize,
    /// Whether this vote admitted the candidate.
    pub registered: bool,
    pub airline: AirlineResponse,
}

/// Response after a funding contribution.
#[derive(Debug, Serialize, Deserialize)]
pub struct FundResponse {
    pub total_funding: Amount,
    pub airline: AirlineResponse,
}

/// Airline list.
#[derive(Debug, Serialize, Deserialize)]
pub struct AirlineListResponse {
    pub airlines: Vec<AirlineResponse>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the airline governance router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/airlines", post(register_airline).get(list_airlines))
        .route("/v1/airlines/{airline}", get(get_airline))
        .route("/v1/airlines/{airline}/votes", post(vote))
        .route("/v1/airlines/{airline}/fund", post(fund_airline))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn current(state: &AppState, id: &AccountId) -> Result<AirlineResponse, AppError> {
    state
        .protocol
        .airline(id)
        .map(|airline| AirlineResponse::from_airline(&airline))
        .ok_or_else(|| AppError::NotFound(format!("airline {id} not found")))
}

/// POST /v1/airlines — Register or nominate an airline.
async fn register_airline(
    State(state): State<AppState>,
    body: Result<Json<RegisterAirlineRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterAirlineResponse>), AppError> {
    let req = extract_json(body)?;
    let admission = state
        .protocol
        .register_airline(&req.requester, &req.candidate)?;
    let status = match admission {
        Admission::Registered => StatusCode::CREATED,
        Admission::Pending { .. } => StatusCode::ACCEPTED,
    };
    Ok((
        status,
        Json(RegisterAirlineResponse {
            admission,
            airline: current(&state, &req.candidate)?,
        }),
    ))
}

/// GET /v1/airlines — List all airlines.
async fn list_airlines(State(state): State<AppState>) -> Json<AirlineListResponse> {
    let airlines: Vec<AirlineResponse> = state
        .protocol
        .airlines()
        .iter()
        .map(AirlineResponse::from_airline)
        .collect();
    let total = airlines.len();
    Json(AirlineListResponse { airlines, total })
}

/// GET /v1/airlines/{airline} — Get one airline.
async fn get_airline(
    State(state): State<AppState>,
    Path(airline): Path<String>,
) -> Result<Json<AirlineResponse>, AppError> {
    let id = account(&airline)?;
    Ok(Json(current(&state, &id)?))
}

/// POST /v1/airlines/{airline}/votes — Vote on a pending candidate.
async fn vote(
    State(state): State<AppState>,
    Path(airline): Path<String>,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<VoteResponse>, AppError> {
    let candidate = account(&airline)?;
    let req = extract_json(body)?;
    let tally = state.protocol.vote(&req.voter, &candidate, req.approve)?;
    Ok(Json(VoteResponse {
        approvals: tally.approvals,
        required: tally.required,
        registered: tally.registered,
        airline: current(&state, &candidate)?,
    }))
}

/// POST /v1/airlines/{airline}/fund — Contribute funding.
async fn fund_airline(
    State(state): State<AppState>,
    Path(airline): Path<String>,
    body: Result<Json<FundRequest>, JsonRejection>,
) -> Result<Json<FundResponse>, AppError> {
    let id = account(&airline)?;
    let req = extract_json(body)?;
    let total_funding = state.protocol.fund(&id, req.amount)?;
    Ok(Json(FundResponse {
        total_funding,
        airline: current(&state, &id)?,
    }))
}
