//! # Insurance API
//!
//! ## Endpoints
//!
//! - `POST   /v1/insurance`                         — Buy a policy on a flight
//! - `GET    /v1/passengers/{passenger}`            — Policies and credited balance
//! - `POST   /v1/passengers/{passenger}/withdraw`   — Withdraw the credited balance
//!
//! Payouts are credited to the passenger's balance when a flight resolves
//! to `LATE_AIRLINE`; nothing moves until the passenger withdraws.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use surety_core::{AccountId, Amount, FlightKey, PolicyId};
use surety_state::Policy;

use crate::error::AppError;
use crate::extractors::{account, extract_json};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request to buy insurance.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PurchaseRequest {
    pub passenger: AccountId,
    /// Flight key string `airline|designator|scheduled_at`.
    pub key: FlightKey,
    /// Premium as a decimal unit string.
    pub amount: Amount,
}

/// A policy as seen by its holder.
#[derive(Debug, Serialize, Deserialize)]
pub struct PolicyResponse {
    pub id: PolicyId,
    pub key: FlightKey,
    pub premium: Amount,
    pub payout: Option<Amount>,
    pub claimed: bool,
    pub purchased_at: u64,
}

impl PolicyResponse {
    fn from_policy(policy: &Policy) -> Self {
        Self {
            id: policy.id,
            key: policy.key.clone(),
            premium: policy.premium,
            payout: policy.payout,
            claimed: policy.claimed,
            purchased_at: policy.purchased_at,
        }
    }
}

/// Response after a purchase.
#[derive(Debug, Serialize, Deserialize)]
pub struct PurchaseResponse {
    pub policy: PolicyId,
    pub passenger: AccountId,
    pub key: FlightKey,
    pub premium: Amount,
}

/// A passenger's account.
#[derive(Debug, Serialize, Deserialize)]
pub struct PassengerResponse {
    pub passenger: AccountId,
    /// Credited, not yet withdrawn.
    pub balance: Amount,
    pub policies: Vec<PolicyResponse>,
}

/// Response after a withdrawal.
#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawResponse {
    pub passenger: AccountId,
    pub amount: Amount,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the insurance router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/insurance", post(purchase_insurance))
        .route("/v1/passengers/{passenger}", get(get_passenger))
        .route("/v1/passengers/{passenger}/withdraw", post(withdraw))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/insurance — Buy a policy.
async fn purchase_insurance(
    State(state): State<AppState>,
    body: Result<Json<PurchaseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PurchaseResponse>), AppError> {
    let req = extract_json(body)?;
    let policy = state
        .protocol
        .purchase_insurance(&req.passenger, &req.key, req.amount)?;
    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse {
            policy,
            passenger: req.passenger,
            key: req.key,
            premium: req.amount,
        }),
    ))
}

/// GET /v1/passengers/{passenger} — Policies and balance.
async fn get_passenger(
    State(state): State<AppState>,
    Path(passenger): Path<String>,
) -> Result<Json<PassengerResponse>, AppError> {
    let passenger = account(&passenger)?;
    let policies = state
        .protocol
        .policies_of(&passenger)
        .iter()
        .map(PolicyResponse::from_policy)
        .collect();
    Ok(Json(PassengerResponse {
        balance: state.protocol.balance(&passenger),
        passenger,
        policies,
    }))
}

/// POST /v1/passengers/{passenger}/withdraw — Withdraw the credited balance.
async fn withdraw(
    State(state): State<AppState>,
    Path(passenger): Path<String>,
) -> Result<Json<WithdrawResponse>, AppError> {
    let passenger = account(&passenger)?;
    let amount = state.protocol.withdraw(&passenger)?;
    Ok(Json(WithdrawResponse { passenger, amount }))
}
