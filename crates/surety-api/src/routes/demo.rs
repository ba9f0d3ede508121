//! # Demo API
//!
//! - `POST   /v1/demo/flights` — Register the demo flights on random
//!   operational airlines, departing 10 to 800 seconds from now.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use crate::bootstrap::seed_demo_flights;
use crate::error::AppError;
use crate::routes::flights::{FlightListResponse, FlightResponse};
use crate::state::AppState;

/// Build the demo router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/demo/flights", post(seed_flights))
}

/// POST /v1/demo/flights — Seed the demo flights.
async fn seed_flights(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<FlightListResponse>), AppError> {
    let keys = seed_demo_flights(&state.protocol);
    if keys.is_empty() {
        return Err(AppError::Validation(
            "no demo flight could be registered; fund an airline first".into(),
        ));
    }
    let flights: Vec<FlightResponse> = keys
        .iter()
        .filter_map(|key| state.protocol.flight(key))
        .map(|flight| FlightResponse::from_flight(&flight))
        .collect();
    let total = flights.len();
    Ok((StatusCode::CREATED, Json(FlightListResponse { flights, total })))
}
