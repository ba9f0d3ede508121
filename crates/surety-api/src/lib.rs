//! # surety-api — Axum API Services
//!
//! HTTP surface of the flight surety protocol, built on Axum/Tower/Tokio.
//! Every protocol operation has one route under `/v1`; handlers translate
//! JSON to protocol calls and protocol errors to structured responses.
//!
//! ## Routers
//!
//! - `/v1/airlines/*` — admission, votes, funding
//! - `/v1/flights/*` — flights, status requests, consensus rounds
//! - `/v1/insurance`, `/v1/passengers/*` — policies, balances, withdrawals
//! - `/v1/oracles/*` — oracle registration and reports
//! - `/v1/protocol/*`, `/v1/events` — summary, parameters, pause, event feed
//! - `/v1/demo/*` — demo seeding
//! - `/health/*`, `/metrics` — probes and Prometheus scrape (unauthenticated)
//!
//! ## Middleware Stack (Tower)
//!
//! CORS → TraceLayer → MetricsLayer → AuthLayer
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers — delegates to `surety-state`.
//! - All errors map to structured HTTP responses via `AppError`.

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod simulator;
pub mod state;

use axum::extract::State;
use axum::http::header;
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the full application router with all routes and middleware.
///
/// Health probes and `/metrics` are mounted outside the auth middleware
/// so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::airlines::router())
        .merge(routes::flights::router())
        .merge(routes::insurance::router())
        .merge(routes::oracles::router())
        .merge(routes::protocol::router())
        .merge(routes::demo::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    // Unauthenticated probes and scrape endpoint.
    let ops = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics))
        .with_state(state);

    Router::new()
        .merge(ops)
        .merge(api)
        .layer(CorsLayer::permissive())
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — returns 200 once the protocol is deployed.
async fn readiness() -> &'static str {
    "ready"
}

/// Prometheus scrape. Protocol gauges are refreshed from the ledger first.
async fn prometheus_metrics(State(state): State<AppState>) -> Result<Response, AppError> {
    let handle = state
        .prometheus
        .as_ref()
        .ok_or_else(|| AppError::NotFound("metrics exporter not installed".into()))?;
    middleware::metrics::record_protocol_gauges(&state.protocol.summary());
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response())
}
