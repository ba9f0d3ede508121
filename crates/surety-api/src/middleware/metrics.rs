//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware through the `metrics` facade. Protocol gauges (airlines,
//! flights, policies, open rounds, pool totals) are refreshed from the
//! ledger on each `/metrics` scrape.
//!
//! Without an installed recorder the macros are no-ops, so tests and the CLI
//! run the same code without exporting anything.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use surety_core::Amount;
use surety_state::LedgerSummary;

/// Install the global Prometheus recorder.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Middleware that records request count, latency and errors per route.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    metrics::counter!(
        "surety_http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!(
        "surety_http_request_duration_seconds",
        "method" => method.clone(),
        "path" => path.clone()
    )
    .record(start.elapsed().as_secs_f64());
    if status.is_client_error() || status.is_server_error() {
        metrics::counter!(
            "surety_http_errors_total",
            "method" => method,
            "path" => path,
            "status" => status.as_u16().to_string()
        )
        .increment(1);
    }

    response
}

fn units(amount: Amount) -> f64 {
    amount.to_string().parse().unwrap_or(f64::MAX)
}

/// Refresh protocol gauges from a ledger summary.
pub fn record_protocol_gauges(summary: &LedgerSummary) {
    metrics::gauge!("surety_ledger_height").set(summary.height as f64);
    metrics::gauge!("surety_events_total").set(summary.events as f64);
    metrics::gauge!("surety_operational").set(if summary.operational { 1.0 } else { 0.0 });
    metrics::gauge!("surety_airlines", "state" => "registered")
        .set(summary.airlines_registered as f64);
    metrics::gauge!("surety_airlines", "state" => "operational")
        .set(summary.airlines_operational as f64);
    metrics::gauge!("surety_airlines", "state" => "pending").set(summary.airlines_pending as f64);
    metrics::gauge!("surety_flights", "state" => "registered").set(summary.flights as f64);
    metrics::gauge!("surety_flights", "state" => "resolved").set(summary.flights_resolved as f64);
    metrics::gauge!("surety_policies_total").set(summary.policies as f64);
    metrics::gauge!("surety_oracles_total").set(summary.oracles as f64);
    metrics::gauge!("surety_open_rounds").set(summary.open_rounds as f64);
    metrics::gauge!("surety_premiums_collected_units").set(units(summary.premiums_collected));
    metrics::gauge!("surety_payouts_credited_units").set(units(summary.payouts_credited));
    metrics::gauge!("surety_oracle_fees_collected_units")
        .set(units(summary.oracle_fees_collected));
}
