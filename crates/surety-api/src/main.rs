//! # surety-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the flight surety protocol.
//! Binds to configurable port (default 8080).

use surety_api::bootstrap::{bootstrap, BootstrapOptions};
use surety_api::middleware::metrics::install_recorder;
use surety_api::simulator::OracleSimulator;
use surety_api::state::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing. LOG_FORMAT=json selects JSON lines.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Build configuration from environment.
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let auth_token = std::env::var("AUTH_TOKEN").ok();
    let config = AppConfig { port, auth_token };
    let options = BootstrapOptions::from_env();

    let (mut state, demo) = bootstrap(config, &options).map_err(|e| {
        tracing::error!("Bootstrap failed: {e}");
        e
    })?;

    match install_recorder() {
        Ok(handle) => state = state.with_prometheus(handle),
        Err(e) => tracing::warn!("Prometheus recorder not installed: {e}. /metrics will return 404."),
    }

    // Simulated oracles answer status requests in-process.
    if let Some(demo) = demo {
        let simulator = OracleSimulator::new(
            state.protocol.clone(),
            demo.oracles,
            options.status_policy(),
        );
        simulator.spawn(state.subscribe());
    }

    let app = surety_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Flight surety API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
