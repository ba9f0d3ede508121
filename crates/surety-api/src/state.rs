//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor.
//!
//! - **Protocol** — the [`FlightSurety`] ledger, shared behind an `Arc`.
//! - **Event channel** — committed events fan out over a tokio broadcast
//!   channel to the oracle simulator and any other in-process subscriber.
//! - **Prometheus handle** — present when the binary installed a recorder.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::broadcast;

use surety_state::{EventRecord, EventSink, FlightSurety};

/// Capacity of the in-process event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
        }
    }
}

/// Forwards committed ledger events to a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastSink(pub broadcast::Sender<EventRecord>);

impl EventSink for BroadcastSink {
    fn publish(&self, record: &EventRecord) {
        // No receivers is fine; the event log keeps the record.
        let _ = self.0.send(record.clone());
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub protocol: Arc<FlightSurety>,
    pub events: broadcast::Sender<EventRecord>,
    pub config: AppConfig,
    pub prometheus: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("protocol", &self.protocol)
            .field("subscribers", &self.events.receiver_count())
            .field("config", &self.config)
            .field("prometheus", &self.prometheus.is_some())
            .finish()
    }
}

impl AppState {
    /// Wrap an already-deployed protocol and wire its event channel.
    pub fn with_protocol(config: AppConfig, protocol: FlightSurety) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        protocol.subscribe(Arc::new(BroadcastSink(events.clone())));
        Self {
            protocol: Arc::new(protocol),
            events,
            config,
            prometheus: None,
        }
    }

    /// Attach the Prometheus handle so `/metrics` is served.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Subscribe to committed events.
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }
}
