//! # Middleware
//!
//! - `metrics` — Prometheus request metrics and protocol gauges.

pub mod metrics;
