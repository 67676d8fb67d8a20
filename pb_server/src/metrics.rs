//! Prometheus metrics for monitoring room and session activity.
//!
//! Metrics are recorded through the `metrics` facade and only exported when
//! [`init_metrics`] installs the Prometheus listener. Without an installed
//! recorder every call here is a no-op.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use pb_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::websocket_connections_total();
//! metrics::rooms_active(3);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// Room Metrics
// ============================================================================

/// Set current live rooms count.
pub fn rooms_active(count: usize) {
    metrics::gauge!("rooms_active").set(count as f64);
}

/// A player took a seat.
pub fn player_joined() {
    metrics::gauge!("players_active").increment(1.0);
}

/// A player left their seat.
pub fn player_left() {
    metrics::gauge!("players_active").decrement(1.0);
}

/// Increment rounds played counter.
pub fn rounds_played_total() {
    metrics::counter!("rounds_played_total").increment(1);
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// Increment total WebSocket connections counter.
pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

/// Increment WebSocket messages received counter.
pub fn websocket_messages_received(kind: &'static str) {
    metrics::counter!("websocket_messages_received", "kind" => kind).increment(1);
}
