//! Prometheus metrics for monitoring match server health and play activity.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener for
//! scraping by monitoring systems.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts, duration, status codes
//! - **WebSocket Metrics**: Active connections, messages sent/received
//! - **Match Metrics**: Live matches, rolls, moves, conflicts, completions
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ludo_server::metrics;
//! use std::net::SocketAddr;
//!
//! // Initialize metrics exporter
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! // Record HTTP request
//! metrics::http_requests_total("POST", "/api/v1/matches", 201);
//!
//! // Record a new live match
//! metrics::active_matches(3);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Sets up a Prometheus scrape endpoint on the specified address.
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// Set current active WebSocket connections count.
pub fn websocket_connections_active(count: u64) {
    metrics::gauge!("websocket_connections_active").set(count as f64);
}

/// Increment total WebSocket connections counter.
pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

pub fn websocket_messages_sent() {
    metrics::counter!("websocket_messages_sent").increment(1);
}

pub fn websocket_messages_received() {
    metrics::counter!("websocket_messages_received").increment(1);
}

// ============================================================================
// Match Metrics
// ============================================================================

/// Set current live matches count.
pub fn active_matches(count: usize) {
    metrics::gauge!("active_matches").set(count as f64);
}

/// Increment matches created counter, including restored ones.
pub fn matches_created_total(restored: bool) {
    metrics::counter!("matches_created_total",
        "restored" => restored.to_string()
    )
    .increment(1);
}

/// Increment matches completed counter.
pub fn matches_completed_total() {
    metrics::counter!("matches_completed_total").increment(1);
}

/// Increment accepted dice rolls counter.
pub fn dice_rolls_total() {
    metrics::counter!("dice_rolls_total").increment(1);
}

/// Increment accepted piece moves counter.
pub fn moves_total() {
    metrics::counter!("moves_total").increment(1);
}

/// Increment stale turn counter rejections.
pub fn move_conflicts_total() {
    metrics::counter!("move_conflicts_total").increment(1);
}

/// Increment rule violations counter, labelled by operation.
pub fn rule_violations_total(operation: &str) {
    metrics::counter!("rule_violations_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}
