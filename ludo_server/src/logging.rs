//! Structured logging configuration.
//!
//! This module provides structured logging with request correlation and
//! per-match event tracing.

use ludo::{GameEvent, MatchId};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var. Records emitted
/// through the `log` facade by the `ludo` crate are captured as well.
///
/// # Example
///
/// ```no_run
/// use ludo_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,tower_http=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log the game events produced by an accepted operation
///
/// # Arguments
///
/// * `match_id` - Match the events belong to
/// * `turn_counter` - Counter of the state the events produced
/// * `events` - Events in the order they happened
pub fn log_match_events(match_id: MatchId, turn_counter: u64, events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::Won { player } => tracing::info!(
                match_id = match_id,
                turn_counter = turn_counter,
                winner = player,
                "Match won"
            ),
            _ => tracing::debug!(
                match_id = match_id,
                turn_counter = turn_counter,
                "{}",
                event
            ),
        }
    }
}

/// Log a refused operation
///
/// Stale turn counters are expected under concurrent play and only logged at
/// debug level.
pub fn log_rejected(match_id: MatchId, operation: &str, reason: &str, conflict: bool) {
    if conflict {
        tracing::debug!(
            match_id = match_id,
            operation = operation,
            "Rejected: {}",
            reason
        );
    } else {
        tracing::info!(
            match_id = match_id,
            operation = operation,
            "Rejected: {}",
            reason
        );
    }
}

/// Log API request/response
///
/// # Arguments
///
/// * `method` - HTTP method
/// * `path` - Matched route or raw request path
/// * `status_code` - Response status code
/// * `duration_ms` - Request duration in milliseconds
/// * `request_id` - Correlation id of the request
pub fn log_api_request(
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
    request_id: &str,
) {
    tracing::info!(
        http_method = method,
        http_path = path,
        http_status = status_code,
        duration_ms = duration_ms,
        request_id = request_id,
        "API request completed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use ludo::PieceId;

    #[test]
    fn test_log_match_events() {
        // Just ensure it doesn't panic
        log_match_events(
            1,
            5,
            &[
                GameEvent::PieceFinished {
                    piece: PieceId::new(0, 3),
                },
                GameEvent::Won { player: 0 },
            ],
        );
        log_match_events(2, 1, &[]);
    }

    #[test]
    fn test_log_rejected() {
        log_rejected(1, "move", "Stale turn counter", true);
        log_rejected(1, "roll", "not your turn", false);
    }

    #[test]
    fn test_log_api_request() {
        log_api_request("GET", "/api/v1/matches", 200, 3, "req-1");
        log_api_request("POST", "/api/v1/matches/{match_id}/move", 409, 12, "req-2");
    }
}
