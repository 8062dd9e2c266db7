//! HTTP/WebSocket API for the Ludo match server.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework for HTTP/WebSocket
//! - **Tower**: Middleware for CORS and request correlation
//! - **Actor Model**: Each match is owned by a dedicated actor task
//!
//! # Modules
//!
//! - [`matches`]: Match management (create, restore, roll, move, rematch)
//! - [`websocket`]: Live event stream and in-band commands for one match
//! - [`request_id`]: Request correlation ids and HTTP metrics
//! - [`error`]: Error to status code mapping
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /health                              - Health check
//! GET    /api/v1/matches                      - List matches
//! POST   /api/v1/matches                      - Create match
//! POST   /api/v1/matches/restore              - Restore match from JSON snapshot
//! GET    /api/v1/matches/{match_id}           - Client view of a match
//! DELETE /api/v1/matches/{match_id}           - Close match
//! GET    /api/v1/matches/{match_id}/snapshot  - Authoritative state
//! POST   /api/v1/matches/{match_id}/roll      - Roll the die
//! POST   /api/v1/matches/{match_id}/move      - Move a piece
//! POST   /api/v1/matches/{match_id}/rematch   - Start a rematch
//! GET    /ws/{match_id}                       - WebSocket
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ludo::{MatchManager, SessionConfig};
//! use ludo_server::api::{AppState, create_router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = Arc::new(MatchManager::new(SessionConfig::default())?);
//! let app = create_router(AppState::new(manager));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:6969").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod error;
pub mod matches;
pub mod request_id;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use ludo::MatchManager;
use serde_json::json;
use std::sync::{Arc, atomic::AtomicU64};
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// This state is cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub match_manager: Arc<MatchManager>,
    /// Source of unique subscriber ids for WebSocket connections
    pub next_subscriber_id: Arc<AtomicU64>,
    pub ws_connections: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(match_manager: Arc<MatchManager>) -> Self {
        Self {
            match_manager,
            next_subscriber_id: Arc::new(AtomicU64::new(1)),
            ws_connections: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router();

    // Root routes (health check, WebSocket - not versioned)
    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ws/{match_id}", get(websocket::websocket_handler));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/matches",
            get(matches::list_matches).post(matches::create_match),
        )
        .route("/matches/restore", post(matches::restore_match))
        .route(
            "/matches/{match_id}",
            get(matches::get_match).delete(matches::close_match),
        )
        .route("/matches/{match_id}/snapshot", get(matches::get_snapshot))
        .route("/matches/{match_id}/roll", post(matches::roll))
        .route("/matches/{match_id}/move", post(matches::propose_move))
        .route("/matches/{match_id}/rematch", post(matches::rematch))
}

/// Health check endpoint for monitoring and load balancers.
///
/// # Example
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","version":"0.1.0","matches":{"active_count":1,"capacity":1000},"timestamp":"2026-01-05T10:30:00+00:00"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let active_count = state.match_manager.match_count().await;

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "matches": {
            "active_count": active_count,
            "capacity": state.match_manager.config().max_matches,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
