//! WebSocket handler for live match updates.
//!
//! Each connection subscribes to its match actor and is pushed one event per
//! accepted mutation, in turn-counter order. Clients can also roll and move
//! over the same socket.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{match_id}`
//! 2. Server replies with the current match view
//! 3. Server spawns a send task that forwards match events and command responses
//! 4. On disconnect the subscription is dropped
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws/1');
//!
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   if (data.type === "event" && data.event.type === "state_changed") {
//!     render(data.event.snapshot);
//!   }
//! };
//!
//! ws.send(JSON.stringify({ type: "roll", player_id: 0 }));
//! ```

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use ludo::{MatchEvent, MatchId, MatchView, PlayerId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;

use super::{AppState, error::ApiError, matches};
use crate::metrics;

/// Client messages received via WebSocket
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    /// Roll the die for the active player
    Roll { player_id: PlayerId },
    /// Move a piece with the pending die
    Move(matches::MoveRequest),
    /// Ask for a fresh view, e.g. after a conflict
    View,
}

/// Messages sent to the client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    View {
        view: MatchView,
    },
    Event {
        event: MatchEvent,
    },
    Accepted {
        turn_counter: u64,
    },
    Error {
        code: &'static str,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_turn_counter: Option<u64>,
    },
}

impl From<ApiError> for ServerMessage {
    fn from(error: ApiError) -> Self {
        let body = error.to_error_response();
        Self::Error {
            code: body.code,
            message: body.error,
            current_turn_counter: body.current_turn_counter,
        }
    }
}

/// Upgrade HTTP connection to WebSocket for live match updates.
///
/// # Response
///
/// On success, upgrades connection to WebSocket protocol (101 Switching Protocols).
/// Returns `404 Not Found` if the match doesn't exist.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(match_id): Path<MatchId>,
    State(state): State<AppState>,
) -> Response {
    if state.match_manager.get_match(match_id).await.is_none() {
        return ApiError::Match(ludo::MatchError::NotFound(match_id)).into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, match_id, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, match_id: MatchId, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let subscriber_id = state.next_subscriber_id.fetch_add(1, Ordering::Relaxed);

    let mut events = match state
        .match_manager
        .subscribe(match_id, subscriber_id)
        .await
    {
        Ok(events) => events,
        Err(e) => {
            warn!("WebSocket subscribe failed for match {}: {}", match_id, e);
            return;
        }
    };

    let active = state.ws_connections.fetch_add(1, Ordering::Relaxed) + 1;
    metrics::websocket_connections_total();
    metrics::websocket_connections_active(active);
    info!(
        "WebSocket connected: match={}, subscriber={}",
        match_id, subscriber_id
    );

    let (response_tx, mut response_rx) = tokio::sync::mpsc::channel::<ServerMessage>(32);

    // Initial view, so the client doesn't wait for the next mutation to render.
    let initial = match state.match_manager.view(match_id).await {
        Ok(view) => ServerMessage::View { view },
        Err(e) => ApiError::Match(e).into(),
    };
    let _ = response_tx.send(initial).await;

    let send_task = tokio::spawn(async move {
        loop {
            let outgoing = tokio::select! {
                Some(event) = events.recv() => ServerMessage::Event { event },
                Some(response) = response_rx.recv() => response,
                else => break,
            };

            let json = match serde_json::to_string(&outgoing) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize server message: {}", e);
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
            metrics::websocket_messages_sent();
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                metrics::websocket_messages_received();

                let response = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => handle_client_message(client_msg, match_id, &state).await,
                    Err(e) => {
                        warn!("Failed to parse client message: {}", e);
                        ApiError::BadRequest("Invalid message format".to_string()).into()
                    }
                };

                if response_tx.send(response).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!("WebSocket closed: match={}", match_id);
                break;
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();

    // The match may already be gone; nothing left to unsubscribe from then.
    let _ = state
        .match_manager
        .unsubscribe(match_id, subscriber_id)
        .await;

    let active = state.ws_connections.fetch_sub(1, Ordering::Relaxed) - 1;
    metrics::websocket_connections_active(active);
    info!(
        "WebSocket disconnected: match={}, subscriber={}",
        match_id, subscriber_id
    );
}

/// Process a client command and return the direct response. The resulting
/// state reaches the client separately through its event subscription.
async fn handle_client_message(
    msg: ClientMessage,
    match_id: MatchId,
    state: &AppState,
) -> ServerMessage {
    let result = match msg {
        ClientMessage::Roll { player_id } => matches::perform_roll(state, match_id, player_id).await,
        ClientMessage::Move(request) => matches::perform_move(state, match_id, request).await,
        ClientMessage::View => {
            return match state.match_manager.view(match_id).await {
                Ok(view) => ServerMessage::View { view },
                Err(e) => ApiError::Match(e).into(),
            };
        }
    };

    match result {
        Ok(transition) => ServerMessage::Accepted {
            turn_counter: transition.state.turn_counter(),
        },
        Err(e) => e.into(),
    }
}
