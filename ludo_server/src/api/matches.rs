//! Match management API handlers.
//!
//! REST endpoints for creating, inspecting and playing Ludo matches. There is
//! no authentication layer; the acting player travels in the request body.
//!
//! # Examples
//!
//! Create a match:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/matches \
//!   -H "Content-Type: application/json" \
//!   -d '{"players": ["Ann", "Ben", "Cat", "Dan"]}'
//! ```
//!
//! Move a piece:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/matches/1/move \
//!   -H "Content-Type: application/json" \
//!   -d '{"player_id": 0, "piece_id": "0-0", "expected_turn_counter": 2}'
//! ```

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use ludo::{
    GameEvent, MatchId, MatchMetadata, MatchState, MatchView, PieceId, PlayerId, Roster,
    TrackPosition, Transition,
};
use serde::{Deserialize, Serialize};

use super::{AppState, error::ApiError, request_id::RequestId};
use crate::{logging, metrics};

#[derive(Debug, Default, Deserialize)]
pub struct CreateMatchRequest {
    /// Four display names in seat order; defaults to the seat colours
    #[serde(default)]
    pub players: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub match_id: MatchId,
    pub view: MatchView,
}

#[derive(Debug, Deserialize)]
pub struct RollRequest {
    pub player_id: PlayerId,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub player_id: PlayerId,
    pub piece_id: PieceId,
    pub expected_turn_counter: u64,
    #[serde(default)]
    pub target: Option<TrackPosition>,
}

/// Result of an accepted roll, move or rematch
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub match_id: MatchId,
    pub turn_counter: u64,
    pub events: Vec<GameEvent>,
    /// Human-readable status lines, one per event
    pub messages: Vec<String>,
    pub view: MatchView,
}

impl TransitionResponse {
    fn new(match_id: MatchId, transition: Transition) -> Self {
        Self {
            match_id,
            turn_counter: transition.state.turn_counter(),
            messages: transition.messages(),
            events: transition.events,
            view: transition.state.view(),
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// Bookkeeping shared by every accepted mutation
fn accepted(match_id: MatchId, transition: &Transition) {
    logging::log_match_events(match_id, transition.state.turn_counter(), &transition.events);
    if transition.completed().is_some() {
        metrics::matches_completed_total();
    }
}

pub(super) async fn perform_roll(
    state: &AppState,
    match_id: MatchId,
    player: PlayerId,
) -> ApiResult<Transition> {
    let transition = state
        .match_manager
        .roll(match_id, player)
        .await
        .map_err(|e| ApiError::rejected(match_id, "roll", e))?;
    metrics::dice_rolls_total();
    accepted(match_id, &transition);
    Ok(transition)
}

pub(super) async fn perform_move(
    state: &AppState,
    match_id: MatchId,
    request: MoveRequest,
) -> ApiResult<Transition> {
    let transition = state
        .match_manager
        .propose_move(
            match_id,
            request.player_id,
            request.piece_id,
            request.expected_turn_counter,
            request.target,
        )
        .await
        .map_err(|e| ApiError::rejected(match_id, "move", e))?;
    metrics::moves_total();
    accepted(match_id, &transition);
    Ok(transition)
}

async fn refresh_match_gauge(state: &AppState) {
    metrics::active_matches(state.match_manager.match_count().await);
}

/// List all live matches.
///
/// # Response
///
/// Returns `200 OK` with an array of match summaries ordered by id:
/// ```json
/// [
///   {
///     "id": 1,
///     "status": "in_progress",
///     "players": ["Red", "Green", "Yellow", "Blue"],
///     "active_player": 2,
///     "turn_counter": 17,
///     "winner": null
///   }
/// ]
/// ```
pub async fn list_matches(State(state): State<AppState>) -> Json<Vec<MatchMetadata>> {
    Json(state.match_manager.list_matches().await)
}

/// Create a new match.
///
/// The body is optional. An empty body seats the default roster.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body or invalid roster
/// - `503 Service Unavailable`: Match limit reached
pub async fn create_match(
    State(state): State<AppState>,
    request_id: RequestId,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let request: CreateMatchRequest = if body.is_empty() {
        CreateMatchRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))?
    };

    let roster = match request.players {
        Some(names) => Roster::new(names).map_err(|e| ApiError::BadRequest(e.to_string()))?,
        None => Roster::default(),
    };

    let match_id = state.match_manager.create_match(roster).await?;
    let view = state.match_manager.view(match_id).await?;

    metrics::matches_created_total(false);
    refresh_match_gauge(&state).await;
    tracing::info!(
        request_id = request_id.as_str(),
        match_id = match_id,
        "Match created"
    );

    Ok((StatusCode::CREATED, Json(CreatedResponse { match_id, view })))
}

/// Restore a match from a JSON snapshot.
///
/// The snapshot is validated in full before a match actor is spawned for it.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed or inconsistent snapshot
/// - `503 Service Unavailable`: Match limit reached
pub async fn restore_match(
    State(state): State<AppState>,
    request_id: RequestId,
    body: String,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let match_id = state.match_manager.restore_from_json(&body).await?;
    let view = state.match_manager.view(match_id).await?;

    metrics::matches_created_total(true);
    refresh_match_gauge(&state).await;
    tracing::info!(
        request_id = request_id.as_str(),
        match_id = match_id,
        turn_counter = view.turn_counter,
        "Match restored from snapshot"
    );

    Ok((StatusCode::CREATED, Json(CreatedResponse { match_id, view })))
}

/// Get the client view of a match: board, players, pending die and legal moves.
pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> ApiResult<Json<MatchView>> {
    Ok(Json(state.match_manager.view(match_id).await?))
}

/// Get the authoritative state of a match, suitable for persisting and
/// restoring later.
pub async fn get_snapshot(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> ApiResult<Json<MatchState>> {
    Ok(Json(state.match_manager.state(match_id).await?))
}

/// Roll the die for the active player.
///
/// # Errors
///
/// - `404 Not Found`: No such match
/// - `422 Unprocessable Entity`: Out of turn, die already rolled, or match finished
pub async fn roll(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    payload: Result<Json<RollRequest>, JsonRejection>,
) -> ApiResult<Json<TransitionResponse>> {
    let request = json_body(payload)?;
    let transition = perform_roll(&state, match_id, request.player_id).await?;
    Ok(Json(TransitionResponse::new(match_id, transition)))
}

/// Move a piece with the pending die.
///
/// `expected_turn_counter` must equal the counter of the state the client
/// computed its move against. `target` is optional; when present it must be
/// the cell the piece would actually land on.
///
/// # Errors
///
/// - `404 Not Found`: No such match
/// - `409 Conflict`: The match has moved on since the client's last view
/// - `422 Unprocessable Entity`: Illegal move
pub async fn propose_move(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> ApiResult<Json<TransitionResponse>> {
    let request = json_body(payload)?;
    let transition = perform_move(&state, match_id, request).await?;
    Ok(Json(TransitionResponse::new(match_id, transition)))
}

/// Reset a finished match to a fresh game with the same roster.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Match still in progress
pub async fn rematch(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> ApiResult<Json<TransitionResponse>> {
    let transition = state
        .match_manager
        .rematch(match_id)
        .await
        .map_err(|e| ApiError::rejected(match_id, "rematch", e))?;
    accepted(match_id, &transition);
    Ok(Json(TransitionResponse::new(match_id, transition)))
}

/// Close a match and drop its actor. Subscribers see their event stream end.
pub async fn close_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> ApiResult<StatusCode> {
    state.match_manager.close_match(match_id).await?;
    refresh_match_gauge(&state).await;
    tracing::info!(match_id = match_id, "Match closed");
    Ok(StatusCode::NO_CONTENT)
}
