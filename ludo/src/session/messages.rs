//! Match actor message types.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use super::{MatchId, errors::MatchResult};
use crate::game::{
    GameEvent, MatchState, MatchView, PieceId, PlayerId, TrackPosition, Transition,
};

/// Identifies one event subscription on a match.
pub type SubscriberId = u64;

/// Messages that can be sent to a MatchActor
#[derive(Debug)]
pub enum MatchMessage {
    /// Roll the die for the active player
    Roll {
        player: PlayerId,
        response: oneshot::Sender<MatchResult<Transition>>,
    },

    /// Move a piece. Rejected with a conflict unless `expected_turn_counter`
    /// equals the match's current counter.
    ProposeMove {
        player: PlayerId,
        piece: PieceId,
        expected_turn_counter: u64,
        target: Option<TrackPosition>,
        response: oneshot::Sender<MatchResult<Transition>>,
    },

    /// Start over with the same roster after a finish
    Rematch {
        response: oneshot::Sender<MatchResult<Transition>>,
    },

    /// Get the current match state
    GetState {
        response: oneshot::Sender<MatchState>,
    },

    /// Get the client-facing view
    GetView {
        response: oneshot::Sender<MatchView>,
    },

    /// Subscribe to match events
    Subscribe {
        subscriber_id: SubscriberId,
        sender: mpsc::Sender<MatchEvent>,
    },

    /// Unsubscribe from match events
    Unsubscribe { subscriber_id: SubscriberId },

    /// Shut the actor down
    Close { response: oneshot::Sender<()> },
}

/// Notifications pushed to subscribers after every accepted mutation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    /// The match has a new ground truth
    StateChanged {
        match_id: MatchId,
        snapshot: MatchState,
        turn_counter: u64,
        events: Vec<GameEvent>,
    },

    /// The match just finished
    Completed { match_id: MatchId, winner: PlayerId },
}

impl MatchEvent {
    pub fn match_id(&self) -> MatchId {
        match self {
            MatchEvent::StateChanged { match_id, .. } | MatchEvent::Completed { match_id, .. } => {
                *match_id
            }
        }
    }
}
