use serde::{Deserialize, Serialize};

use super::{
    board::BoardCell,
    entities::{DieValue, MatchState, MatchStatus, PieceId, Player, PlayerId, TrackPosition},
    rules,
};

/// A legal move for the active player with the pending die.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MoveOption {
    pub piece: PieceId,
    pub target: TrackPosition,
}

/// Everything a client needs to render a match and pick a move. Derived
/// from a [`MatchState`]; never fed back into the engine.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MatchView {
    pub players: Vec<Player>,
    pub active_player: PlayerId,
    pub pending_die: Option<DieValue>,
    pub status: MatchStatus,
    pub turn_counter: u64,
    pub winner: Option<PlayerId>,
    pub board: Vec<BoardCell>,
    pub move_options: Vec<MoveOption>,
}

impl MatchState {
    #[must_use]
    pub fn view(&self) -> MatchView {
        let move_options = self
            .movable_pieces()
            .into_iter()
            .flat_map(|piece| {
                rules::valid_targets(self, piece)
                    .into_iter()
                    .map(move |target| MoveOption { piece, target })
            })
            .collect();

        MatchView {
            players: self.players.clone(),
            active_player: self.active_player,
            pending_die: self.pending_die,
            status: self.status,
            turn_counter: self.turn_counter,
            winner: self.winner,
            board: self.board(),
            move_options,
        }
    }
}
