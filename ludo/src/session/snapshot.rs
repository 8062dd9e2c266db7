//! Snapshot validation and codecs.
//!
//! A snapshot is a serialized [`MatchState`]. Anything decoded from storage or
//! received over the wire goes through [`validate`] before a match actor will
//! accept it. The board is never part of a snapshot; it is recomputed.

use thiserror::Error;

use crate::game::{
    MatchState, MatchStatus, PieceId, PlayerId, TrackPosition,
    constants::{BOARD_SIZE, MAX_DISPLAY_NAME_LENGTH, PIECES_PER_PLAYER, PLAYER_COUNT, SEATS},
};

/// Snapshot errors
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("expected {expected} players, found {got}")]
    WrongPlayerCount { expected: usize, got: usize },

    #[error("player {player} has {got} pieces, expected {expected}")]
    WrongPieceCount {
        player: PlayerId,
        expected: usize,
        got: usize,
    },

    #[error("seat {0} has the wrong id, color or start offset")]
    SeatMismatch(PlayerId),

    #[error("seat {0} has an empty, padded or overlong display name")]
    InvalidName(PlayerId),

    #[error("slot {expected} holds piece {found}")]
    MisplacedPiece { expected: PieceId, found: PieceId },

    #[error("piece {0} is not cleanly in the yard, on the track or finished")]
    InconsistentPiece(PieceId),

    #[error("piece {piece} is on cell {position} but its steps put it on {expected}")]
    OffPath {
        piece: PieceId,
        position: TrackPosition,
        expected: TrackPosition,
    },

    #[error("pieces of different players share unsafe cell {0}")]
    ContestedCell(TrackPosition),

    #[error("active player {0} out of range")]
    ActivePlayerOutOfRange(PlayerId),

    #[error("turn counter must start at 1")]
    TurnCounterZero,

    #[error("a die is pending while the match is {0}")]
    UnexpectedDie(MatchStatus),

    #[error("player {0} holds a die but has no legal move")]
    DieWithoutMoves(PlayerId),

    #[error("pieces have left the yard before the first roll")]
    PiecesInPlayWhileWaiting,

    #[error("winner {winner:?} does not match a {status} match")]
    WinnerMismatch {
        status: MatchStatus,
        winner: Option<PlayerId>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Checks every structural and cross-field invariant of a match state.
pub fn validate(state: &MatchState) -> Result<(), SnapshotError> {
    let players = state.players();
    if players.len() != PLAYER_COUNT {
        return Err(SnapshotError::WrongPlayerCount {
            expected: PLAYER_COUNT,
            got: players.len(),
        });
    }

    for (seat, (player, config)) in players.iter().zip(SEATS.iter()).enumerate() {
        if player.id != seat
            || player.color != config.color
            || player.start_offset != config.start_offset
        {
            return Err(SnapshotError::SeatMismatch(seat));
        }
        if !is_display_name(&player.name) {
            return Err(SnapshotError::InvalidName(seat));
        }
        if player.pieces.len() != PIECES_PER_PLAYER {
            return Err(SnapshotError::WrongPieceCount {
                player: seat,
                expected: PIECES_PER_PLAYER,
                got: player.pieces.len(),
            });
        }

        for (index, piece) in player.pieces.iter().enumerate() {
            let expected = PieceId::new(seat, index);
            if piece.id != expected {
                return Err(SnapshotError::MisplacedPiece {
                    expected,
                    found: piece.id,
                });
            }
            if !piece.is_consistent() {
                return Err(SnapshotError::InconsistentPiece(piece.id));
            }
            if let Some(position) = piece.position {
                let on_path = ((player.start_offset as u16 + piece.steps as u16 - 1)
                    % BOARD_SIZE as u16) as TrackPosition;
                if position != on_path {
                    return Err(SnapshotError::OffPath {
                        piece: piece.id,
                        position,
                        expected: on_path,
                    });
                }
            }
        }
    }

    // Landing on an opponent off a safe cell always captures.
    for cell in state.board().iter().filter(|cell| !cell.is_safe) {
        if let Some((first, rest)) = cell.tokens.split_first()
            && rest.iter().any(|token| token.player_id != first.player_id)
        {
            return Err(SnapshotError::ContestedCell(cell.index));
        }
    }

    if state.active_player() >= PLAYER_COUNT {
        return Err(SnapshotError::ActivePlayerOutOfRange(state.active_player()));
    }
    if state.turn_counter() == 0 {
        return Err(SnapshotError::TurnCounterZero);
    }

    validate_status(state)
}

/// Names as [`Roster::new`](crate::game::Roster::new) would produce them.
fn is_display_name(name: &str) -> bool {
    !name.is_empty() && name.trim() == name && name.chars().count() <= MAX_DISPLAY_NAME_LENGTH
}

fn validate_status(state: &MatchState) -> Result<(), SnapshotError> {
    let status = state.status();
    let winner = state.winner();
    let mut complete = state
        .players()
        .iter()
        .filter(|player| player.all_finished())
        .map(|player| player.id);
    let winner_mismatch = || SnapshotError::WinnerMismatch { status, winner };

    match status {
        MatchStatus::Waiting | MatchStatus::Finished if state.pending_die().is_some() => {
            return Err(SnapshotError::UnexpectedDie(status));
        }
        MatchStatus::Waiting => {
            let all_in_yard = state
                .players()
                .iter()
                .flat_map(|player| &player.pieces)
                .all(|piece| piece.is_in_yard());
            if !all_in_yard {
                return Err(SnapshotError::PiecesInPlayWhileWaiting);
            }
            if winner.is_some() {
                return Err(winner_mismatch());
            }
        }
        MatchStatus::InProgress => {
            if winner.is_some() || complete.next().is_some() {
                return Err(winner_mismatch());
            }
            if state.pending_die().is_some() && state.movable_pieces().is_empty() {
                return Err(SnapshotError::DieWithoutMoves(state.active_player()));
            }
        }
        MatchStatus::Finished => {
            let (first, second) = (complete.next(), complete.next());
            if winner.is_none() || first != winner || second.is_some() {
                return Err(winner_mismatch());
            }
        }
    }

    Ok(())
}

/// Encodes a snapshot as JSON.
pub fn to_json(state: &MatchState) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(state)?)
}

/// Decodes and validates a JSON snapshot.
pub fn from_json(json: &str) -> Result<MatchState, SnapshotError> {
    let state: MatchState = serde_json::from_str(json)?;
    validate(&state)?;
    Ok(state)
}

/// Encodes a snapshot in the compact binary format.
pub fn to_bytes(state: &MatchState) -> Result<Vec<u8>, SnapshotError> {
    Ok(bincode::serde::encode_to_vec(
        state,
        bincode::config::standard(),
    )?)
}

/// Decodes and validates a binary snapshot.
pub fn from_bytes(bytes: &[u8]) -> Result<MatchState, SnapshotError> {
    let (state, _): (MatchState, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
    validate(&state)?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{DieValue, constants::FINAL_STEP};

    fn die(value: u8) -> DieValue {
        DieValue::try_from(value).unwrap()
    }

    fn in_progress() -> MatchState {
        let state = MatchState::default().roll(0, die(6)).unwrap().state;
        state.propose_move(0, PieceId::new(0, 0), None).unwrap().state
    }

    #[test]
    fn test_fresh_and_played_states_validate() {
        assert!(validate(&MatchState::default()).is_ok());
        assert!(validate(&in_progress()).is_ok());
    }

    #[test]
    fn test_json_roundtrip_keeps_board() {
        let state = in_progress();
        let decoded = from_json(&to_json(&state).unwrap()).unwrap();
        assert_eq!(decoded, state);
        assert_eq!(decoded.board(), state.board());
    }

    #[test]
    fn test_bincode_roundtrip_keeps_board() {
        let state = in_progress();
        let bytes = to_bytes(&state).unwrap();
        let decoded = from_bytes(&bytes).unwrap();
        assert_eq!(decoded.board(), state.board());
    }

    #[test]
    fn test_rejects_missing_player() {
        let mut state = MatchState::default();
        state.players.pop();
        assert!(matches!(
            validate(&state),
            Err(SnapshotError::WrongPlayerCount { got: 3, .. })
        ));
    }

    #[test]
    fn test_rejects_swapped_colors() {
        let mut state = MatchState::default();
        state.players[1].color = crate::game::Color::Red;
        assert!(matches!(
            validate(&state),
            Err(SnapshotError::SeatMismatch(1))
        ));
    }

    #[test]
    fn test_rejects_foreign_piece() {
        let mut state = MatchState::default();
        state.players[0].pieces[1].id = PieceId::new(2, 1);
        assert!(matches!(
            validate(&state),
            Err(SnapshotError::MisplacedPiece { .. })
        ));
    }

    #[test]
    fn test_rejects_inconsistent_piece() {
        let mut state = in_progress();
        state.players[0].pieces[0].finished = true;
        assert!(matches!(
            validate(&state),
            Err(SnapshotError::InconsistentPiece(_))
        ));
    }

    #[test]
    fn test_rejects_piece_off_its_path() {
        let mut state = in_progress();
        state.players[0].pieces[0].position = Some(30);
        assert!(matches!(
            validate(&state),
            Err(SnapshotError::OffPath { expected: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_contested_unsafe_cell() {
        let mut state = in_progress();
        let red = &mut state.players[0].pieces[0];
        red.position = Some(5);
        red.steps = 6;
        // 13 + 45 - 1 wraps to cell 5.
        let green = &mut state.players[1].pieces[0];
        green.position = Some(5);
        green.steps = 45;
        assert!(matches!(
            validate(&state),
            Err(SnapshotError::ContestedCell(5))
        ));

        // Two of red's own pieces may stack there.
        state.players[1].pieces[0].send_to_yard();
        let red = &mut state.players[0].pieces[1];
        red.position = Some(5);
        red.steps = 6;
        assert!(validate(&state).is_ok());
    }

    #[test]
    fn test_opponents_may_share_safe_cell() {
        let mut state = in_progress();
        let red = &mut state.players[0].pieces[0];
        red.position = Some(13);
        red.steps = 14;
        let green = &mut state.players[1].pieces[0];
        green.position = Some(13);
        green.steps = 1;
        assert!(validate(&state).is_ok());
    }

    #[test]
    fn test_rejects_bad_display_names() {
        let long = "x".repeat(MAX_DISPLAY_NAME_LENGTH + 1);
        for name in ["", "   ", " Padded", long.as_str()] {
            let mut state = MatchState::default();
            state.players[2].name = name.to_string();
            assert!(
                matches!(validate(&state), Err(SnapshotError::InvalidName(2))),
                "{name:?} should be refused"
            );
        }

        let mut state = MatchState::default();
        state.players[2].name = "é".repeat(MAX_DISPLAY_NAME_LENGTH);
        assert!(validate(&state).is_ok());
    }

    #[test]
    fn test_path_wraps_around_ring() {
        let mut state = in_progress();
        state.active_player = 1;
        let piece = &mut state.players[3].pieces[0];
        piece.position = Some(2);
        piece.steps = 16;
        assert!(validate(&state).is_ok());
    }

    #[test]
    fn test_rejects_die_while_waiting() {
        let mut state = MatchState::default();
        state.pending_die = Some(die(6));
        assert!(matches!(
            validate(&state),
            Err(SnapshotError::UnexpectedDie(MatchStatus::Waiting))
        ));
    }

    #[test]
    fn test_rejects_stuck_die() {
        let mut state = in_progress();
        state.active_player = 1;
        state.pending_die = Some(die(2));
        assert!(matches!(
            validate(&state),
            Err(SnapshotError::DieWithoutMoves(1))
        ));
    }

    #[test]
    fn test_rejects_winner_without_pieces_home() {
        let mut state = in_progress();
        state.status = MatchStatus::Finished;
        state.winner = Some(0);
        assert!(matches!(
            validate(&state),
            Err(SnapshotError::WinnerMismatch { .. })
        ));
    }

    #[test]
    fn test_accepts_genuine_finish() {
        let mut state = MatchState::default();
        for piece in &mut state.players[2].pieces {
            piece.steps = FINAL_STEP;
            piece.finished = true;
        }
        state.status = MatchStatus::Finished;
        state.winner = Some(2);
        state.active_player = 2;
        assert!(validate(&state).is_ok());

        state.winner = Some(1);
        assert!(validate(&state).is_err());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(from_json("{}"), Err(SnapshotError::Json(_))));
        assert!(matches!(
            from_bytes(&[0xff, 0xff]),
            Err(SnapshotError::Decode(_))
        ));
    }

    #[test]
    fn test_from_json_validates() {
        let mut state = MatchState::default();
        state.turn_counter = 0;
        let json = serde_json::to_string(&state).unwrap();
        assert!(matches!(from_json(&json), Err(SnapshotError::TurnCounterZero)));
    }
}
