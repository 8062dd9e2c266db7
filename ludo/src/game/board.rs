//! Board topology: what each cell of the shared ring means, and the
//! board snapshot projected from the piece list.

use serde::{Deserialize, Serialize};

use super::{
    constants::{BOARD_SIZE, SAFE_CELLS, SEATS},
    entities::{Color, PieceId, Player, PlayerId, TrackPosition},
};

/// Static semantics of one ring cell.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CellInfo {
    pub index: TrackPosition,
    pub is_safe: bool,
    /// The color whose pieces enter the ring on this cell, if any.
    pub entry_for: Option<Color>,
}

#[must_use]
pub fn is_safe_cell(index: TrackPosition) -> bool {
    SAFE_CELLS.contains(&index)
}

/// Maps a ring index to its cell semantics.
///
/// # Panics
///
/// Panics if `index >= BOARD_SIZE`. Callers only ever pass positions
/// produced by the rules engine, so an out-of-range index is a bug.
#[must_use]
pub fn position_to_cell(index: TrackPosition) -> CellInfo {
    assert!(
        index < BOARD_SIZE,
        "track index {index} out of range 0..{BOARD_SIZE}"
    );
    CellInfo {
        index,
        is_safe: is_safe_cell(index),
        entry_for: SEATS
            .iter()
            .find(|seat| seat.start_offset == index)
            .map(|seat| seat.color),
    }
}

/// A piece as seen on the board.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Token {
    pub player_id: PlayerId,
    pub piece_id: PieceId,
    pub color: Color,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BoardCell {
    pub index: TrackPosition,
    pub tokens: Vec<Token>,
    pub is_safe: bool,
    pub entry_for: Option<Color>,
}

/// Rebuilds the whole board from the piece list. Yard and finished pieces
/// are not on the ring and don't appear.
#[must_use]
pub fn build_board(players: &[Player]) -> Vec<BoardCell> {
    let mut board: Vec<BoardCell> = (0..BOARD_SIZE)
        .map(|index| {
            let cell = position_to_cell(index);
            BoardCell {
                index,
                tokens: Vec::new(),
                is_safe: cell.is_safe,
                entry_for: cell.entry_for,
            }
        })
        .collect();

    for player in players {
        for piece in &player.pieces {
            if piece.finished {
                continue;
            }
            if let Some(cell) = piece.position.and_then(|pos| board.get_mut(pos as usize)) {
                cell.tokens.push(Token {
                    player_id: player.id,
                    piece_id: piece.id,
                    color: player.color,
                });
            }
        }
    }

    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::MatchState;

    #[test]
    fn test_safe_cells() {
        for index in [0, 8, 13, 21, 26, 34, 39, 47] {
            assert!(position_to_cell(index).is_safe, "{index} should be safe");
        }
        let unsafe_count = (0..BOARD_SIZE)
            .filter(|&index| !position_to_cell(index).is_safe)
            .count();
        assert_eq!(unsafe_count, 44);
    }

    #[test]
    fn test_entry_cells() {
        assert_eq!(position_to_cell(0).entry_for, Some(Color::Red));
        assert_eq!(position_to_cell(13).entry_for, Some(Color::Green));
        assert_eq!(position_to_cell(26).entry_for, Some(Color::Yellow));
        assert_eq!(position_to_cell(39).entry_for, Some(Color::Blue));
        assert_eq!(position_to_cell(8).entry_for, None);
        assert_eq!(position_to_cell(51).entry_for, None);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_position_to_cell_out_of_range() {
        let _ = position_to_cell(BOARD_SIZE);
    }

    #[test]
    fn test_empty_board() {
        let board = MatchState::default().board();
        assert_eq!(board.len(), BOARD_SIZE as usize);
        assert!(board.iter().all(|cell| cell.tokens.is_empty()));
        assert!(board.iter().enumerate().all(|(i, cell)| cell.index as usize == i));
    }

    #[test]
    fn test_board_places_tokens() {
        let mut state = MatchState::default();
        let piece = &mut state.players[1].pieces[2];
        piece.position = Some(20);
        piece.steps = 8;
        let finished = &mut state.players[0].pieces[0];
        finished.steps = BOARD_SIZE;
        finished.finished = true;

        let board = state.board();
        assert_eq!(
            board[20].tokens,
            vec![Token {
                player_id: 1,
                piece_id: PieceId::new(1, 2),
                color: Color::Green,
            }]
        );
        let total: usize = board.iter().map(|cell| cell.tokens.len()).sum();
        assert_eq!(total, 1);
    }
}
