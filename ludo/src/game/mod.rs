//! Ludo game engine: board topology, entities, rules and the turn state machine.
//!
//! This module provides the pure, synchronous core:
//! - Static board topology (safe cells, color entry cells)
//! - Piece, player and match state entities
//! - Dice, move legality, capture resolution and win detection
//! - Turn rotation, replays and match status
//!
//! Every operation takes a [`MatchState`] by reference and returns a new one
//! inside a [`Transition`], or a [`RuleViolation`] with the input untouched.

pub mod board;
pub mod constants;
pub mod entities;
pub mod rules;
pub mod state_machine;
pub mod view;

pub use board::{BoardCell, CellInfo, Token, build_board, position_to_cell};
pub use entities::{
    Color, DieValue, MatchState, MatchStatus, Piece, PieceId, PieceLocation, Player, PlayerId,
    Roster, RosterError, TrackPosition,
};
pub use state_machine::{GameEvent, RuleViolation, Transition};
pub use view::{MatchView, MoveOption};
