//! # Ludo
//!
//! An authoritative rules engine and turn state machine for four-player Ludo,
//! plus the replication layer that keeps remote viewers of a match consistent.
//!
//! ## Architecture
//!
//! The engine is pure: `(MatchState, input) -> Transition | RuleViolation`.
//! A match moves through three statuses:
//!
//! - **Waiting**: all pieces in the yard, nobody has rolled yet
//! - **InProgress**: set by the first accepted roll
//! - **Finished**: terminal, set the instant a player's fourth piece finishes
//!
//! Each live match is owned by a single tokio actor. Moves carry the turn
//! counter the client last saw and are rejected with a conflict if the match
//! has moved on since.
//!
//! ## Core Modules
//!
//! - [`game`]: Board topology, entities, rules engine and turn state machine
//! - [`session`]: Match actors, the match manager, snapshots and codecs
//!
//! ## Example
//!
//! ```
//! use ludo::{DieValue, MatchState, PieceId};
//!
//! let state = MatchState::default();
//! let six = DieValue::try_from(6).unwrap();
//! let rolled = state.roll(0, six).unwrap().state;
//! let moved = rolled.propose_move(0, PieceId::new(0, 0), Some(0)).unwrap();
//!
//! // A six always earns another roll.
//! assert_eq!(moved.state.active_player(), 0);
//! ```

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    BoardCell, CellInfo, Color, DieValue, GameEvent, MatchState, MatchStatus, MatchView,
    MoveOption, Piece, PieceId, PieceLocation, Player, PlayerId, Roster, RosterError,
    RuleViolation, Token, TrackPosition, Transition, build_board, position_to_cell,
    constants::{self, BOARD_SIZE, FINAL_STEP, PIECES_PER_PLAYER, PLAYER_COUNT, SAFE_CELLS},
    rules,
};

/// Single-writer match sessions and the replication contract.
pub mod session;
pub use session::{
    MatchActor, MatchError, MatchEvent, MatchHandle, MatchId, MatchManager, MatchMetadata,
    MatchResult, SessionConfig, SessionConfigError, SnapshotError,
};
