//! Fixed board and roster parameters.

use super::entities::Color;

/// Number of cells on the shared ring.
pub const BOARD_SIZE: u8 = 52;

/// Steps a piece must take to finish. Entering the ring counts as the first step.
pub const FINAL_STEP: u8 = BOARD_SIZE;

pub const PIECES_PER_PLAYER: usize = 4;

pub const PLAYER_COUNT: usize = 4;

/// The only die face that lets a piece leave the yard.
pub const ENTRY_ROLL: u8 = 6;

/// Die faces are `1..=DIE_FACES`.
pub const DIE_FACES: u8 = 6;

/// Cells where landing never captures.
pub const SAFE_CELLS: [u8; 8] = [0, 8, 13, 21, 26, 34, 39, 47];

/// Seat configuration, in turn order.
pub struct SeatConfig {
    pub name: &'static str,
    pub color: Color,
    pub start_offset: u8,
}

pub const SEATS: [SeatConfig; PLAYER_COUNT] = [
    SeatConfig {
        name: "Crimson Captain",
        color: Color::Red,
        start_offset: 0,
    },
    SeatConfig {
        name: "Emerald Enforcer",
        color: Color::Green,
        start_offset: 13,
    },
    SeatConfig {
        name: "Solar Sprinter",
        color: Color::Yellow,
        start_offset: 26,
    },
    SeatConfig {
        name: "Cobalt Challenger",
        color: Color::Blue,
        start_offset: 39,
    },
];

// Display names are user input and end up in logs and broadcasts.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 32;
