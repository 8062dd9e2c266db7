//! Rules engine: dice, move legality, move application and captures.
//!
//! All functions are pure. `apply_move` works on a clone and hands the
//! turn bookkeeping to the state machine once pieces have moved.

use rand::Rng;

use super::{
    board::is_safe_cell,
    constants::{BOARD_SIZE, DIE_FACES, ENTRY_ROLL, FINAL_STEP},
    entities::{DieValue, MatchState, Piece, PieceId, PieceLocation, Player, PlayerId, TrackPosition},
    state_machine::{self, GameEvent, RuleViolation, Transition},
};

/// Rolls a fair six-sided die.
pub fn roll_die<R: Rng + ?Sized>(rng: &mut R) -> DieValue {
    DieValue::from_face(rng.random_range(1..=DIE_FACES))
}

/// Whether `piece` may move with `die`.
///
/// A yard piece needs exactly a six. A piece on the track may not
/// overshoot the final step; there is no bounce back.
#[must_use]
pub fn is_movable(piece: &Piece, die: Option<DieValue>) -> bool {
    let Some(die) = die else {
        return false;
    };
    match piece.location() {
        PieceLocation::Finished => false,
        PieceLocation::Yard => die.get() == ENTRY_ROLL,
        PieceLocation::Track(_) => piece.steps.saturating_add(die.get()) <= FINAL_STEP,
    }
}

/// Ids of `player`'s pieces that can move with the pending die. An empty
/// result means the turn must be forfeited.
#[must_use]
pub fn movable_pieces(state: &MatchState, player: PlayerId) -> Vec<PieceId> {
    let Some(player) = state.player(player) else {
        return Vec::new();
    };
    player
        .pieces
        .iter()
        .filter(|piece| is_movable(piece, state.pending_die()))
        .map(|piece| piece.id)
        .collect()
}

/// The cell `piece` would land on. Finishing moves report the wrapped ring
/// position even though the piece leaves the ring.
fn destination(player: &Player, piece: &Piece, die: DieValue) -> Option<TrackPosition> {
    match piece.location() {
        PieceLocation::Yard => Some(player.start_offset),
        PieceLocation::Track(position) => {
            let wrapped = (u16::from(position) + u16::from(die.get())) % u16::from(BOARD_SIZE);
            TrackPosition::try_from(wrapped).ok()
        }
        PieceLocation::Finished => None,
    }
}

/// Candidate destinations for `piece`. Holds at most one entry; empty when
/// the piece isn't the active player's or can't move with the pending die.
#[must_use]
pub fn valid_targets(state: &MatchState, piece: PieceId) -> Vec<TrackPosition> {
    if state.is_finished() || piece.player != state.active_player() {
        return Vec::new();
    }
    let (Some(die), Some(player), Some(token)) =
        (state.pending_die(), state.player(piece.player), state.piece(piece))
    else {
        return Vec::new();
    };
    if !is_movable(token, Some(die)) {
        return Vec::new();
    }
    destination(player, token, die).into_iter().collect()
}

/// Applies a move of `piece_id` with the pending die.
///
/// Ownership and legality are checked again here, not assumed from an
/// earlier `valid_targets` call. If `target` is given it must match the
/// computed destination.
pub fn apply_move(
    state: &MatchState,
    piece_id: PieceId,
    target: Option<TrackPosition>,
) -> Result<Transition, RuleViolation> {
    if state.is_finished() {
        return Err(RuleViolation::MatchFinished);
    }
    let die = state.pending_die().ok_or(RuleViolation::DieNotRolled)?;
    let (Some(player), Some(piece)) = (state.player(piece_id.player), state.piece(piece_id)) else {
        return Err(RuleViolation::UnknownPiece(piece_id));
    };
    if piece_id.player != state.active_player() {
        return Err(RuleViolation::NotYourPiece(piece_id));
    }
    if !is_movable(piece, Some(die)) {
        return Err(RuleViolation::PieceNotMovable(piece_id));
    }
    let expected =
        destination(player, piece, die).ok_or(RuleViolation::PieceNotMovable(piece_id))?;
    match target {
        Some(requested) if requested != expected => {
            return Err(RuleViolation::TargetMismatch {
                piece: piece_id,
                requested,
                expected,
            });
        }
        _ => {}
    }

    let start_offset = player.start_offset;
    let mut next = state.clone();
    let mut events = Vec::new();
    let moved = next
        .piece_mut(piece_id)
        .ok_or(RuleViolation::UnknownPiece(piece_id))?;

    // `None` when the piece left the ring by finishing.
    let landing = match moved.location() {
        PieceLocation::Yard => {
            moved.position = Some(start_offset);
            moved.steps = 1;
            events.push(GameEvent::PieceEntered {
                piece: piece_id,
                position: start_offset,
            });
            Some(start_offset)
        }
        PieceLocation::Track(from) => {
            moved.steps += die.get();
            if moved.steps == FINAL_STEP {
                moved.finished = true;
                moved.position = None;
                events.push(GameEvent::PieceFinished { piece: piece_id });
                None
            } else {
                moved.position = Some(expected);
                events.push(GameEvent::PieceMoved {
                    piece: piece_id,
                    from,
                    to: expected,
                });
                Some(expected)
            }
        }
        PieceLocation::Finished => return Err(RuleViolation::PieceNotMovable(piece_id)),
    };

    if let Some(cell) = landing {
        resolve_captures(&mut next, piece_id, cell, &mut events);
    }
    state_machine::conclude_move(&mut next, die, landing.is_none(), &mut events);

    Ok(Transition {
        state: next,
        events,
    })
}

/// Sends every opposing piece on `cell` back to its yard, unless the cell is safe.
/// Opponents sharing a cell don't protect each other.
fn resolve_captures(
    state: &mut MatchState,
    mover: PieceId,
    cell: TrackPosition,
    events: &mut Vec<GameEvent>,
) {
    if is_safe_cell(cell) {
        return;
    }

    for player in state
        .players
        .iter_mut()
        .filter(|player| player.id != mover.player)
    {
        for piece in player
            .pieces
            .iter_mut()
            .filter(|piece| !piece.finished && piece.position == Some(cell))
        {
            piece.send_to_yard();
            events.push(GameEvent::Captured {
                piece: piece.id,
                by: mover,
                position: cell,
            });
        }
    }
}
