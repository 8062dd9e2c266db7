//! Turn state machine.
//!
//! Owns whose turn it is, whether a move earns a replay, and the overall
//! match status. Every operation takes the current [`MatchState`] by
//! reference and returns a fresh one, so a rejected call can never leave a
//! half-applied state behind.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::{
    constants::{ENTRY_ROLL, PLAYER_COUNT},
    entities::{DieValue, MatchState, MatchStatus, Piece, PieceId, Player, PlayerId, TrackPosition},
    rules,
};

/// Reasons a roll, move or rematch is refused. State is never mutated
/// when one of these is returned.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum RuleViolation {
    #[error("match is already finished")]
    MatchFinished,
    #[error("match is still in progress")]
    MatchNotFinished,
    #[error("roll the die first")]
    DieNotRolled,
    #[error("die already rolled, move a piece")]
    DieAlreadyRolled,
    #[error("no player {0}")]
    UnknownPlayer(PlayerId),
    #[error("not your turn, player {active} is up")]
    OutOfTurn { active: PlayerId },
    #[error("no piece {0}")]
    UnknownPiece(PieceId),
    #[error("piece {0} belongs to another player")]
    NotYourPiece(PieceId),
    #[error("piece {0} can't move with the current die")]
    PieceNotMovable(PieceId),
    #[error("piece {piece} can't reach cell {requested}, only {expected}")]
    TargetMismatch {
        piece: PieceId,
        requested: TrackPosition,
        expected: TrackPosition,
    },
}

/// Events that occur during play. Their `Display` output is the status
/// line shown to players.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    Rolled {
        player: PlayerId,
        value: DieValue,
    },
    NoMovesAvailable {
        player: PlayerId,
        value: DieValue,
    },
    PieceEntered {
        piece: PieceId,
        position: TrackPosition,
    },
    PieceMoved {
        piece: PieceId,
        from: TrackPosition,
        to: TrackPosition,
    },
    PieceFinished {
        piece: PieceId,
    },
    Captured {
        piece: PieceId,
        by: PieceId,
        position: TrackPosition,
    },
    ExtraTurn {
        player: PlayerId,
    },
    TurnPassed {
        to: PlayerId,
    },
    Won {
        player: PlayerId,
    },
    Rematch,
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Rolled { player, value } => format!("player {player} rolled a {value}"),
            Self::NoMovesAvailable { player, value } => {
                format!("player {player} rolled a {value} but has no valid moves, passing turn")
            }
            Self::PieceEntered { piece, position } => {
                format!("piece {piece} entered the track at {position}")
            }
            Self::PieceMoved { piece, from, to } => {
                format!("piece {piece} moved from {from} to {to}")
            }
            Self::PieceFinished { piece } => format!("piece {piece} reached home"),
            Self::Captured {
                piece,
                by,
                position,
            } => format!("piece {piece} was captured by {by} at {position}"),
            Self::ExtraTurn { player } => format!("player {player} earned an extra turn"),
            Self::TurnPassed { to } => format!("player {to}'s turn"),
            Self::Won { player } => format!("player {player} wins the match"),
            Self::Rematch => "new match ready, roll to start".to_string(),
        };
        write!(f, "{repr}")
    }
}

impl GameEvent {
    /// Renders the event as a status line, naming players by their display
    /// names in `state`.
    #[must_use]
    pub fn describe(&self, state: &MatchState) -> String {
        let name = |player: PlayerId| match state.player(player) {
            Some(player) => player.name.clone(),
            None => format!("player {player}"),
        };
        match self {
            Self::Rolled { player, value } => format!("{} rolled a {value}.", name(*player)),
            Self::NoMovesAvailable { player, value } => format!(
                "{} rolled a {value} but has no valid moves. Passing turn.",
                name(*player)
            ),
            Self::PieceEntered { piece, position } => format!(
                "{}'s piece {piece} entered the track at {position}.",
                name(piece.player)
            ),
            Self::PieceMoved { piece, from, to } => format!(
                "{}'s piece {piece} moved from {from} to {to}.",
                name(piece.player)
            ),
            Self::PieceFinished { piece } => {
                format!("{}'s piece {piece} reached home.", name(piece.player))
            }
            Self::Captured {
                piece,
                by,
                position,
            } => format!(
                "{} captured {}'s piece {piece} at {position}!",
                name(by.player),
                name(piece.player)
            ),
            Self::ExtraTurn { player } => {
                format!("{} earned an extra turn. Roll again!", name(*player))
            }
            Self::TurnPassed { to } => format!("{}, you're up!", name(*to)),
            Self::Won { player } => format!("{} wins the match!", name(*player)),
            Self::Rematch => format!(
                "New match ready. {}, roll the dice.",
                name(state.active_player())
            ),
        }
    }
}

/// The result of an accepted operation: the new ground truth plus what happened.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Transition {
    pub state: MatchState,
    pub events: Vec<GameEvent>,
}

impl Transition {
    /// Whether this transition ended the match.
    #[must_use]
    pub fn completed(&self) -> Option<PlayerId> {
        self.events.iter().find_map(|event| match event {
            GameEvent::Won { player } => Some(*player),
            _ => None,
        })
    }

    /// One status line per event, using the roster's display names.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.events
            .iter()
            .map(|event| event.describe(&self.state))
            .collect()
    }
}

impl MatchState {
    /// Records a roll for `player`. If the roll leaves the player with no
    /// legal move, the die is cleared and the turn passes within the same
    /// transition.
    pub fn roll(&self, player: PlayerId, value: DieValue) -> Result<Transition, RuleViolation> {
        self.check_turn(player)?;
        if self.pending_die.is_some() {
            return Err(RuleViolation::DieAlreadyRolled);
        }

        let mut next = self.clone();
        next.pending_die = Some(value);
        next.status = MatchStatus::InProgress;
        next.turn_counter += 1;

        let mut events = vec![GameEvent::Rolled { player, value }];
        if rules::movable_pieces(&next, player).is_empty() {
            next.pending_die = None;
            events.push(GameEvent::NoMovesAvailable { player, value });
            pass_turn(&mut next, &mut events);
        }

        Ok(Transition {
            state: next,
            events,
        })
    }

    /// Rolls the die with `rng` and records it for `player`.
    pub fn roll_with<R: Rng + ?Sized>(
        &self,
        player: PlayerId,
        rng: &mut R,
    ) -> Result<Transition, RuleViolation> {
        self.roll(player, rules::roll_die(rng))
    }

    /// Moves `piece` on behalf of `player`. The move is fully revalidated
    /// against this state; nothing computed by the caller is trusted.
    pub fn propose_move(
        &self,
        player: PlayerId,
        piece: PieceId,
        target: Option<TrackPosition>,
    ) -> Result<Transition, RuleViolation> {
        self.check_turn(player)?;
        rules::apply_move(self, piece, target)
    }

    /// Starts another game with the same roster once this one is over.
    /// The turn counter keeps counting so submissions against the old game
    /// still conflict.
    pub fn rematch(&self) -> Result<Transition, RuleViolation> {
        if !self.is_finished() {
            return Err(RuleViolation::MatchNotFinished);
        }

        let next = Self {
            players: self
                .players
                .iter()
                .map(|player| Player {
                    pieces: player.pieces.iter().map(|piece| Piece::new(piece.id)).collect(),
                    ..player.clone()
                })
                .collect(),
            active_player: 0,
            pending_die: None,
            status: MatchStatus::Waiting,
            turn_counter: self.turn_counter + 1,
            winner: None,
        };

        Ok(Transition {
            state: next,
            events: vec![GameEvent::Rematch],
        })
    }

    /// Pieces the active player may move with the pending die.
    #[must_use]
    pub fn movable_pieces(&self) -> Vec<PieceId> {
        rules::movable_pieces(self, self.active_player)
    }

    fn check_turn(&self, player: PlayerId) -> Result<(), RuleViolation> {
        if self.is_finished() {
            return Err(RuleViolation::MatchFinished);
        }
        if player >= self.players.len() {
            return Err(RuleViolation::UnknownPlayer(player));
        }
        if player != self.active_player {
            return Err(RuleViolation::OutOfTurn {
                active: self.active_player,
            });
        }
        Ok(())
    }
}

/// Settles the turn after the rules engine has moved a piece: clears the
/// die, checks for a win, and either grants a replay or passes the turn.
/// A six and a finishing move both grant the same single replay.
pub(crate) fn conclude_move(
    state: &mut MatchState,
    die: DieValue,
    finished_piece: bool,
    events: &mut Vec<GameEvent>,
) {
    let mover = state.active_player;
    state.pending_die = None;
    state.turn_counter += 1;

    if state.players.get(mover).is_some_and(Player::all_finished) {
        state.status = MatchStatus::Finished;
        state.winner = Some(mover);
        events.push(GameEvent::Won { player: mover });
        return;
    }

    if die.get() == ENTRY_ROLL || finished_piece {
        events.push(GameEvent::ExtraTurn { player: mover });
    } else {
        pass_turn(state, events);
    }
}

fn pass_turn(state: &mut MatchState, events: &mut Vec<GameEvent>) {
    state.active_player = (state.active_player + 1) % PLAYER_COUNT;
    events.push(GameEvent::TurnPassed {
        to: state.active_player,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Roster, constants::FINAL_STEP};

    fn die(value: u8) -> DieValue {
        DieValue::try_from(value).unwrap()
    }

    fn place(state: &mut MatchState, piece: PieceId, position: TrackPosition, steps: u8) {
        let piece = state.piece_mut(piece).unwrap();
        piece.position = Some(position);
        piece.steps = steps;
    }

    fn finish(state: &mut MatchState, piece: PieceId) {
        let piece = state.piece_mut(piece).unwrap();
        piece.position = None;
        piece.steps = FINAL_STEP;
        piece.finished = true;
    }

    #[test]
    fn test_first_roll_starts_match() {
        let state = MatchState::default();
        let transition = state.roll(0, die(6)).unwrap();
        assert_eq!(transition.state.status(), MatchStatus::InProgress);
        assert_eq!(transition.state.pending_die(), Some(die(6)));
        assert_eq!(transition.state.turn_counter(), state.turn_counter() + 1);
        assert_eq!(transition.state.movable_pieces().len(), 4);
    }

    #[test]
    fn test_roll_without_moves_passes_turn() {
        let state = MatchState::default();
        let transition = state.roll(0, die(3)).unwrap();
        assert_eq!(transition.state.active_player(), 1);
        assert_eq!(transition.state.pending_die(), None);
        assert_eq!(transition.state.status(), MatchStatus::InProgress);
        assert_eq!(transition.state.turn_counter(), state.turn_counter() + 1);
        assert_eq!(
            transition.events,
            vec![
                GameEvent::Rolled {
                    player: 0,
                    value: die(3)
                },
                GameEvent::NoMovesAvailable {
                    player: 0,
                    value: die(3)
                },
                GameEvent::TurnPassed { to: 1 },
            ]
        );
    }

    #[test]
    fn test_player_one_forfeits_to_player_two() {
        let mut state = MatchState::default();
        state.active_player = 1;
        state.status = MatchStatus::InProgress;
        let transition = state.roll(1, die(3)).unwrap();
        assert_eq!(transition.state.active_player(), 2);
        assert_eq!(transition.state.pending_die(), None);
    }

    #[test]
    fn test_roll_twice_is_rejected() {
        let state = MatchState::default().roll(0, die(6)).unwrap().state;
        assert_eq!(state.roll(0, die(2)), Err(RuleViolation::DieAlreadyRolled));
    }

    #[test]
    fn test_roll_out_of_turn() {
        let state = MatchState::default();
        assert_eq!(
            state.roll(2, die(6)),
            Err(RuleViolation::OutOfTurn { active: 0 })
        );
        assert_eq!(state.roll(7, die(6)), Err(RuleViolation::UnknownPlayer(7)));
    }

    #[test]
    fn test_enter_with_six_grants_replay() {
        let state = MatchState::default().roll(0, die(6)).unwrap().state;
        let transition = state.propose_move(0, PieceId::new(0, 2), None).unwrap();
        let next = &transition.state;

        let piece = next.piece(PieceId::new(0, 2)).unwrap();
        assert_eq!(piece.position, Some(0));
        assert_eq!(piece.steps, 1);
        assert_eq!(next.active_player(), 0);
        assert_eq!(next.pending_die(), None);
        assert!(
            transition
                .events
                .contains(&GameEvent::ExtraTurn { player: 0 })
        );
    }

    #[test]
    fn test_ordinary_move_passes_turn() {
        let mut state = MatchState::default();
        place(&mut state, PieceId::new(0, 0), 4, 5);
        let state = state.roll(0, die(2)).unwrap().state;
        let next = state.propose_move(0, PieceId::new(0, 0), None).unwrap().state;
        assert_eq!(next.active_player(), 1);
        assert_eq!(next.piece(PieceId::new(0, 0)).unwrap().position, Some(6));
    }

    #[test]
    fn test_finishing_move_grants_single_replay() {
        let mut state = MatchState::default();
        place(&mut state, PieceId::new(0, 0), 48, 49);
        let state = state.roll(0, die(3)).unwrap().state;
        let transition = state.propose_move(0, PieceId::new(0, 0), None).unwrap();
        assert_eq!(transition.state.active_player(), 0);
        let replays = transition
            .events
            .iter()
            .filter(|event| matches!(event, GameEvent::ExtraTurn { .. }))
            .count();
        assert_eq!(replays, 1);
    }

    #[test]
    fn test_finishing_with_six_is_still_one_replay() {
        let mut state = MatchState::default();
        place(&mut state, PieceId::new(0, 0), 45, 46);
        let state = state.roll(0, die(6)).unwrap().state;
        let transition = state.propose_move(0, PieceId::new(0, 0), None).unwrap();
        let next = transition.state;
        assert!(next.piece(PieceId::new(0, 0)).unwrap().finished);
        assert_eq!(next.active_player(), 0);
        assert_eq!(next.pending_die(), None);
        assert!(next.roll(0, die(2)).is_ok());
    }

    #[test]
    fn test_win_finishes_match() {
        let mut state = MatchState::default();
        for index in 0..3 {
            finish(&mut state, PieceId::new(2, index));
        }
        place(&mut state, PieceId::new(2, 3), 24, 50);
        state.active_player = 2;
        state.status = MatchStatus::InProgress;

        let state = state.roll(2, die(2)).unwrap().state;
        let transition = state.propose_move(2, PieceId::new(2, 3), None).unwrap();
        let next = &transition.state;

        assert_eq!(next.status(), MatchStatus::Finished);
        assert_eq!(next.winner(), Some(2));
        assert_eq!(next.active_player(), 2);
        assert_eq!(next.pending_die(), None);
        assert_eq!(transition.completed(), Some(2));

        assert_eq!(next.roll(2, die(6)), Err(RuleViolation::MatchFinished));
        assert_eq!(
            next.propose_move(2, PieceId::new(2, 3), None),
            Err(RuleViolation::MatchFinished)
        );
    }

    #[test]
    fn test_rematch_only_after_finish() {
        let state = MatchState::default();
        assert_eq!(state.rematch(), Err(RuleViolation::MatchNotFinished));

        let mut finished = state.clone();
        finished.status = MatchStatus::Finished;
        finished.winner = Some(0);
        finished.turn_counter = 40;
        place(&mut finished, PieceId::new(1, 1), 30, 18);

        let transition = finished.rematch().unwrap();
        let next = transition.state;
        assert_eq!(next.status(), MatchStatus::Waiting);
        assert_eq!(next.winner(), None);
        assert_eq!(next.turn_counter(), 41);
        assert_eq!(next.players()[0].name, finished.players()[0].name);
        assert!(next.board().iter().all(|cell| cell.tokens.is_empty()));
        assert_eq!(transition.events, vec![GameEvent::Rematch]);
    }

    #[test]
    fn test_roll_with_rng_stays_in_range() {
        let mut rng = rand::rng();
        let state = MatchState::default();
        for _ in 0..50 {
            let transition = state.roll_with(0, &mut rng).unwrap();
            let GameEvent::Rolled { value, .. } = transition.events[0] else {
                panic!("first event must be the roll");
            };
            assert!((1..=6).contains(&value.get()));
        }
    }

    #[test]
    fn test_event_messages() {
        let event = GameEvent::NoMovesAvailable {
            player: 1,
            value: die(3),
        };
        assert_eq!(
            event.to_string(),
            "player 1 rolled a 3 but has no valid moves, passing turn"
        );
        assert_eq!(
            GameEvent::Won { player: 3 }.to_string(),
            "player 3 wins the match"
        );
    }

    #[test]
    fn test_transition_messages_use_display_names() {
        let transition = MatchState::default().roll(0, die(3)).unwrap();
        assert_eq!(
            transition.messages(),
            vec![
                "Crimson Captain rolled a 3.",
                "Crimson Captain rolled a 3 but has no valid moves. Passing turn.",
                "Emerald Enforcer, you're up!",
            ]
        );

        let roster = Roster::new(["Ann", "Ben", "Cat", "Dan"]).unwrap();
        let mut state = MatchState::new(&roster);
        state.status = MatchStatus::InProgress;
        place(&mut state, PieceId::new(0, 0), 4, 5);
        place(&mut state, PieceId::new(1, 0), 5, 45);
        let rolled = state.roll(0, die(1)).unwrap().state;
        let moved = rolled.propose_move(0, PieceId::new(0, 0), None).unwrap();
        let messages = moved.messages();
        assert!(messages.contains(&"Ann captured Ben's piece 1-0 at 5!".to_string()));
        assert_eq!(messages.last().unwrap(), "Ben, you're up!");
    }

    #[test]
    fn test_rematch_tolerates_unseated_player_ids() {
        let mut finished = MatchState::default();
        finished.status = MatchStatus::Finished;
        finished.winner = Some(0);
        finished.players[3].id = 9;

        let next = finished.rematch().unwrap().state;
        assert_eq!(next.players()[3].id, 9);
        assert!(next.players()[3].pieces.iter().all(Piece::is_in_yard));
    }
}
