use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

use super::{
    board::{self, BoardCell},
    constants::{
        BOARD_SIZE, DIE_FACES, FINAL_STEP, MAX_DISPLAY_NAME_LENGTH, PIECES_PER_PLAYER,
        PLAYER_COUNT, SEATS,
    },
};

/// Type alias for seat positions. Seat order is turn order.
pub type PlayerId = usize;

/// Type alias for a cell index on the shared ring (`0..BOARD_SIZE`).
pub type TrackPosition = u8;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
        };
        write!(f, "{repr}")
    }
}

/// A single face of the die. Construction is checked, so a `DieValue`
/// is always in `1..=6`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DieValue(u8);

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("die value {0} is outside 1..=6")]
pub struct InvalidDieValue(pub u8);

impl DieValue {
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Clamps into range. Only for values already drawn from `1..=6`.
    pub(crate) fn from_face(value: u8) -> Self {
        Self(value.clamp(1, DIE_FACES))
    }
}

impl TryFrom<u8> for DieValue {
    type Error = InvalidDieValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=DIE_FACES).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidDieValue(value))
        }
    }
}

impl From<DieValue> for u8 {
    fn from(value: DieValue) -> Self {
        value.0
    }
}

impl fmt::Display for DieValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Match-wide piece identifier, rendered as `"<player>-<index>"`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PieceId {
    pub player: PlayerId,
    pub index: usize,
}

impl PieceId {
    #[must_use]
    pub const fn new(player: PlayerId, index: usize) -> Self {
        Self { player, index }
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.player, self.index)
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("malformed piece id {0:?}, expected \"<player>-<index>\"")]
pub struct ParsePieceIdError(pub String);

impl FromStr for PieceId {
    type Err = ParsePieceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParsePieceIdError(s.to_string());
        let (player, index) = s.split_once('-').ok_or_else(malformed)?;
        Ok(Self {
            player: player.parse().map_err(|_| malformed())?,
            index: index.parse().map_err(|_| malformed())?,
        })
    }
}

impl Serialize for PieceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PieceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Where a piece currently is. Derived from the raw piece fields.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", content = "position", rename_all = "lowercase")]
pub enum PieceLocation {
    Yard,
    Track(TrackPosition),
    Finished,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Piece {
    pub id: PieceId,
    /// `None` while in the yard and after finishing.
    pub position: Option<TrackPosition>,
    pub steps: u8,
    pub finished: bool,
}

impl Piece {
    #[must_use]
    pub fn new(id: PieceId) -> Self {
        Self {
            id,
            position: None,
            steps: 0,
            finished: false,
        }
    }

    #[must_use]
    pub fn location(&self) -> PieceLocation {
        match (self.position, self.finished) {
            (_, true) => PieceLocation::Finished,
            (Some(position), false) => PieceLocation::Track(position),
            (None, false) => PieceLocation::Yard,
        }
    }

    #[must_use]
    pub fn is_in_yard(&self) -> bool {
        self.location() == PieceLocation::Yard
    }

    /// Whether the raw fields describe exactly one of yard, track or finished.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        match (self.position, self.finished) {
            (None, false) => self.steps == 0,
            (Some(position), false) => {
                position < BOARD_SIZE && (1..FINAL_STEP).contains(&self.steps)
            }
            (None, true) => self.steps == FINAL_STEP,
            (Some(_), true) => false,
        }
    }

    pub(crate) fn send_to_yard(&mut self) {
        self.position = None;
        self.steps = 0;
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: Color,
    pub start_offset: TrackPosition,
    pub pieces: Vec<Piece>,
}

impl Player {
    /// Seats a player with the fixed color and start offset of seat `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id >= PLAYER_COUNT`.
    #[must_use]
    pub fn new(id: PlayerId, name: String) -> Self {
        let seat = &SEATS[id];
        Self {
            id,
            name,
            color: seat.color,
            start_offset: seat.start_offset,
            pieces: (0..PIECES_PER_PLAYER)
                .map(|index| Piece::new(PieceId::new(id, index)))
                .collect(),
        }
    }

    #[must_use]
    pub fn all_finished(&self) -> bool {
        self.pieces.iter().all(|piece| piece.finished)
    }

    #[must_use]
    pub fn finished_count(&self) -> usize {
        self.pieces.iter().filter(|piece| piece.finished).count()
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RosterError {
    #[error("a match needs exactly {expected} players, got {got}")]
    WrongSize { expected: usize, got: usize },
    #[error("seat {0} has an empty display name")]
    EmptyName(PlayerId),
}

/// Display names for the four seats, in turn order.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Roster(Vec<String>);

impl Roster {
    /// Builds a roster from caller-supplied names. Names are trimmed and
    /// truncated; seats keep their fixed colors regardless of names.
    pub fn new<I, S>(names: I) -> Result<Self, RosterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(|name| {
                let truncated: String = name
                    .as_ref()
                    .trim()
                    .chars()
                    .take(MAX_DISPLAY_NAME_LENGTH)
                    .collect();
                truncated.trim_end().to_string()
            })
            .collect();
        if names.len() != PLAYER_COUNT {
            return Err(RosterError::WrongSize {
                expected: PLAYER_COUNT,
                got: names.len(),
            });
        }
        if let Some(seat) = names.iter().position(String::is_empty) {
            return Err(RosterError::EmptyName(seat));
        }
        Ok(Self(names))
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self(SEATS.iter().map(|seat| seat.name.to_string()).collect())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Waiting,
    InProgress,
    Finished,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::InProgress => "in progress",
            Self::Finished => "finished",
        };
        write!(f, "{repr}")
    }
}

/// Complete state of one match. This is the unit of persistence and
/// replication; the board is never stored, only derived via [`MatchState::board`].
///
/// Deserializing does not check any invariant. A state read from outside the
/// process must pass [`crate::session::snapshot::validate`] before it is
/// played; `snapshot::from_json` and `snapshot::from_bytes` do this.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MatchState {
    pub(crate) players: Vec<Player>,
    pub(crate) active_player: PlayerId,
    /// `None` means the active player must roll.
    pub(crate) pending_die: Option<DieValue>,
    pub(crate) status: MatchStatus,
    /// Bumped once per accepted mutation. Used as the compare-and-swap token.
    pub(crate) turn_counter: u64,
    pub(crate) winner: Option<PlayerId>,
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new(&Roster::default())
    }
}

impl MatchState {
    /// Creates a match with every piece in the yard, waiting for player 0 to roll.
    #[must_use]
    pub fn new(roster: &Roster) -> Self {
        Self {
            players: roster
                .names()
                .iter()
                .enumerate()
                .map(|(id, name)| Player::new(id, name.clone()))
                .collect(),
            active_player: 0,
            pending_die: None,
            status: MatchStatus::Waiting,
            turn_counter: 1,
            winner: None,
        }
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    #[must_use]
    pub fn active_player(&self) -> PlayerId {
        self.active_player
    }

    #[must_use]
    pub fn pending_die(&self) -> Option<DieValue> {
        self.pending_die
    }

    #[must_use]
    pub fn status(&self) -> MatchStatus {
        self.status
    }

    #[must_use]
    pub fn turn_counter(&self) -> u64 {
        self.turn_counter
    }

    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    #[must_use]
    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.players.get(id.player)?.pieces.get(id.index)
    }

    pub(crate) fn piece_mut(&mut self, id: PieceId) -> Option<&mut Piece> {
        self.players.get_mut(id.player)?.pieces.get_mut(id.index)
    }

    /// Projects the piece list onto the 52 ring cells.
    #[must_use]
    pub fn board(&self) -> Vec<BoardCell> {
        board::build_board(&self.players)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_die_value_bounds() {
        assert!(DieValue::try_from(0).is_err());
        assert_eq!(DieValue::try_from(1).unwrap().get(), 1);
        assert_eq!(DieValue::try_from(6).unwrap().get(), 6);
        assert_eq!(DieValue::try_from(7), Err(InvalidDieValue(7)));
    }

    #[test]
    fn test_die_value_rejects_out_of_range_json() {
        assert!(serde_json::from_str::<DieValue>("9").is_err());
        assert_eq!(serde_json::from_str::<DieValue>("4").unwrap().get(), 4);
    }

    #[test]
    fn test_piece_id_display_and_parse() {
        let id = PieceId::new(2, 3);
        assert_eq!(id.to_string(), "2-3");
        assert_eq!("2-3".parse::<PieceId>().unwrap(), id);
        assert!("23".parse::<PieceId>().is_err());
        assert!("a-1".parse::<PieceId>().is_err());
    }

    #[test]
    fn test_piece_id_serializes_as_string() {
        let json = serde_json::to_string(&PieceId::new(1, 0)).unwrap();
        assert_eq!(json, "\"1-0\"");
    }

    #[test]
    fn test_piece_locations() {
        let mut piece = Piece::new(PieceId::new(0, 0));
        assert_eq!(piece.location(), PieceLocation::Yard);
        assert!(piece.is_consistent());

        piece.position = Some(5);
        piece.steps = 6;
        assert_eq!(piece.location(), PieceLocation::Track(5));
        assert!(piece.is_consistent());

        piece.position = None;
        piece.steps = FINAL_STEP;
        piece.finished = true;
        assert_eq!(piece.location(), PieceLocation::Finished);
        assert!(piece.is_consistent());
    }

    #[test]
    fn test_inconsistent_pieces() {
        let mut piece = Piece::new(PieceId::new(0, 0));
        piece.steps = 3;
        assert!(!piece.is_consistent());

        piece.position = Some(60);
        assert!(!piece.is_consistent());

        piece.position = Some(3);
        piece.finished = true;
        assert!(!piece.is_consistent());
    }

    #[test]
    fn test_player_seats() {
        let player = Player::new(1, "Bob".to_string());
        assert_eq!(player.color, Color::Green);
        assert_eq!(player.start_offset, 13);
        assert_eq!(player.pieces.len(), PIECES_PER_PLAYER);
        assert!(player.pieces.iter().all(Piece::is_in_yard));
        assert_eq!(player.pieces[3].id, PieceId::new(1, 3));
    }

    #[test]
    fn test_roster_validation() {
        assert!(Roster::new(["a", "b", "c"]).is_err());
        assert_eq!(
            Roster::new(["a", " ", "c", "d"]),
            Err(RosterError::EmptyName(1))
        );

        let long = "x".repeat(100);
        let roster = Roster::new(["a", "b", "c", long.as_str()]).unwrap();
        assert_eq!(roster.names()[3].len(), MAX_DISPLAY_NAME_LENGTH);

        let spaced = format!("{} tail", "y".repeat(MAX_DISPLAY_NAME_LENGTH - 1));
        let roster = Roster::new(["a", "b", spaced.as_str(), "d"]).unwrap();
        assert_eq!(roster.names()[2], "y".repeat(MAX_DISPLAY_NAME_LENGTH - 1));
    }

    #[test]
    fn test_new_match() {
        let state = MatchState::default();
        assert_eq!(state.players().len(), PLAYER_COUNT);
        assert_eq!(state.status(), MatchStatus::Waiting);
        assert_eq!(state.active_player(), 0);
        assert_eq!(state.pending_die(), None);
        assert_eq!(state.turn_counter(), 1);
        assert_eq!(state.winner(), None);
        assert_eq!(state.players()[0].name, "Crimson Captain");
        assert_eq!(state.players()[3].color, Color::Blue);
    }
}
