//! Session error types.

use thiserror::Error;

use super::{MatchId, config::SessionConfigError, snapshot::SnapshotError};
use crate::game::RuleViolation;

/// Session errors
#[derive(Debug, Error)]
pub enum MatchError {
    /// The engine refused the operation
    #[error(transparent)]
    Rule(#[from] RuleViolation),

    /// The move was computed against a stale state
    #[error("Stale turn counter: expected {expected}, match is at {current}")]
    Conflict { expected: u64, current: u64 },

    /// No such match
    #[error("Match {0} not found")]
    NotFound(MatchId),

    /// The match actor has shut down
    #[error("Match {0} is closed")]
    Closed(MatchId),

    /// A snapshot failed to decode or validate
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(#[from] SnapshotError),

    /// Too many live matches
    #[error("Match limit of {0} reached")]
    CapacityReached(usize),

    /// The manager was handed a config it can't run with
    #[error("Invalid session config: {0}")]
    InvalidConfig(#[from] SessionConfigError),
}

impl MatchError {
    /// Get a client-safe error message that doesn't leak internal details
    ///
    /// Match ids are redacted and decoder internals are replaced with a
    /// generic message.
    pub fn client_message(&self) -> String {
        match self {
            MatchError::NotFound(_) => "Match not found".to_string(),
            MatchError::Closed(_) => "Match is closed".to_string(),
            MatchError::CapacityReached(_) => "Server is at match capacity".to_string(),
            MatchError::InvalidSnapshot(SnapshotError::Json(_) | SnapshotError::Decode(_)) => {
                "Invalid snapshot: malformed payload".to_string()
            }
            MatchError::InvalidSnapshot(SnapshotError::Encode(_)) | MatchError::InvalidConfig(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for session operations
pub type MatchResult<T> = Result<T, MatchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::PieceId;

    #[test]
    fn test_rule_violation_passes_through() {
        let err = MatchError::from(RuleViolation::NotYourPiece(PieceId::new(2, 1)));
        assert_eq!(err.client_message(), "piece 2-1 belongs to another player");
    }

    #[test]
    fn test_ids_are_redacted() {
        assert_eq!(MatchError::NotFound(42).client_message(), "Match not found");
        assert_eq!(MatchError::Closed(42).client_message(), "Match is closed");
        assert!(MatchError::NotFound(42).to_string().contains("42"));
    }

    #[test]
    fn test_conflict_message() {
        let err = MatchError::Conflict {
            expected: 3,
            current: 5,
        };
        assert_eq!(
            err.client_message(),
            "Stale turn counter: expected 3, match is at 5"
        );
    }

    #[test]
    fn test_decoder_details_hidden() {
        let json_err = serde_json::from_str::<u8>("nope").unwrap_err();
        let err = MatchError::from(SnapshotError::from(json_err));
        assert_eq!(err.client_message(), "Invalid snapshot: malformed payload");
    }
}
