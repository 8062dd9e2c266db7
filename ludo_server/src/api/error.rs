//! Mapping of session errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ludo::{MatchError, MatchId};
use serde::Serialize;

use crate::{logging, metrics};

/// JSON error body returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    /// Present on conflicts so the client can resync without another request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_turn_counter: Option<u64>,
}

/// Errors surfaced by the HTTP and WebSocket handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    /// Record a refused operation against a match and wrap it
    pub fn rejected(match_id: MatchId, operation: &str, error: MatchError) -> Self {
        match &error {
            MatchError::Conflict { .. } => {
                metrics::move_conflicts_total();
                logging::log_rejected(match_id, operation, &error.to_string(), true);
            }
            MatchError::Rule(_) => {
                metrics::rule_violations_total(operation);
                logging::log_rejected(match_id, operation, &error.to_string(), false);
            }
            _ => {}
        }
        Self::Match(error)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Match(error) => match error {
                MatchError::Rule(_) => StatusCode::UNPROCESSABLE_ENTITY,
                MatchError::Conflict { .. } => StatusCode::CONFLICT,
                MatchError::NotFound(_) => StatusCode::NOT_FOUND,
                MatchError::Closed(_) => StatusCode::GONE,
                MatchError::InvalidSnapshot(_) => StatusCode::BAD_REQUEST,
                MatchError::CapacityReached(_) => StatusCode::SERVICE_UNAVAILABLE,
                MatchError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Match(error) => match error {
                MatchError::Rule(_) => "rule_violation",
                MatchError::Conflict { .. } => "conflict",
                MatchError::NotFound(_) => "not_found",
                MatchError::Closed(_) => "closed",
                MatchError::InvalidSnapshot(_) => "invalid_snapshot",
                MatchError::CapacityReached(_) => "capacity_reached",
                MatchError::InvalidConfig(_) => "internal_error",
            },
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        let (error, current_turn_counter) = match self {
            Self::BadRequest(message) => (message.clone(), None),
            Self::Match(error @ MatchError::Conflict { current, .. }) => {
                (error.client_message(), Some(*current))
            }
            Self::Match(error) => (error.client_message(), None),
        };
        ErrorResponse {
            error,
            code: self.code(),
            current_turn_counter,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.to_error_response())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ludo::RuleViolation;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::Match(MatchError::Rule(RuleViolation::DieNotRolled)),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::Match(MatchError::Conflict {
                    expected: 3,
                    current: 4,
                }),
                StatusCode::CONFLICT,
            ),
            (ApiError::Match(MatchError::NotFound(9)), StatusCode::NOT_FOUND),
            (ApiError::Match(MatchError::Closed(9)), StatusCode::GONE),
            (
                ApiError::Match(MatchError::CapacityReached(1)),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::BadRequest("nope".to_string()),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.status(), status, "{error}");
        }
    }

    #[test]
    fn test_conflict_body_carries_current_counter() {
        let body = ApiError::Match(MatchError::Conflict {
            expected: 3,
            current: 4,
        })
        .to_error_response();
        assert_eq!(body.code, "conflict");
        assert_eq!(body.current_turn_counter, Some(4));
    }

    #[test]
    fn test_not_found_body_hides_match_id() {
        let body = ApiError::Match(MatchError::NotFound(12345)).to_error_response();
        assert_eq!(body.error, "Match not found");
        assert!(body.current_turn_counter.is_none());
    }
}
