//! Session configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tuning for match actors and the manager that owns them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Capacity of each match actor's inbox
    pub inbox_capacity: usize,

    /// Capacity of each subscriber's event channel. A subscriber that falls
    /// this far behind misses notifications until it catches up.
    pub event_capacity: usize,

    /// Fixed seed for dice. Each match derives its own stream from it.
    /// `None` seeds from the OS.
    pub rng_seed: Option<u64>,

    /// Maximum number of live matches
    pub max_matches: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: 100,
            event_capacity: 32,
            rng_seed: None,
            max_matches: 1_000,
        }
    }
}

/// A [`SessionConfig`] field that can't be used as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionConfigError {
    #[error("Inbox capacity must be at least 1")]
    ZeroInboxCapacity,

    #[error("Event capacity must be at least 1")]
    ZeroEventCapacity,

    #[error("Max matches must be at least 1")]
    ZeroMaxMatches,
}

impl SessionConfig {
    /// Validate configuration
    ///
    /// Tokio channels can't be built with a zero buffer, so this has to pass
    /// before any actor is spawned from the config.
    pub fn validate(&self) -> Result<(), SessionConfigError> {
        if self.inbox_capacity == 0 {
            return Err(SessionConfigError::ZeroInboxCapacity);
        }

        if self.event_capacity == 0 {
            return Err(SessionConfigError::ZeroEventCapacity);
        }

        if self.max_matches == 0 {
            return Err(SessionConfigError::ZeroMaxMatches);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_capacities_rejected() {
        let config = SessionConfig {
            inbox_capacity: 0,
            ..SessionConfig::default()
        };
        assert_eq!(config.validate(), Err(SessionConfigError::ZeroInboxCapacity));

        let config = SessionConfig {
            event_capacity: 0,
            ..SessionConfig::default()
        };
        assert_eq!(config.validate(), Err(SessionConfigError::ZeroEventCapacity));

        let config = SessionConfig {
            max_matches: 0,
            ..SessionConfig::default()
        };
        assert_eq!(config.validate(), Err(SessionConfigError::ZeroMaxMatches));
    }
}
