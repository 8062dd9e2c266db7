//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use ludo::{SessionConfig, SessionConfigError};
use std::net::SocketAddr;

const DEFAULT_BIND: &str = "127.0.0.1:6969";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus scrape endpoint; metrics are disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Match actor and manager tuning
    pub session: SessionConfig,
    /// Number of matches to create on startup
    pub initial_matches: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `initial_matches_override` - Optional number of startup matches (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but can't be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        initial_matches_override: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_or("SERVER_BIND", default_bind())?,
        };

        let metrics_bind = parse_env_opt("METRICS_BIND")?;

        let defaults = SessionConfig::default();
        let session = SessionConfig {
            inbox_capacity: parse_env_or("MATCH_INBOX_CAPACITY", defaults.inbox_capacity)?,
            event_capacity: parse_env_or("MATCH_EVENT_CAPACITY", defaults.event_capacity)?,
            rng_seed: parse_env_opt("MATCH_RNG_SEED")?,
            max_matches: parse_env_or("MAX_MATCHES", defaults.max_matches)?,
        };

        let initial_matches = match initial_matches_override {
            Some(count) => count,
            None => parse_env_or("INITIAL_MATCHES", 1)?,
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            session,
            initial_matches,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate().map_err(|e| {
            let var = match e {
                SessionConfigError::ZeroInboxCapacity => "MATCH_INBOX_CAPACITY",
                SessionConfigError::ZeroEventCapacity => "MATCH_EVENT_CAPACITY",
                SessionConfigError::ZeroMaxMatches => "MAX_MATCHES",
            };
            ConfigError::Invalid {
                var: var.to_string(),
                reason: e.to_string(),
            }
        })?;

        if self.initial_matches > self.session.max_matches {
            return Err(ConfigError::Invalid {
                var: "INITIAL_MATCHES".to_string(),
                reason: format!(
                    "Cannot exceed max matches ({})",
                    self.session.max_matches
                ),
            });
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from server bind address ({})", self.bind),
            });
        }

        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_bind: None,
            session: SessionConfig::default(),
            initial_matches: 1,
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6969))
}

/// Helper to parse an optional environment variable. Unset or empty means `None`.
fn parse_env_opt<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::Invalid {
                    var: key.to_string(),
                    reason: format!("{raw:?}: {e}"),
                })
        }
        _ => Ok(None),
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_env_opt(key)?.unwrap_or(default))
}
