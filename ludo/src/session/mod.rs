//! Session module providing single-writer matches with an async actor model.
//!
//! This module implements:
//! - MatchActor: Async actor owning the state of a single match
//! - MatchManager: Spawns, lists, restores and closes match actors
//! - Compare-and-swap on the turn counter for move proposals
//! - Snapshot validation plus JSON and binary codecs
//!
//! ## Architecture
//!
//! Each match runs in a separate Tokio task with an mpsc message inbox. The
//! actor is the only writer of its `MatchState`; every accepted mutation is
//! fanned out to subscribers as a [`MatchEvent`].
//!
//! ## Example
//!
//! ```no_run
//! use ludo::{MatchManager, Roster, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ludo::MatchError> {
//!     let manager = MatchManager::new(SessionConfig::default())?;
//!     let match_id = manager.create_match(Roster::default()).await?;
//!
//!     let mut events = manager.subscribe(match_id, 1).await?;
//!     let rolled = manager.roll(match_id, 0).await?;
//!
//!     if let Some(&piece) = rolled.state.movable_pieces().first() {
//!         let counter = rolled.state.turn_counter();
//!         manager.propose_move(match_id, 0, piece, counter, None).await?;
//!     }
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;
pub mod snapshot;

/// Identifies a live match within one manager.
pub type MatchId = u64;

pub use actor::{MatchActor, MatchHandle};
pub use config::{SessionConfig, SessionConfigError};
pub use errors::{MatchError, MatchResult};
pub use manager::{MatchManager, MatchMetadata};
pub use messages::{MatchEvent, MatchMessage, SubscriberId};
pub use snapshot::SnapshotError;
