//! Match manager for spawning and managing multiple match actors.

use super::{
    MatchId,
    actor::{MatchActor, MatchHandle},
    config::SessionConfig,
    errors::{MatchError, MatchResult},
    messages::{MatchEvent, SubscriberId},
    snapshot,
};
use crate::game::{
    MatchState, MatchStatus, MatchView, PieceId, PlayerId, Roster, TrackPosition, Transition,
};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{RwLock, mpsc};

/// Match metadata for discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchMetadata {
    pub id: MatchId,
    pub status: MatchStatus,
    pub players: Vec<String>,
    pub active_player: PlayerId,
    pub turn_counter: u64,
    pub winner: Option<PlayerId>,
}

impl MatchMetadata {
    fn from_state(id: MatchId, state: &MatchState) -> Self {
        Self {
            id,
            status: state.status(),
            players: state
                .players()
                .iter()
                .map(|player| player.name.clone())
                .collect(),
            active_player: state.active_player(),
            turn_counter: state.turn_counter(),
            winner: state.winner(),
        }
    }
}

/// Match manager for managing multiple match instances
#[derive(Clone)]
pub struct MatchManager {
    /// Session configuration shared by every actor
    config: SessionConfig,

    /// Live match handles
    matches: Arc<RwLock<HashMap<MatchId, MatchHandle>>>,

    /// Next match ID
    next_match_id: Arc<RwLock<MatchId>>,
}

impl MatchManager {
    /// Create a new match manager
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::InvalidConfig`] if a capacity in `config` is zero.
    pub fn new(config: SessionConfig) -> MatchResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            matches: Arc::new(RwLock::new(HashMap::new())),
            next_match_id: Arc::new(RwLock::new(1)),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create and spawn a fresh match
    ///
    /// # Arguments
    ///
    /// * `roster` - Display names for the four seats
    ///
    /// # Returns
    ///
    /// * `MatchResult<MatchId>` - ID of the new match
    pub async fn create_match(&self, roster: Roster) -> MatchResult<MatchId> {
        let state = MatchState::new(&roster);
        let match_id = self.spawn(state).await?;
        log::info!("Created match {}", match_id);
        Ok(match_id)
    }

    /// Spawn a match from a persisted state. The state is validated first
    /// and refused if it could not have been produced by the engine.
    pub async fn restore_match(&self, state: MatchState) -> MatchResult<MatchId> {
        snapshot::validate(&state)?;
        let turn_counter = state.turn_counter();
        let match_id = self.spawn(state).await?;
        log::info!("Restored match {} at turn {}", match_id, turn_counter);
        Ok(match_id)
    }

    /// Decode, validate and spawn a JSON snapshot
    pub async fn restore_from_json(&self, json: &str) -> MatchResult<MatchId> {
        let state = snapshot::from_json(json)?;
        self.restore_match(state).await
    }

    /// Decode, validate and spawn a binary snapshot
    pub async fn restore_from_bytes(&self, bytes: &[u8]) -> MatchResult<MatchId> {
        let state = snapshot::from_bytes(bytes)?;
        self.restore_match(state).await
    }

    async fn spawn(&self, state: MatchState) -> MatchResult<MatchId> {
        // Hold the write lock across the capacity check and insert so two
        // creations can't both take the last slot.
        let mut matches = self.matches.write().await;
        if matches.len() >= self.config.max_matches {
            return Err(MatchError::CapacityReached(self.config.max_matches));
        }

        let mut next_id = self.next_match_id.write().await;
        let match_id = *next_id;
        *next_id += 1;
        drop(next_id);

        let (actor, handle) = MatchActor::new(match_id, state, &self.config);
        matches.insert(match_id, handle);
        drop(matches);

        tokio::spawn(async move {
            actor.run().await;
        });

        Ok(match_id)
    }

    /// Get a match handle
    pub async fn get_match(&self, match_id: MatchId) -> Option<MatchHandle> {
        let matches = self.matches.read().await;
        matches.get(&match_id).cloned()
    }

    async fn handle(&self, match_id: MatchId) -> MatchResult<MatchHandle> {
        self.get_match(match_id)
            .await
            .ok_or(MatchError::NotFound(match_id))
    }

    pub async fn roll(&self, match_id: MatchId, player: PlayerId) -> MatchResult<Transition> {
        self.handle(match_id).await?.roll(player).await
    }

    pub async fn propose_move(
        &self,
        match_id: MatchId,
        player: PlayerId,
        piece: PieceId,
        expected_turn_counter: u64,
        target: Option<TrackPosition>,
    ) -> MatchResult<Transition> {
        self.handle(match_id)
            .await?
            .propose_move(player, piece, expected_turn_counter, target)
            .await
    }

    pub async fn rematch(&self, match_id: MatchId) -> MatchResult<Transition> {
        self.handle(match_id).await?.rematch().await
    }

    pub async fn state(&self, match_id: MatchId) -> MatchResult<MatchState> {
        self.handle(match_id).await?.state().await
    }

    pub async fn view(&self, match_id: MatchId) -> MatchResult<MatchView> {
        self.handle(match_id).await?.view().await
    }

    pub async fn subscribe(
        &self,
        match_id: MatchId,
        subscriber_id: SubscriberId,
    ) -> MatchResult<mpsc::Receiver<MatchEvent>> {
        self.handle(match_id).await?.subscribe(subscriber_id).await
    }

    pub async fn unsubscribe(
        &self,
        match_id: MatchId,
        subscriber_id: SubscriberId,
    ) -> MatchResult<()> {
        self.handle(match_id)
            .await?
            .unsubscribe(subscriber_id)
            .await
    }

    /// List all live matches, ordered by id
    pub async fn list_matches(&self) -> Vec<MatchMetadata> {
        let handles: Vec<MatchHandle> = {
            let matches = self.matches.read().await;
            matches.values().cloned().collect()
        };

        let mut metadata_list = Vec::with_capacity(handles.len());
        for handle in handles {
            // A match closing concurrently is simply left out.
            if let Ok(state) = handle.state().await {
                metadata_list.push(MatchMetadata::from_state(handle.match_id(), &state));
            }
        }
        metadata_list.sort_by_key(|metadata| metadata.id);

        metadata_list
    }

    /// Close a match and forget it
    pub async fn close_match(&self, match_id: MatchId) -> MatchResult<()> {
        let handle = {
            let mut matches = self.matches.write().await;
            matches.remove(&match_id)
        }
        .ok_or(MatchError::NotFound(match_id))?;

        // The actor may already be gone; the match is removed either way.
        if let Err(e) = handle.close().await {
            log::debug!("Match {} was already stopped: {}", match_id, e);
        }

        log::info!("Closed match {}", match_id);

        Ok(())
    }

    /// Get live match count
    pub async fn match_count(&self) -> usize {
        let matches = self.matches.read().await;
        matches.len()
    }
}
