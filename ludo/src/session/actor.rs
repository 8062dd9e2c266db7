//! Match actor implementation with async message handling.

use super::{
    MatchId,
    config::SessionConfig,
    errors::{MatchError, MatchResult},
    messages::{MatchEvent, MatchMessage, SubscriberId},
};
use crate::game::{
    MatchState, MatchView, PieceId, PlayerId, TrackPosition, Transition,
};
use rand::{SeedableRng, rngs::StdRng};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};

/// Match actor handle for sending messages
#[derive(Clone, Debug)]
pub struct MatchHandle {
    sender: mpsc::Sender<MatchMessage>,
    match_id: MatchId,
    event_capacity: usize,
}

impl MatchHandle {
    /// Create a new match handle
    pub fn new(sender: mpsc::Sender<MatchMessage>, match_id: MatchId, event_capacity: usize) -> Self {
        Self {
            sender,
            match_id,
            event_capacity,
        }
    }

    /// Get match ID
    pub fn match_id(&self) -> MatchId {
        self.match_id
    }

    /// Whether the actor behind this handle has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the match
    pub async fn send(&self, message: MatchMessage) -> MatchResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| MatchError::Closed(self.match_id))
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> MatchMessage,
    ) -> MatchResult<T> {
        let (tx, rx) = oneshot::channel();
        self.send(message(tx)).await?;
        rx.await.map_err(|_| MatchError::Closed(self.match_id))
    }

    pub async fn roll(&self, player: PlayerId) -> MatchResult<Transition> {
        self.request(|response| MatchMessage::Roll { player, response })
            .await?
    }

    pub async fn propose_move(
        &self,
        player: PlayerId,
        piece: PieceId,
        expected_turn_counter: u64,
        target: Option<TrackPosition>,
    ) -> MatchResult<Transition> {
        self.request(|response| MatchMessage::ProposeMove {
            player,
            piece,
            expected_turn_counter,
            target,
            response,
        })
        .await?
    }

    pub async fn rematch(&self) -> MatchResult<Transition> {
        self.request(|response| MatchMessage::Rematch { response })
            .await?
    }

    pub async fn state(&self) -> MatchResult<MatchState> {
        self.request(|response| MatchMessage::GetState { response })
            .await
    }

    pub async fn view(&self) -> MatchResult<MatchView> {
        self.request(|response| MatchMessage::GetView { response })
            .await
    }

    /// Registers a subscriber and returns its event stream. Re-using an id
    /// replaces the earlier subscription.
    pub async fn subscribe(
        &self,
        subscriber_id: SubscriberId,
    ) -> MatchResult<mpsc::Receiver<MatchEvent>> {
        let (sender, receiver) = mpsc::channel(self.event_capacity);
        self.send(MatchMessage::Subscribe {
            subscriber_id,
            sender,
        })
        .await?;
        Ok(receiver)
    }

    pub async fn unsubscribe(&self, subscriber_id: SubscriberId) -> MatchResult<()> {
        self.send(MatchMessage::Unsubscribe { subscriber_id }).await
    }

    pub async fn close(&self) -> MatchResult<()> {
        self.request(|response| MatchMessage::Close { response })
            .await
    }
}

/// Match actor owning the authoritative state of a single match
pub struct MatchActor {
    /// Match ID
    id: MatchId,

    /// Ground truth. Only ever replaced wholesale by an accepted transition.
    state: MatchState,

    /// Message inbox
    inbox: mpsc::Receiver<MatchMessage>,

    /// Dice source
    rng: StdRng,

    /// Subscribers for match events
    subscribers: HashMap<SubscriberId, mpsc::Sender<MatchEvent>>,

    /// Is match closed
    is_closed: bool,
}

impl MatchActor {
    /// Create a new match actor around an already validated state
    ///
    /// # Arguments
    ///
    /// * `id` - Match ID
    /// * `state` - Initial match state
    /// * `config` - Session configuration
    ///
    /// # Returns
    ///
    /// * `(MatchActor, MatchHandle)` - Actor and handle for sending messages
    ///
    /// # Panics
    ///
    /// Panics if `config` fails [`SessionConfig::validate`]. [`MatchManager`]
    /// checks this once when it's built.
    ///
    /// [`MatchManager`]: super::MatchManager
    pub fn new(id: MatchId, state: MatchState, config: &SessionConfig) -> (Self, MatchHandle) {
        let (sender, inbox) = mpsc::channel(config.inbox_capacity);

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id)),
            None => StdRng::from_os_rng(),
        };

        let actor = Self {
            id,
            state,
            inbox,
            rng,
            subscribers: HashMap::new(),
            is_closed: false,
        };

        let handle = MatchHandle::new(sender, id, config.event_capacity);

        (actor, handle)
    }

    /// Run the match actor event loop
    pub async fn run(mut self) {
        log::info!(
            "Match {} starting at turn {}",
            self.id,
            self.state.turn_counter()
        );

        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message);

            if self.is_closed {
                break;
            }
        }

        log::info!("Match {} closed", self.id);
    }

    /// Handle a match message
    fn handle_message(&mut self, message: MatchMessage) {
        match message {
            MatchMessage::Roll { player, response } => {
                let result = self.handle_roll(player);
                let _ = response.send(result);
            }

            MatchMessage::ProposeMove {
                player,
                piece,
                expected_turn_counter,
                target,
                response,
            } => {
                let result = self.handle_move(player, piece, expected_turn_counter, target);
                let _ = response.send(result);
            }

            MatchMessage::Rematch { response } => {
                let result = self.state.rematch().map_err(MatchError::from);
                let _ = response.send(result.map(|transition| self.commit(transition)));
            }

            MatchMessage::GetState { response } => {
                let _ = response.send(self.state.clone());
            }

            MatchMessage::GetView { response } => {
                let _ = response.send(self.state.view());
            }

            MatchMessage::Close { response } => {
                self.is_closed = true;
                let _ = response.send(());
            }

            MatchMessage::Subscribe {
                subscriber_id,
                sender,
            } => {
                self.subscribers.insert(subscriber_id, sender);
                log::debug!(
                    "Subscriber {} subscribed to match {}",
                    subscriber_id,
                    self.id
                );
            }

            MatchMessage::Unsubscribe { subscriber_id } => {
                self.subscribers.remove(&subscriber_id);
                log::debug!(
                    "Subscriber {} unsubscribed from match {}",
                    subscriber_id,
                    self.id
                );
            }
        }
    }

    fn handle_roll(&mut self, player: PlayerId) -> MatchResult<Transition> {
        let transition = self.state.roll_with(player, &mut self.rng)?;
        Ok(self.commit(transition))
    }

    fn handle_move(
        &mut self,
        player: PlayerId,
        piece: PieceId,
        expected_turn_counter: u64,
        target: Option<TrackPosition>,
    ) -> MatchResult<Transition> {
        let current = self.state.turn_counter();
        if expected_turn_counter != current {
            log::debug!(
                "Match {}: stale move from player {} (expected {}, at {})",
                self.id,
                player,
                expected_turn_counter,
                current
            );
            return Err(MatchError::Conflict {
                expected: expected_turn_counter,
                current,
            });
        }

        let transition = self.state.propose_move(player, piece, target)?;
        Ok(self.commit(transition))
    }

    /// Installs an accepted transition as the new ground truth and tells
    /// subscribers about it.
    fn commit(&mut self, transition: Transition) -> Transition {
        self.state = transition.state.clone();

        for event in &transition.events {
            log::debug!("Match {}: {}", self.id, event);
        }

        self.notify_subscribers(MatchEvent::StateChanged {
            match_id: self.id,
            snapshot: self.state.clone(),
            turn_counter: self.state.turn_counter(),
            events: transition.events.clone(),
        });

        if let Some(winner) = transition.completed() {
            log::info!("Match {} won by player {}", self.id, winner);
            self.notify_subscribers(MatchEvent::Completed {
                match_id: self.id,
                winner,
            });
        }

        transition
    }

    /// Broadcast an event to all subscribers
    fn notify_subscribers(&mut self, event: MatchEvent) {
        self.subscribers.retain(|subscriber_id, sender| {
            match sender.try_send(event.clone()) {
                Ok(_) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!(
                        "Subscriber {} channel full, dropping notification",
                        subscriber_id
                    );
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!("Subscriber {} disconnected, removing", subscriber_id);
                    false
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{MatchStatus, RuleViolation};

    fn spawn(state: MatchState, seed: u64) -> MatchHandle {
        let config = SessionConfig {
            rng_seed: Some(seed),
            ..SessionConfig::default()
        };
        let (actor, handle) = MatchActor::new(1, state, &config);
        tokio::spawn(actor.run());
        handle
    }

    #[tokio::test]
    async fn test_roll_advances_counter() {
        let handle = spawn(MatchState::default(), 7);
        let transition = handle.roll(0).await.unwrap();
        assert_eq!(transition.state.turn_counter(), 2);
        assert_eq!(transition.state.status(), MatchStatus::InProgress);

        let state = handle.state().await.unwrap();
        assert_eq!(state, transition.state);
    }

    #[tokio::test]
    async fn test_rule_violation_keeps_state() {
        let handle = spawn(MatchState::default(), 7);
        let err = handle.roll(3).await.unwrap_err();
        assert!(matches!(
            err,
            MatchError::Rule(RuleViolation::OutOfTurn { active: 0 })
        ));
        assert_eq!(handle.state().await.unwrap(), MatchState::default());
    }

    #[tokio::test]
    async fn test_stale_move_conflicts() {
        let handle = spawn(MatchState::default(), 7);
        let err = handle
            .propose_move(0, PieceId::new(0, 0), 99, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MatchError::Conflict {
                expected: 99,
                current: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_subscribers_see_every_commit() {
        let handle = spawn(MatchState::default(), 11);
        let mut events = handle.subscribe(5).await.unwrap();

        handle.roll(0).await.unwrap();
        match events.recv().await.unwrap() {
            MatchEvent::StateChanged {
                match_id,
                turn_counter,
                snapshot,
                ..
            } => {
                assert_eq!(match_id, 1);
                assert_eq!(turn_counter, 2);
                assert_eq!(snapshot.turn_counter(), 2);
            }
            other => panic!("unexpected event {other:?}"),
        }

        handle.unsubscribe(5).await.unwrap();
        let _ = handle.state().await.unwrap();
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_closed_match_refuses_requests() {
        let handle = spawn(MatchState::default(), 1);
        handle.close().await.unwrap();
        assert!(matches!(
            handle.state().await,
            Err(MatchError::Closed(1))
        ));
    }
}
