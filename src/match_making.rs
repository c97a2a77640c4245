//! Pairing of queued players into matches, and the bookkeeping of running matches.
//!
//! The [`MatchMaker`] is the single entry point connections talk to : queueing, dequeueing,
//! movement intents, chat relaying and disconnections all land here, get routed under one lock,
//! and come out as calls on the right [`Game`]. Its waiting line holds at most one player - the
//! second one to ask completes the pair and the match starts immediately.

use std::sync::Mutex;
use std::time::Instant;

use rand::Rng;
use tokio::sync::mpsc;

use registry::Registry;

use crate::game::{DisconnectOutcome, Game, PadMovement, Player, Side};
use crate::protocol::ServerToClientMessage;

pub mod registry;

/// Outbound channel of one connection, as handed to match-making at queue time.
///
/// Unbounded : at the simulation cadence a healthy connection drains it within a tick, but a
/// client stalling its receive window grows the queue until its connection goes away. Sends
/// never block the tick.
pub type BroadcastSender = mpsc::UnboundedSender<ServerToClientMessage>;

/// Reasons a queue request can be turned down.
#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum QueueError {
    #[error("player {0} is already part of a running match")]
    AlreadyInMatch(String),
}

struct WaitingPlayer {
    id: String,
    sender: BroadcastSender,
}

struct MatchMakingState {
    waiting: Option<WaitingPlayer>,
    registry: Registry,
}

/// The match-making service. One instance per server, shared by every connection task and by the
/// scheduler.
pub struct MatchMaker {
    state: Mutex<MatchMakingState>,
}

impl MatchMaker {
    pub fn new() -> MatchMaker {
        MatchMaker {
            state: Mutex::new(MatchMakingState {
                waiting: None,
                registry: Registry::new(),
            }),
        }
    }

    /// Put `identity` in the waiting line, or start a match right away if someone is already
    /// there. Queueing twice from the waiting line is a no-op ; queueing while playing is refused.
    pub fn queue<R: Rng + ?Sized>(
        &self,
        identity: &str,
        sender: BroadcastSender,
        now: Instant,
        rng: &mut R,
    ) -> Result<(), QueueError> {
        // Safety : lock() only fails if another thread panicked while holding the lock.
        let mut state = self.state.lock().unwrap();
        if state.registry.contains_identity(identity) {
            return Err(QueueError::AlreadyInMatch(String::from(identity)));
        }
        match state.waiting.take() {
            None => {
                state.waiting = Some(WaitingPlayer {
                    id: String::from(identity),
                    sender,
                });
            }
            Some(opponent) if opponent.id == identity => {
                // Same player asking again : keep them in line, with their latest channel.
                state.waiting = Some(WaitingPlayer {
                    id: opponent.id,
                    sender,
                });
            }
            Some(opponent) => {
                log::info!("starting a match between {} and {identity}", opponent.id);
                let left = Player::new(opponent.id, Side::Left, opponent.sender);
                let right = Player::new(String::from(identity), Side::Right, sender);
                state.registry.register(Game::new(left, right, now, rng));
            }
        }
        Ok(())
    }

    /// Leave the waiting line. Does nothing if `identity` is not in it, including when they are
    /// already playing : a started match is not backed out of this way.
    pub fn dequeue(&self, identity: &str) {
        // Safety : lock() only fails if another thread panicked while holding the lock.
        let mut state = self.state.lock().unwrap();
        if state
            .waiting
            .as_ref()
            .is_some_and(|waiting| waiting.id == identity)
        {
            state.waiting = None;
        }
    }

    /// Route a pad movement intent to the match `identity` plays in, if any.
    pub fn movement(&self, identity: &str, movement: PadMovement) {
        // Safety : lock() only fails if another thread panicked while holding the lock.
        let mut state = self.state.lock().unwrap();
        if let Some(game) = state.registry.game_of_identity_mut(identity) {
            game.set_movement(identity, movement);
        }
    }

    /// Relay a chat line to both participants of the match `identity` plays in, if any.
    pub fn in_game_message(&self, identity: &str, text: &str) {
        // Safety : lock() only fails if another thread panicked while holding the lock.
        let mut state = self.state.lock().unwrap();
        if let Some(game) = state.registry.game_of_identity_mut(identity) {
            game.relay_message(identity, text);
        }
    }

    /// Handle the loss of `identity`'s connection, wherever they were : the waiting line is
    /// cleared, a running match pauses, and a match already waiting on its other player is
    /// dropped with nobody left to tell.
    pub fn disconnect(&self, identity: &str, now: Instant) {
        // Safety : lock() only fails if another thread panicked while holding the lock.
        let mut state = self.state.lock().unwrap();
        if state
            .waiting
            .as_ref()
            .is_some_and(|waiting| waiting.id == identity)
        {
            state.waiting = None;
            return;
        }
        let Some(match_id) = state.registry.match_id_of(identity) else {
            return;
        };
        let Some(game) = state.registry.game_of_identity_mut(identity) else {
            return;
        };
        match game.player_disconnected(identity, now) {
            DisconnectOutcome::Paused => (),
            DisconnectOutcome::Abandoned => {
                state.registry.unregister(&match_id);
            }
        }
    }

    /// Advance every running match one step. Called by the scheduler at the simulation cadence.
    pub fn tick_all<R: Rng + ?Sized>(&self, now: Instant, rng: &mut R) {
        // Safety : lock() only fails if another thread panicked while holding the lock.
        let mut state = self.state.lock().unwrap();
        state.registry.tick_all(now, rng);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use crate::protocol::constants::{COUNTDOWN_DURATION, FORFEIT_GRACE};

    use super::*;

    fn channel() -> (BroadcastSender, UnboundedReceiver<ServerToClientMessage>) {
        mpsc::unbounded_channel()
    }

    fn rng() -> rand::rngs::ThreadRng {
        rand::thread_rng()
    }

    #[test]
    fn first_player_waits_second_player_starts_the_match() {
        let match_maker = MatchMaker::new();
        let now = Instant::now();
        let (a_tx, mut a_rx) = channel();
        let (b_tx, mut b_rx) = channel();

        assert_eq!(match_maker.queue("ayo", a_tx, now, &mut rng()), Ok(()));
        assert!(a_rx.try_recv().is_err());

        assert_eq!(match_maker.queue("bee", b_tx, now, &mut rng()), Ok(()));
        assert!(matches!(
            a_rx.try_recv(),
            Ok(ServerToClientMessage::StatusInit(_))
        ));
        assert!(matches!(
            b_rx.try_recv(),
            Ok(ServerToClientMessage::StatusInit(_))
        ));

        let state = match_maker.state.lock().unwrap();
        assert!(state.waiting.is_none());
        assert!(state.registry.contains_identity("ayo"));
        assert!(state.registry.contains_identity("bee"));
    }

    #[test]
    fn queueing_twice_from_the_waiting_line_is_a_no_op() {
        let match_maker = MatchMaker::new();
        let now = Instant::now();
        let (tx_1, _rx_1) = channel();
        let (tx_2, _rx_2) = channel();
        assert_eq!(match_maker.queue("ayo", tx_1, now, &mut rng()), Ok(()));
        assert_eq!(match_maker.queue("ayo", tx_2, now, &mut rng()), Ok(()));

        let state = match_maker.state.lock().unwrap();
        assert!(state
            .waiting
            .as_ref()
            .is_some_and(|waiting| waiting.id == "ayo"));
        assert!(!state.registry.contains_identity("ayo"));
    }

    #[test]
    fn queueing_while_playing_is_refused() {
        let match_maker = MatchMaker::new();
        let now = Instant::now();
        let (a_tx, _a_rx) = channel();
        let (b_tx, _b_rx) = channel();
        let (again_tx, _again_rx) = channel();
        match_maker.queue("ayo", a_tx, now, &mut rng()).unwrap();
        match_maker.queue("bee", b_tx, now, &mut rng()).unwrap();

        assert_eq!(
            match_maker.queue("ayo", again_tx, now, &mut rng()),
            Err(QueueError::AlreadyInMatch(String::from("ayo")))
        );
    }

    #[test]
    fn dequeue_clears_the_waiting_line_only_for_its_owner() {
        let match_maker = MatchMaker::new();
        let now = Instant::now();
        let (tx, _rx) = channel();
        match_maker.queue("ayo", tx, now, &mut rng()).unwrap();

        match_maker.dequeue("bee");
        assert!(match_maker.state.lock().unwrap().waiting.is_some());
        match_maker.dequeue("ayo");
        assert!(match_maker.state.lock().unwrap().waiting.is_none());
    }

    #[test]
    fn disconnect_while_waiting_frees_the_line() {
        let match_maker = MatchMaker::new();
        let now = Instant::now();
        let (tx, _rx) = channel();
        match_maker.queue("ayo", tx, now, &mut rng()).unwrap();
        match_maker.disconnect("ayo", now);
        assert!(match_maker.state.lock().unwrap().waiting.is_none());
    }

    #[test]
    fn forfeit_after_disconnection_ends_and_unregisters_the_match() {
        let match_maker = MatchMaker::new();
        let now = Instant::now();
        let (a_tx, _a_rx) = channel();
        let (b_tx, mut b_rx) = channel();
        match_maker.queue("ayo", a_tx, now, &mut rng()).unwrap();
        match_maker.queue("bee", b_tx, now, &mut rng()).unwrap();
        let play_at = now + COUNTDOWN_DURATION;
        match_maker.tick_all(play_at, &mut rng());

        match_maker.disconnect("ayo", play_at);
        match_maker.tick_all(play_at + Duration::from_secs(1), &mut rng());
        assert!(match_maker
            .state
            .lock()
            .unwrap()
            .registry
            .contains_identity("bee"));

        match_maker.tick_all(play_at + FORFEIT_GRACE, &mut rng());
        let state = match_maker.state.lock().unwrap();
        assert!(!state.registry.contains_identity("ayo"));
        assert!(!state.registry.contains_identity("bee"));
        drop(state);

        let mut saw_end = false;
        while let Ok(message) = b_rx.try_recv() {
            if matches!(message, ServerToClientMessage::StatusEnd(_)) {
                saw_end = true;
            }
        }
        assert!(saw_end);

        // Both seats are free again.
        let (tx, _rx) = channel();
        assert_eq!(match_maker.queue("bee", tx, now, &mut rng()), Ok(()));
    }

    #[test]
    fn second_disconnection_drops_the_match_silently() {
        let match_maker = MatchMaker::new();
        let now = Instant::now();
        let (a_tx, _a_rx) = channel();
        let (b_tx, _b_rx) = channel();
        match_maker.queue("ayo", a_tx, now, &mut rng()).unwrap();
        match_maker.queue("bee", b_tx, now, &mut rng()).unwrap();

        match_maker.disconnect("ayo", now);
        match_maker.disconnect("bee", now);
        let state = match_maker.state.lock().unwrap();
        assert!(!state.registry.contains_identity("ayo"));
        assert!(!state.registry.contains_identity("bee"));
    }
}
