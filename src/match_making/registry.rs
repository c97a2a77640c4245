//! The session registry : ownership and lifecycle of every running match.

use std::collections::HashMap;
use std::time::Instant;

use rand::Rng;

use crate::game::{Game, Side, TickOutcome};

/// Owner of the running [`Game`]s, indexed by match id and by participant identity. Insertion
/// and removal keep the two maps in lockstep, so an identity is "in a match" exactly as long as
/// that match is registered.
pub struct Registry {
    matches: HashMap<String, Game>,
    by_identity: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry {
            matches: HashMap::new(),
            by_identity: HashMap::new(),
        }
    }

    pub fn register(&mut self, game: Game) {
        for identity in game.player_ids() {
            self.by_identity
                .insert(String::from(identity), String::from(game.id()));
        }
        self.matches.insert(String::from(game.id()), game);
    }

    /// Remove a match and free its participants' identities. Returns the removed [`Game`] so the
    /// caller can still talk to its players, with no risk of a later tick referencing it.
    pub fn unregister(&mut self, match_id: &str) -> Option<Game> {
        let game = self.matches.remove(match_id)?;
        for identity in game.player_ids() {
            self.by_identity.remove(identity);
        }
        Some(game)
    }

    pub fn contains_identity(&self, identity: &str) -> bool {
        self.by_identity.contains_key(identity)
    }

    pub fn match_id_of(&self, identity: &str) -> Option<String> {
        self.by_identity.get(identity).cloned()
    }

    pub fn game_of_identity_mut(&mut self, identity: &str) -> Option<&mut Game> {
        let match_id = self.by_identity.get(identity)?;
        self.matches.get_mut(match_id)
    }

    /// Advance every match one step. Finished matches are unregistered before their result is
    /// announced ; a match whose simulation faulted is terminated in isolation and its players
    /// notified, without disturbing the other matches.
    pub fn tick_all<R: Rng + ?Sized>(&mut self, now: Instant, rng: &mut R) {
        let mut finished = Vec::<(String, Side)>::new();
        let mut faulted = Vec::<String>::new();
        for game in self.matches.values_mut() {
            match game.advance(now, rng) {
                Ok(TickOutcome::Continue) => (),
                Ok(TickOutcome::Finished { winner }) => {
                    finished.push((String::from(game.id()), winner));
                }
                Err(fault) => {
                    log::error!("terminating match {} : {fault}", game.id());
                    faulted.push(String::from(game.id()));
                }
            }
        }
        for (match_id, winner) in finished {
            if let Some(game) = self.unregister(&match_id) {
                game.announce_end(winner);
            }
        }
        for match_id in faulted {
            if let Some(game) = self.unregister(&match_id) {
                game.announce_abort();
            }
        }
    }
}
