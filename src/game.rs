//! Implementation of the logic of the Pong game.
//!
//! This mod defines the match aggregate [`Game`] : two players, their pads, the ball and the
//! status machine driving a match from its countdown to its end. A [`Game`] never touches the
//! network - it receives already-authenticated identities and parsed intents, and emits
//! [`ServerToClientMessage`]s through the per-player senders handed over by match-making. The
//! scheduler drives it through [`Game::advance`].

use std::time::Instant;

use rand::Rng;
use tokio::sync::mpsc;

pub use paddle::PadMovement;
pub use side::Side;

use ball::{Ball, ServeGenerator};
use paddle::Paddle;

use crate::protocol::constants::{
    BREAK_DURATION, COUNTDOWN_DURATION, COURT_BOUNDS_TOLERANCE, FORFEIT_GRACE, WIN_SCORE,
};
use crate::protocol::{
    ChatMessage, PositionUpdateMessage, ServerToClientMessage, StatusBreakMessage,
    StatusEndMessage, StatusInitMessage, StatusPlayMessage,
};

mod ball;
mod geometry;
mod paddle;
mod side;

/// Internal invariant failures. A match raising one of these has corrupted simulation state and
/// is terminated in isolation by its driver ; other matches are unaffected.
#[derive(thiserror::Error, Debug)]
pub enum SimFault {
    #[error("the {what} resolved outside the court, at ({x:.4}, {y:.4})")]
    OutOfBounds { what: &'static str, x: f64, y: f64 },

    #[error("swept collision resolution exceeded {cap} contacts within one tick")]
    BounceCapExceeded { cap: u32 },
}

/// Deterministic match id : the two identities, sorted and joined.
pub fn match_id(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}#{b}")
    } else {
        format!("{b}#{a}")
    }
}

/// One participant of a match : identity, score, pad and the outbound channel to their connection.
pub struct Player {
    id: String,
    score: u32,
    paddle: Paddle,
    sender: mpsc::UnboundedSender<ServerToClientMessage>,
}

impl Player {
    /// Creates a new [`Player`] with a fresh pad on the given [`Side`].
    pub fn new(
        id: String,
        side: Side,
        sender: mpsc::UnboundedSender<ServerToClientMessage>,
    ) -> Player {
        Player {
            id,
            score: 0,
            paddle: Paddle::new(side),
            sender,
        }
    }
}

/// Status of a match.
///
/// Every transition nulls the match's tick timestamp, so a later return to [`GameStatus::Play`]
/// starts from a zero delta instead of a stale, artificially large one. Deadlines live inside the
/// status value itself : destroying the match destroys its timers, nothing detached can fire
/// afterwards and revive it.
enum GameStatus {
    /// Pre-game countdown. Ends on its deadline ; player input has no effect on it.
    Init { until: Instant },
    Play,
    /// A participant disconnected. The match is forfeited to `winner` when the grace elapses.
    Pause { forfeit_at: Instant, winner: Side },
    /// Breather between two rallies.
    Break { until: Instant },
    End,
}

/// Signal returned by [`Game::advance`] to its driver.
#[must_use]
pub enum TickOutcome {
    Continue,
    /// The match is over. The driver must unregister it before announcing the result, so no
    /// further tick can reference a match its players already saw end.
    Finished { winner: Side },
}

/// Outcome of a participant's disconnection, decided by the match's current status.
pub enum DisconnectOutcome {
    /// The match paused and now waits out the forfeit grace period.
    Paused,
    /// Nobody is left to play or to tell : the match can be dropped silently.
    Abandoned,
}

/// The match aggregate. Owned by the session registry, driven by the scheduler.
pub struct Game {
    id: String,
    players: [Player; 2],
    ball: Ball,
    serve_generator: ServeGenerator,
    service_side: Side,
    status: GameStatus,
    last_tick: Option<Instant>,
}

impl Game {
    /// Create a match opposing the two [`Player`]s and broadcast the initial countdown.
    pub fn new<R: Rng + ?Sized>(left: Player, right: Player, now: Instant, rng: &mut R) -> Game {
        let service_side = rng.gen();
        let serve_generator = ServeGenerator::new();
        let ball = Ball::new(serve_generator.gen_direction(service_side, rng));
        let game = Game {
            id: match_id(&left.id, &right.id),
            players: [left, right],
            ball,
            serve_generator,
            service_side,
            status: GameStatus::Init {
                until: now + COUNTDOWN_DURATION,
            },
            last_tick: None,
        };
        game.broadcast(
            StatusInitMessage::new(
                COUNTDOWN_DURATION,
                &game.players[Side::Left.index()].id,
                &game.players[Side::Right.index()].id,
            )
            .into(),
        );
        game
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn player_ids(&self) -> [&str; 2] {
        [&self.players[0].id, &self.players[1].id]
    }

    /// Swap in a dead-horizontal rally between the two centered pads. With a long enough delta,
    /// no input can resolve it within the bounce cap.
    #[cfg(test)]
    pub(crate) fn force_flat_center_rally(&mut self) {
        use crate::protocol::constants::{COURT_HEIGHT, COURT_WIDTH};
        self.ball = Ball::with_state(
            geometry::Vec2::new(COURT_WIDTH / 2.0, COURT_HEIGHT / 2.0),
            geometry::Vec2::new(1.0, 0.0),
            false,
        );
    }

    fn side_of(&self, identity: &str) -> Option<Side> {
        if self.players[Side::Left.index()].id == identity {
            Some(Side::Left)
        } else if self.players[Side::Right.index()].id == identity {
            Some(Side::Right)
        } else {
            None
        }
    }

    /// Record a pad movement intent for the given identity, if they are part of this match. The
    /// intent is applied at the next tick ; the last write before it wins.
    pub fn set_movement(&mut self, identity: &str, movement: PadMovement) {
        if let Some(side) = self.side_of(identity) {
            self.players[side.index()].paddle.set_movement(movement);
        }
    }

    /// Relay an in-game chat line to both participants, tagged with its sender.
    pub fn relay_message(&self, from: &str, text: &str) {
        self.broadcast(ChatMessage::new(from, text).into());
    }

    /// Drive the match one step at time `now`.
    ///
    /// Only [`GameStatus::Play`] runs physics ; the other statuses merely check their deadlines.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        now: Instant,
        rng: &mut R,
    ) -> Result<TickOutcome, SimFault> {
        match self.status {
            GameStatus::Init { until } | GameStatus::Break { until } => {
                if now >= until {
                    self.enter_play();
                }
                Ok(TickOutcome::Continue)
            }
            GameStatus::Play => self.tick(now, rng),
            GameStatus::Pause { forfeit_at, winner } => {
                if now >= forfeit_at {
                    self.status = GameStatus::End;
                    self.last_tick = None;
                    Ok(TickOutcome::Finished { winner })
                } else {
                    Ok(TickOutcome::Continue)
                }
            }
            GameStatus::End => Ok(TickOutcome::Continue),
        }
    }

    fn enter_play(&mut self) {
        self.status = GameStatus::Play;
        self.last_tick = None;
        self.broadcast(
            StatusPlayMessage::new(self.players[0].score, self.players[1].score).into(),
        );
    }

    /// One PLAY tick : apply pad intents, sweep the ball, check the bounds invariant, then either
    /// broadcast positions or resolve the point scored.
    fn tick<R: Rng + ?Sized>(&mut self, now: Instant, rng: &mut R) -> Result<TickOutcome, SimFault> {
        let delta_time = self
            .last_tick
            .map_or(0.0, |previous| now.duration_since(previous).as_secs_f64());
        self.last_tick = Some(now);

        self.players[Side::Left.index()]
            .paddle
            .update(delta_time, &mut self.ball);
        self.players[Side::Right.index()]
            .paddle
            .update(delta_time, &mut self.ball);
        let l_pad_rect = self.players[Side::Left.index()].paddle.rect();
        let r_pad_rect = self.players[Side::Right.index()].paddle.rect();
        let crossed_wall = self.ball.update(delta_time, &l_pad_rect, &r_pad_rect)?;

        match crossed_wall {
            Some(wall) => self.score_point(!wall, now, rng),
            None => {
                self.check_court_bounds()?;
                self.broadcast(
                    PositionUpdateMessage::new(
                        self.players[Side::Left.index()].paddle.pos().y,
                        self.players[Side::Right.index()].paddle.pos().y,
                        self.ball.pos().x,
                        self.ball.pos().y,
                    )
                    .into(),
                );
                Ok(TickOutcome::Continue)
            }
        }
    }

    /// Credit a point, reset the rally, and move to BREAK - or straight to END on the winning
    /// point, bypassing the breather.
    fn score_point<R: Rng + ?Sized>(
        &mut self,
        scorer: Side,
        now: Instant,
        rng: &mut R,
    ) -> Result<TickOutcome, SimFault> {
        self.players[scorer.index()].score += 1;
        self.reset_rally(rng);
        self.last_tick = None;
        if self.players[scorer.index()].score >= WIN_SCORE {
            self.status = GameStatus::End;
            Ok(TickOutcome::Finished { winner: scorer })
        } else {
            self.status = GameStatus::Break {
                until: now + BREAK_DURATION,
            };
            self.broadcast(
                StatusBreakMessage::new(
                    BREAK_DURATION,
                    self.players[0].score,
                    self.players[1].score,
                )
                .into(),
            );
            Ok(TickOutcome::Continue)
        }
    }

    /// Put every simulated element back at its starting position, with the serve alternating
    /// between the two sides.
    fn reset_rally<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.players[0].paddle.reset();
        self.players[1].paddle.reset();
        self.service_side = !self.service_side;
        self.ball
            .reset(self.serve_generator.gen_direction(self.service_side, rng));
    }

    fn check_court_bounds(&self) -> Result<(), SimFault> {
        let ball_rect = self.ball.rect();
        if !ball_rect.within_court(COURT_BOUNDS_TOLERANCE) {
            return Err(SimFault::OutOfBounds {
                what: "ball",
                x: self.ball.pos().x,
                y: self.ball.pos().y,
            });
        }
        for player in &self.players {
            if !player.paddle.rect().within_court(COURT_BOUNDS_TOLERANCE) {
                return Err(SimFault::OutOfBounds {
                    what: "pad",
                    x: player.paddle.pos().x,
                    y: player.paddle.pos().y,
                });
            }
        }
        Ok(())
    }

    /// Handle a participant dropping their connection.
    pub fn player_disconnected(&mut self, identity: &str, now: Instant) -> DisconnectOutcome {
        let Some(side) = self.side_of(identity) else {
            return DisconnectOutcome::Paused;
        };
        match self.status {
            GameStatus::Pause { .. } | GameStatus::End => DisconnectOutcome::Abandoned,
            _ => {
                self.status = GameStatus::Pause {
                    forfeit_at: now + FORFEIT_GRACE,
                    winner: !side,
                };
                self.last_tick = None;
                DisconnectOutcome::Paused
            }
        }
    }

    /// Broadcast the final result. Called by the registry after the match has been unregistered,
    /// never before.
    pub fn announce_end(&self, winner: Side) {
        self.broadcast(
            StatusEndMessage::new(
                &self.players[winner.index()].id,
                self.players[0].score,
                self.players[1].score,
            )
            .into(),
        );
    }

    /// Broadcast the abort notice of a match terminated on an internal invariant failure.
    pub fn announce_abort(&self) {
        self.broadcast(ServerToClientMessage::aborted());
    }

    /// Fire-and-forget : a closed receiver means that connection is gone, which the
    /// disconnection path handles on its own.
    fn broadcast(&self, message: ServerToClientMessage) {
        for player in &self.players {
            let _ = player.sender.send(message.clone());
        }
    }
}
