//! The pads : movement intents, clamped vertical travel and the ball-yielding rule.

use crate::game::ball::Ball;
use crate::game::geometry::{Rect, Vec2};
use crate::game::side::Side;
use crate::protocol::constants::{
    BALL_HALF_EXTENT, COURT_HEIGHT, LEFT_PAD_X, PAD_HALF_HEIGHT, PAD_HALF_WIDTH, PAD_SPEED,
    RIGHT_PAD_X,
};

/// A movement intent for a pad.
///
/// Single-valued and last-write-wins : intents set between two ticks overwrite each other, and
/// only the one in place when the tick runs is applied.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum PadMovement {
    Up,
    Down,
    #[default]
    Still,
}

/// A player's pad. The horizontal center is fixed per [`Side`] ; only the vertical center moves.
#[derive(Clone, Debug)]
pub struct Paddle {
    pos: Vec2,
    movement: PadMovement,
}

impl Paddle {
    pub(super) fn new(side: Side) -> Paddle {
        let x = match side {
            Side::Left => LEFT_PAD_X,
            Side::Right => RIGHT_PAD_X,
        };
        Paddle {
            pos: Vec2::new(x, COURT_HEIGHT / 2.0),
            movement: PadMovement::Still,
        }
    }

    /// Record a movement intent, applied from the next tick onwards.
    pub(super) fn set_movement(&mut self, movement: PadMovement) {
        self.movement = movement;
    }

    /// Put the pad back at its starting height for a new rally. The movement intent is kept : the
    /// player is still holding whatever key they were holding.
    pub(super) fn reset(&mut self) {
        self.pos.y = COURT_HEIGHT / 2.0;
    }

    pub(super) fn pos(&self) -> Vec2 {
        self.pos
    }

    pub(super) fn rect(&self) -> Rect {
        Rect::from_center(self.pos, PAD_HALF_WIDTH, PAD_HALF_HEIGHT)
    }

    /// Apply the current movement intent over `delta_time` seconds.
    ///
    /// The pad's rectangle always stays fully inside the court. The pad is never blocked by a
    /// ball that has passed its plane : a ball the new rectangle would overlap is pushed flush
    /// against the pad's leading edge instead. The one exception is the court boundary, where
    /// the move is rejected outright so the ball cannot be squeezed out of the court.
    pub(super) fn update(&mut self, delta_time: f64, ball: &mut Ball) {
        let step = match self.movement {
            PadMovement::Still => return,
            PadMovement::Up => -PAD_SPEED * delta_time,
            PadMovement::Down => PAD_SPEED * delta_time,
        };
        let new_y = f64::clamp(
            self.pos.y + step,
            PAD_HALF_HEIGHT,
            COURT_HEIGHT - PAD_HALF_HEIGHT,
        );
        if ball.passed_pad_line() {
            let moving_towards_ball = (step > 0.0) == (ball.pos().y > self.pos.y);
            let new_rect = Rect::from_center(
                Vec2::new(self.pos.x, new_y),
                PAD_HALF_WIDTH,
                PAD_HALF_HEIGHT,
            );
            if moving_towards_ball && new_rect.overlaps(&ball.rect()) {
                // Where the ball's center sits flush against the pad's leading edge.
                let flush_y = if step > 0.0 {
                    new_rect.bot + BALL_HALF_EXTENT
                } else {
                    new_rect.top - BALL_HALF_EXTENT
                };
                let out_of_court = flush_y + BALL_HALF_EXTENT > COURT_HEIGHT
                    || flush_y - BALL_HALF_EXTENT < 0.0;
                if out_of_court {
                    // No room left between the pad and the wall : hold position.
                    return;
                }
                ball.displace_to_y(flush_y);
            }
        }
        self.pos.y = new_y;
    }
}
