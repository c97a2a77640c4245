//! The ball : serve randomization and swept collision resolution.

use std::f64::consts::PI;

use rand::distributions::{Distribution, Uniform};

use crate::game::geometry::{segment_rect_entry, Rect, Vec2};
use crate::game::side::Side;
use crate::game::SimFault;
use crate::protocol::constants::{
    BALL_HALF_EXTENT, BALL_SPEED, COURT_HEIGHT, COURT_WIDTH, HALF_SERVE_ANGLE_AMPL, LEFT_PAD_PLANE,
    MAX_BOUNCES_PER_TICK, RIGHT_PAD_PLANE,
};

/// Preemptively built distributions for the bounded random serve directions.
#[derive(Clone)]
pub(super) struct ServeGenerator {
    towards_left: Uniform<f64>,
    towards_right: Uniform<f64>,
}

impl ServeGenerator {
    /// Create a new [`ServeGenerator`] using the preemptive calculating constructors of
    /// [`Distribution`]s.
    pub(super) fn new() -> ServeGenerator {
        ServeGenerator {
            towards_left: Uniform::new(PI - HALF_SERVE_ANGLE_AMPL, PI + HALF_SERVE_ANGLE_AMPL),
            towards_right: Uniform::new(-HALF_SERVE_ANGLE_AMPL, HALF_SERVE_ANGLE_AMPL),
        }
    }

    /// Draw a unit direction towards the given [`Side`], bounded away from the vertical axis so a
    /// rally cannot degenerate into the ball climbing the horizontal walls.
    pub(super) fn gen_direction<R: rand::Rng + ?Sized>(&self, side: Side, rng: &mut R) -> Vec2 {
        let angle = match side {
            Side::Left => self.towards_left.sample(rng),
            Side::Right => self.towards_right.sample(rng),
        };
        Vec2::new(f64::cos(angle), f64::sin(angle))
    }
}

/// What the sweep runs into next along the travel line.
enum Contact {
    /// The leading edge crosses a pad's inner face plane, flipping the passed-pad-line flag.
    PadPlane,
    /// Top or bottom wall : the vertical direction component inverts.
    HorizontalWall,
    /// A side wall reached before any pad plane was crossed this rally : it still blocks.
    BlockingSideWall,
    /// A pad rectangle.
    Pad,
    /// Full crossing of a side wall once past a pad plane : the rally ends on that wall.
    Crossing(Side),
}

/// The moving ball. The position is its center ; its rectangle is derived on demand.
#[derive(Clone, Debug)]
pub struct Ball {
    pos: Vec2,
    dir: Vec2,
    speed: f64,
    passed_pad_line: bool,
}

impl Ball {
    const INITIAL_POS: Vec2 = Vec2 {
        x: COURT_WIDTH / 2.0,
        y: COURT_HEIGHT / 2.0,
    };

    pub(super) fn new(dir: Vec2) -> Ball {
        Ball {
            pos: Self::INITIAL_POS,
            dir,
            speed: BALL_SPEED,
            passed_pad_line: false,
        }
    }

    #[cfg(test)]
    pub(super) fn with_state(pos: Vec2, dir: Vec2, passed_pad_line: bool) -> Ball {
        Ball {
            pos,
            dir,
            speed: BALL_SPEED,
            passed_pad_line,
        }
    }

    /// Put the ball back at center court with a fresh serve direction, ready for the next rally.
    pub(super) fn reset(&mut self, dir: Vec2) {
        self.pos = Self::INITIAL_POS;
        self.dir = dir;
        self.passed_pad_line = false;
    }

    pub(super) fn pos(&self) -> Vec2 {
        self.pos
    }

    /// Whether the ball has crossed a pad's inner face plane in the current rally.
    pub(super) fn passed_pad_line(&self) -> bool {
        self.passed_pad_line
    }

    pub(super) fn rect(&self) -> Rect {
        Rect::from_center(self.pos, BALL_HALF_EXTENT, BALL_HALF_EXTENT)
    }

    /// Displace the ball vertically. Used by a pad pushing the ball out of its way.
    pub(super) fn displace_to_y(&mut self, y: f64) {
        self.pos.y = y;
    }

    /// Advance the ball by `delta_time` seconds, resolving every collision along the path.
    ///
    /// The travel is resolved as a sweep : the nearest contact over the remaining distance is
    /// computed from the parametric form of the travel line, the bounce is applied at that exact
    /// point, and the leftover distance carries into the next iteration. High speed or a slow
    /// tick can therefore never push the ball through a pad or a wall. The iteration count is
    /// capped so degenerate geometry surfaces as a [`SimFault`] instead of a stuck loop.
    ///
    /// Returns the [`Side`] of the wall fully crossed if the rally ended in a point. The caller
    /// owns the consequences - scores and resets are not this element's business.
    pub(super) fn update(
        &mut self,
        delta_time: f64,
        l_pad: &Rect,
        r_pad: &Rect,
    ) -> Result<Option<Side>, SimFault> {
        let mut remaining = self.speed * delta_time;
        for _ in 0..MAX_BOUNCES_PER_TICK {
            let Some((distance, contact)) = self.nearest_contact(remaining, l_pad, r_pad) else {
                self.pos = self.pos.advanced(self.dir, remaining);
                return Ok(None);
            };
            self.pos = self.pos.advanced(self.dir, distance);
            remaining -= distance;
            match contact {
                Contact::PadPlane => self.passed_pad_line = true,
                Contact::HorizontalWall => self.dir.y = -self.dir.y,
                Contact::BlockingSideWall => self.dir.x = -self.dir.x,
                Contact::Pad => {
                    if self.passed_pad_line {
                        // The ball wrapped behind a pad's depth : it bounces off the pad's near
                        // edge on the way back.
                        self.dir.y = -self.dir.y;
                    } else {
                        self.dir.x = -self.dir.x;
                    }
                }
                Contact::Crossing(side) => return Ok(Some(side)),
            }
        }
        Err(SimFault::BounceCapExceeded {
            cap: MAX_BOUNCES_PER_TICK,
        })
    }

    /// Find the nearest contact within `max_distance` along the current direction, if any.
    ///
    /// Pads are swept first so that, on an exact tie with a plane crossing or a wall, the bounce
    /// wins over the crossing.
    fn nearest_contact(
        &self,
        max_distance: f64,
        l_pad: &Rect,
        r_pad: &Rect,
    ) -> Option<(f64, Contact)> {
        let mut nearest: Option<(f64, Contact)> = None;
        let mut consider = |distance: f64, contact: Contact| {
            if distance <= max_distance && nearest.as_ref().map_or(true, |(d, _)| distance < *d) {
                // Clamp float noise : a flush contact is a contact at zero distance, not behind.
                nearest = Some((f64::max(distance, 0.0), contact));
            }
        };

        for pad in [l_pad, r_pad] {
            let expanded = pad.expanded(BALL_HALF_EXTENT, BALL_HALF_EXTENT);
            if let Some(distance) = segment_rect_entry(self.pos, self.dir, max_distance, &expanded)
            {
                consider(distance, Contact::Pad);
            }
        }

        // Top and bottom walls, met by the ball's leading edge.
        if self.dir.y < 0.0 {
            consider(
                (BALL_HALF_EXTENT - self.pos.y) / self.dir.y,
                Contact::HorizontalWall,
            );
        } else if self.dir.y > 0.0 {
            consider(
                (COURT_HEIGHT - BALL_HALF_EXTENT - self.pos.y) / self.dir.y,
                Contact::HorizontalWall,
            );
        }

        if self.passed_pad_line {
            // Scoring walls : the rally ends when the trailing edge fully crosses the wall.
            if self.dir.x < 0.0 {
                consider(
                    (-BALL_HALF_EXTENT - self.pos.x) / self.dir.x,
                    Contact::Crossing(Side::Left),
                );
            } else if self.dir.x > 0.0 {
                consider(
                    (COURT_WIDTH + BALL_HALF_EXTENT - self.pos.x) / self.dir.x,
                    Contact::Crossing(Side::Right),
                );
            }
        } else {
            // Until a pad plane is crossed, the side walls still block the leading edge.
            if self.dir.x < 0.0 {
                consider(
                    (BALL_HALF_EXTENT - self.pos.x) / self.dir.x,
                    Contact::BlockingSideWall,
                );
            } else if self.dir.x > 0.0 {
                consider(
                    (COURT_WIDTH - BALL_HALF_EXTENT - self.pos.x) / self.dir.x,
                    Contact::BlockingSideWall,
                );
            }

            // Pad plane crossings ahead of the ball. Behind-the-ball planes are not events : the
            // flag only ever flips on an actual crossing.
            let plane_distance = if self.dir.x < 0.0 {
                (LEFT_PAD_PLANE + BALL_HALF_EXTENT - self.pos.x) / self.dir.x
            } else if self.dir.x > 0.0 {
                (RIGHT_PAD_PLANE - BALL_HALF_EXTENT - self.pos.x) / self.dir.x
            } else {
                -1.0
            };
            if plane_distance >= 0.0 {
                consider(plane_distance, Contact::PadPlane);
            }
        }

        nearest
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use crate::protocol::constants::{PAD_HALF_HEIGHT, PAD_HALF_WIDTH, RIGHT_PAD_X};

    use super::*;

    const BIAS: f64 = 1.0e-9;

    fn pad_rect(center_x: f64, center_y: f64) -> Rect {
        Rect::from_center(
            Vec2::new(center_x, center_y),
            PAD_HALF_WIDTH,
            PAD_HALF_HEIGHT,
        )
    }

    fn default_pads() -> (Rect, Rect) {
        (
            pad_rect(PAD_HALF_WIDTH, COURT_HEIGHT / 2.0),
            pad_rect(RIGHT_PAD_X, COURT_HEIGHT / 2.0),
        )
    }

    /// Pads parked near the top, out of the way of a mid-court horizontal ball.
    fn parked_pads() -> (Rect, Rect) {
        (
            pad_rect(PAD_HALF_WIDTH, 0.1),
            pad_rect(RIGHT_PAD_X, 0.1),
        )
    }

    #[test]
    fn serve_directions_stay_bounded_off_vertical() {
        let serve_generator = ServeGenerator::new();
        let mut thread_rng = rand::thread_rng();
        for _ in 0..50 {
            let left = serve_generator.gen_direction(Side::Left, &mut thread_rng);
            let right = serve_generator.gen_direction(Side::Right, &mut thread_rng);
            assert!(left.x <= -f64::cos(HALF_SERVE_ANGLE_AMPL) + BIAS);
            assert!(right.x >= f64::cos(HALF_SERVE_ANGLE_AMPL) - BIAS);
            assert!(left.y.abs() <= f64::sin(HALF_SERVE_ANGLE_AMPL) + BIAS);
            assert!(right.y.abs() <= f64::sin(HALF_SERVE_ANGLE_AMPL) + BIAS);
        }
    }

    #[test]
    fn head_on_pad_bounce_inverts_only_the_perpendicular_component() {
        let (l_pad, r_pad) = default_pads();
        let mut ball = Ball::with_state(Ball::INITIAL_POS, Vec2::new(1.0, 0.0), false);
        // Distance from center to the right pad's expanded face, plus some leftover.
        let face_x = RIGHT_PAD_PLANE - BALL_HALF_EXTENT;
        let leftover = 0.1;
        let travel = (face_x - Ball::INITIAL_POS.x) + leftover;
        let crossed = ball
            .update(travel / BALL_SPEED, &l_pad, &r_pad)
            .expect("a plain pad bounce must not fault");
        assert!(crossed.is_none());
        assert!((ball.dir.x - -1.0).abs() < BIAS);
        assert!(ball.dir.y.abs() < BIAS);
        assert!((ball.pos.x - (face_x - leftover)).abs() < BIAS);
        assert!((ball.pos.y - Ball::INITIAL_POS.y).abs() < BIAS);
        assert!(!ball.passed_pad_line());
    }

    #[test]
    fn horizontal_wall_bounce_reflects_at_the_exact_contact_point() {
        let (l_pad, r_pad) = default_pads();
        let mut ball = Ball::with_state(Vec2::new(0.65, 0.1), Vec2::new(0.6, -0.8), false);
        let travel = 0.2;
        let crossed = ball
            .update(travel / BALL_SPEED, &l_pad, &r_pad)
            .expect("a plain wall bounce must not fault");
        assert!(crossed.is_none());
        // Contact when the top edge reaches y = 0, i.e. after 0.114375 of travel.
        let to_contact = (0.1 - BALL_HALF_EXTENT) / 0.8;
        let after = travel - to_contact;
        assert!((ball.dir.y - 0.8).abs() < BIAS);
        assert!((ball.pos.y - (BALL_HALF_EXTENT + 0.8 * after)).abs() < BIAS);
        assert!((ball.pos.x - (0.65 + 0.6 * travel)).abs() < BIAS);
    }

    #[test]
    fn crossing_a_pad_plane_flips_the_flag_mid_sweep() {
        let (l_pad, r_pad) = parked_pads();
        let mut ball = Ball::with_state(Ball::INITIAL_POS, Vec2::new(1.0, 0.0), false);
        // Enough to cross the right pad plane, not enough to cross the wall.
        let travel = (RIGHT_PAD_PLANE - BALL_HALF_EXTENT - Ball::INITIAL_POS.x) + 0.005;
        let crossed = ball
            .update(travel / BALL_SPEED, &l_pad, &r_pad)
            .expect("crossing a plane must not fault");
        assert!(crossed.is_none());
        assert!(ball.passed_pad_line());
        assert!(ball.rect().within_court(BIAS));
    }

    #[test]
    fn full_side_wall_crossing_past_the_pad_line_scores() {
        let (l_pad, r_pad) = parked_pads();
        let mut ball = Ball::with_state(Ball::INITIAL_POS, Vec2::new(1.0, 0.0), false);
        // Travel all the way through the plane and fully past the right wall.
        let travel = (COURT_WIDTH + BALL_HALF_EXTENT - Ball::INITIAL_POS.x) + 0.01;
        let crossed = ball
            .update(travel / BALL_SPEED, &l_pad, &r_pad)
            .expect("a scoring crossing must not fault");
        assert_eq!(crossed, Some(Side::Right));
    }

    #[test]
    fn side_wall_still_blocks_before_any_plane_crossing() {
        let (l_pad, r_pad) = parked_pads();
        // Constructed state : beyond the right plane but with the flag still down.
        let mut ball = Ball::with_state(Vec2::new(1.29, 0.5), Vec2::new(1.0, 0.0), false);
        let travel = 0.0315;
        let crossed = ball
            .update(travel / BALL_SPEED, &l_pad, &r_pad)
            .expect("a blocking wall bounce must not fault");
        assert!(crossed.is_none());
        assert!((ball.dir.x - -1.0).abs() < BIAS);
        assert!(!ball.passed_pad_line());
        assert!(ball.rect().within_court(BIAS));
    }

    #[test]
    fn pad_hit_after_passing_the_plane_bounces_off_its_near_edge() {
        let (l_pad, r_pad) = default_pads();
        // Behind the right pad, above it, dropping straight down onto its top edge.
        let mut ball = Ball::with_state(Vec2::new(1.295, 0.4), Vec2::new(0.0, 1.0), true);
        let travel = 0.05;
        let crossed = ball
            .update(travel / BALL_SPEED, &l_pad, &r_pad)
            .expect("an edge bounce must not fault");
        assert!(crossed.is_none());
        let contact_y = COURT_HEIGHT / 2.0 - PAD_HALF_HEIGHT - BALL_HALF_EXTENT;
        let to_contact = contact_y - 0.4;
        assert!((ball.dir.y - -1.0).abs() < BIAS);
        assert!((ball.pos.y - (contact_y - (travel - to_contact))).abs() < BIAS);
    }

    #[test]
    fn large_delta_does_not_tunnel() {
        let (l_pad, r_pad) = default_pads();
        let mut ball = Ball::with_state(Ball::INITIAL_POS, Vec2::new(1.0, 0.0), false);
        // Several court lengths in one tick : the ball ping-pongs between the pads.
        let crossed = ball
            .update(3.0 / BALL_SPEED, &l_pad, &r_pad)
            .expect("a few pad bounces must stay below the cap");
        assert!(crossed.is_none());
        assert!(ball.rect().within_court(BIAS));
        assert!(!ball.passed_pad_line());
    }

    #[test]
    fn degenerate_bounce_chains_hit_the_cap() {
        let (l_pad, r_pad) = default_pads();
        let mut ball = Ball::with_state(Ball::INITIAL_POS, Vec2::new(1.0, 0.0), false);
        let fault = ball.update(20.0, &l_pad, &r_pad).unwrap_err();
        assert!(matches!(fault, SimFault::BounceCapExceeded { .. }));
    }

    #[test]
    fn bounds_hold_under_random_legal_states() {
        let (l_pad, r_pad) = default_pads();
        let mut rng = rand::thread_rng();
        let serve_generator = ServeGenerator::new();
        for _ in 0..200 {
            let side = rng.gen();
            let mut ball = Ball::new(serve_generator.gen_direction(side, &mut rng));
            let delta_time = rng.gen_range(0.0..0.5);
            if let Ok(None) = ball.update(delta_time, &l_pad, &r_pad) {
                assert!(ball.rect().within_court(1.0e-6));
            }
        }
    }
}
