//! Constants fixing the court geometry and the pace of the game, as defined in the Protocol.

use std::f64::consts::FRAC_PI_6;
use std::time::Duration;

/// Horizontal extent of the court. The vertical extent is 1, making this the aspect ratio too.
pub const COURT_WIDTH: f64 = 1.3;
pub const COURT_HEIGHT: f64 = 1.0;

/// Half the edge of the ball. The ball is square, all rectangles here are axis-aligned.
pub const BALL_HALF_EXTENT: f64 = 0.0085;
pub const PAD_HALF_WIDTH: f64 = 0.0075;
pub const PAD_HALF_HEIGHT: f64 = 0.05;

/// Horizontal center of each pad. Pads sit flush against their wall and only move vertically.
pub const LEFT_PAD_X: f64 = PAD_HALF_WIDTH;
pub const RIGHT_PAD_X: f64 = COURT_WIDTH - PAD_HALF_WIDTH;

/// The x planes of the pads' inner faces. A ball whose leading edge crosses one of them is past
/// the pad for the rest of the rally, and the wall behind scores instead of blocking.
pub const LEFT_PAD_PLANE: f64 = 2.0 * PAD_HALF_WIDTH;
pub const RIGHT_PAD_PLANE: f64 = COURT_WIDTH - 2.0 * PAD_HALF_WIDTH;

/// Element speeds, in court units per second. All movement scales by wall-clock delta time, never
/// by a fixed per-tick step.
pub const BALL_SPEED: f64 = 1.15;
pub const PAD_SPEED: f64 = 1.5;

/// Score a player must reach to win the match.
pub const WIN_SCORE: u32 = 11;

/// Maximum deviation of a serve direction from the horizontal axis, so a rally cannot start
/// near-vertical.
pub const MAX_SERVE_ANGLE_AMPL: f64 = FRAC_PI_6;
pub const HALF_SERVE_ANGLE_AMPL: f64 = MAX_SERVE_ANGLE_AMPL / 2.0;

/// Length of the pre-game countdown sent with the INIT status.
pub const COUNTDOWN_DURATION: Duration = Duration::from_secs(5);
/// Length of the breather between two rallies.
pub const BREAK_DURATION: Duration = Duration::from_secs(3);
/// How long a paused match waits for nothing before being forfeited to the remaining player.
pub const FORFEIT_GRACE: Duration = Duration::from_secs(10);

/// Target cadence of the match driver. Physics does not depend on it being met.
pub const TICKS_PER_SECOND: u64 = 100;

/// Cap on the number of contacts resolved within a single tick. Exceeding it means the geometry
/// degenerated, and the match is terminated rather than left looping.
pub const MAX_BOUNCES_PER_TICK: u32 = 8;

/// Slack allowed on the court-bounds invariant before a resolved position is considered corrupted.
pub const COURT_BOUNDS_TOLERANCE: f64 = 1.0e-6;
