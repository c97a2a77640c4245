//! Shared geometry toolkit for the simulated elements.
//!
//! Everything here is a pure value computation : positions, axis-aligned rectangles and the swept
//! entry test backing the collision resolution in [`crate::game::ball`]. The ball and the pads
//! compose these primitives instead of inheriting a common base.

use crate::protocol::constants::{COURT_HEIGHT, COURT_WIDTH};

/// A point or direction in court coordinates. The x axis grows rightwards, the y axis downwards.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Vec2 {
        Vec2 { x, y }
    }

    /// The point reached by travelling `distance` along `direction` from `self`.
    pub fn advanced(self, direction: Vec2, distance: f64) -> Vec2 {
        Vec2::new(
            self.x + direction.x * distance,
            self.y + direction.y * distance,
        )
    }
}

/// Axis-aligned rectangle. Never stored by an element - always derived from its center through
/// [`Rect::from_center`], so position and shape cannot drift apart.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub bot: f64,
    pub left: f64,
    pub right: f64,
}

impl Rect {
    pub fn from_center(center: Vec2, half_width: f64, half_height: f64) -> Rect {
        Rect {
            top: center.y - half_height,
            bot: center.y + half_height,
            left: center.x - half_width,
            right: center.x + half_width,
        }
    }

    /// Grow the rectangle by the given half-extents on every side. Reduces a
    /// rectangle-vs-rectangle sweep to a point-vs-rectangle one.
    pub fn expanded(&self, half_width: f64, half_height: f64) -> Rect {
        Rect {
            top: self.top - half_height,
            bot: self.bot + half_height,
            left: self.left - half_width,
            right: self.right + half_width,
        }
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left <= other.right
            && self.right >= other.left
            && self.top <= other.bot
            && self.bot >= other.top
    }

    /// Whether the rectangle lies fully inside the court, within `tolerance`.
    pub fn within_court(&self, tolerance: f64) -> bool {
        self.left >= -tolerance
            && self.right <= COURT_WIDTH + tolerance
            && self.top >= -tolerance
            && self.bot <= COURT_HEIGHT + tolerance
    }
}

/// Swept entry test of a point travelling along the unit `direction` from `origin` against
/// `rect`. Returns the distance to the first face crossed, if the crossing happens within
/// `max_distance`.
///
/// The test is a slab intersection on the parametric form of the travel line, so the contact
/// point is exact rather than snapped to an axis. A point already past the entry face (overlap)
/// yields [`None`] - separation is the mover's job, not the sweep's.
pub fn segment_rect_entry(
    origin: Vec2,
    direction: Vec2,
    max_distance: f64,
    rect: &Rect,
) -> Option<f64> {
    let (tx_min, tx_max) = axis_slab(origin.x, direction.x, rect.left, rect.right)?;
    let (ty_min, ty_max) = axis_slab(origin.y, direction.y, rect.top, rect.bot)?;
    let entry = f64::max(tx_min, ty_min);
    let exit = f64::min(tx_max, ty_max);
    if entry > exit || entry < 0.0 || entry > max_distance {
        return None;
    }
    Some(entry)
}

/// Parametric distances at which a 1-d motion enters and leaves the `[low, high]` interval.
fn axis_slab(origin: f64, rate: f64, low: f64, high: f64) -> Option<(f64, f64)> {
    if rate == 0.0 {
        if origin < low || origin > high {
            None
        } else {
            Some((f64::NEG_INFINITY, f64::INFINITY))
        }
    } else {
        let t1 = (low - origin) / rate;
        let t2 = (high - origin) / rate;
        Some((f64::min(t1, t2), f64::max(t1, t2)))
    }
}
