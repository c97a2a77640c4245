//! Definition of the [`Side`] enumeration.

use std::ops::Not;

use rand::distributions::{Distribution, Standard};
use rand::Rng;

/// The two halves of the court, and by extension the two players of a match.
///
/// The [`Not`] trait is implemented to support inversion using `!s` syntax, which is how a wall
/// crossing on one side credits the player on the other.
///
/// An implementation of [`Distribution`] of [`Side`]s for [`Standard`] is given to make it easy
/// to draw a random side for the opening serve.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Stable index of this side in per-player arrays : left is 0, right is 1.
    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

impl Not for Side {
    type Output = Side;
    fn not(self) -> Self::Output {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl Distribution<Side> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Side {
        match rng.gen() {
            true => Side::Left,
            false => Side::Right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_inversion() {
        assert_eq!(!Side::Left, Side::Right);
        assert_eq!(!Side::Right, Side::Left);
    }

    #[test]
    fn side_indices_are_distinct_and_stable() {
        assert_eq!(Side::Left.index(), 0);
        assert_eq!(Side::Right.index(), 1);
    }
}
