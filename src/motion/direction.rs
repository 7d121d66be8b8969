//! Direction of motion.

use crate::hal::Level;

/// Direction of motor or spindle motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Increasing step count.
    #[default]
    Forward,
    /// Decreasing step count.
    Reverse,
}

impl Direction {
    /// Direction needed to cover a signed step delta, `None` when zero.
    #[inline]
    pub fn from_delta(delta: i64) -> Option<Self> {
        match delta {
            0 => None,
            d if d > 0 => Some(Direction::Forward),
            _ => Some(Direction::Reverse),
        }
    }

    /// Get the sign multiplier.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }

    /// The other direction.
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }

    /// DIR pin level that selects this direction.
    #[inline]
    pub fn pin_level(self) -> Level {
        match self {
            Direction::Forward => Level::High,
            Direction::Reverse => Level::Low,
        }
    }
}
