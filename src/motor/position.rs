//! Step counting with backlash compensation.
//!
//! Tracks the logical (backlash-compensated) position alongside the raw count
//! of pulses actually emitted. The difference between them is the backlash
//! offset: `+forward` after forward motion, `-reverse` after reverse motion.
//! On a reversal, pulses are spent driving the offset to its new value before
//! the logical position moves.

use crate::motion::Direction;

/// Backlash budget per direction, in raw steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Backlash {
    /// Pulses taken up when motion turns forward.
    pub forward: u32,
    /// Pulses taken up when motion turns reverse.
    pub reverse: u32,
}

impl Backlash {
    /// Create a backlash budget.
    pub const fn new(forward: u32, reverse: u32) -> Self {
        Self { forward, reverse }
    }

    /// Raw-minus-logical offset once slack is taken up in `direction`.
    #[inline]
    pub fn offset(&self, direction: Direction) -> i64 {
        match direction {
            Direction::Forward => self.forward as i64,
            Direction::Reverse => -(self.reverse as i64),
        }
    }
}

/// What a single emitted pulse accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseKind {
    /// The pulse took up backlash; the logical position did not move.
    Backlash,
    /// The pulse moved the logical position by one step.
    Step,
}

/// Logical and raw step counters for one motor.
///
/// Owned exclusively by the motor's control thread.
#[derive(Debug, Clone, Default)]
pub struct StepCounter {
    logical: i64,
    raw: i64,
    backlash: Backlash,
}

impl StepCounter {
    /// Create a counter at the origin.
    pub fn new(backlash: Backlash) -> Self {
        Self {
            logical: 0,
            raw: 0,
            backlash,
        }
    }

    /// Backlash-compensated position.
    #[inline]
    pub fn logical(&self) -> i64 {
        self.logical
    }

    /// Pulses emitted, net of direction.
    #[inline]
    pub fn raw(&self) -> i64 {
        self.raw
    }

    /// Current raw-minus-logical offset.
    #[inline]
    pub fn offset(&self) -> i64 {
        self.raw - self.logical
    }

    /// Configured backlash.
    #[inline]
    pub fn backlash(&self) -> Backlash {
        self.backlash
    }

    /// Change the backlash budget. Takes effect on the next pulse.
    pub fn set_backlash(&mut self, backlash: Backlash) {
        self.backlash = backlash;
    }

    /// Pulses still needed to take up slack before moving in `direction`.
    pub fn outstanding_backlash(&self, direction: Direction) -> i64 {
        let remaining = (self.backlash.offset(direction) - self.offset()) * direction.sign();
        remaining.max(0)
    }

    /// Account for one pulse emitted in `direction`.
    pub fn pulse(&mut self, direction: Direction) -> PulseKind {
        let outstanding = self.outstanding_backlash(direction);
        self.raw += direction.sign();
        if outstanding > 0 {
            PulseKind::Backlash
        } else {
            self.logical += direction.sign();
            PulseKind::Step
        }
    }

    /// Make the current position the origin without moving.
    ///
    /// The backlash offset is preserved, so slack already taken up stays
    /// taken up.
    pub fn zero(&mut self) {
        self.raw = self.offset();
        self.logical = 0;
    }
}
