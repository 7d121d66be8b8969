//! Unit types for physical quantities.
//!
//! Provides type-safe representations of motor steps, rotational speeds,
//! pulse delays and angles to prevent unit confusion at compile time.

use serde::Deserialize;

/// Numerator of the step-delay formula: half a minute in microseconds.
///
/// One step period at `rpm` is `60e6 / (steps_per_rev * rpm)` µs and the
/// pulse is high for half of it.
pub const HALF_PERIOD_CONSTANT_US: f64 = 30_000_000.0;

/// Shortest pulse half-period the step generator will command.
pub const MIN_STEP_DELAY_US: u32 = 10;

/// Speeds below this are treated as a stop request.
pub const RPM_EPSILON: f64 = 1e-3;

/// Motor position in steps (absolute from origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Steps(pub i64);

impl Steps {
    /// Create a new Steps value.
    #[inline]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Convert to a distance using the distance-per-step factor.
    #[inline]
    pub fn to_distance(self, conversion_factor: f64) -> f64 {
        self.0 as f64 * conversion_factor
    }

    /// Nearest step for a distance.
    #[inline]
    pub fn from_distance(distance: f64, conversion_factor: f64) -> Self {
        Self((distance / conversion_factor).round() as i64)
    }
}

/// Rotational speed in revolutions per minute.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct Rpm(pub f64);

impl Rpm {
    /// Create a new Rpm value.
    #[inline]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Whether the speed is too small to step at.
    #[inline]
    pub fn is_stopped(self) -> bool {
        self.0.is_nan() || self.0 < RPM_EPSILON
    }
}

/// Half-period of the step pulse train in microseconds.
///
/// The control loop holds STEP high for one delay and low for one delay, so a
/// full step takes twice this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StepDelay(u32);

impl StepDelay {
    /// The fastest delay the generator will command.
    pub const MIN: Self = Self(MIN_STEP_DELAY_US);

    /// Delay for `rpm` on a motor with `steps_per_revolution` steps.
    ///
    /// Returns `None` for speeds below [`RPM_EPSILON`] (a stop request).
    /// Results are floored at [`StepDelay::MIN`].
    pub fn from_rpm(steps_per_revolution: u32, rpm: Rpm) -> Option<Self> {
        if rpm.is_stopped() || steps_per_revolution == 0 {
            return None;
        }
        let us = HALF_PERIOD_CONSTANT_US / (steps_per_revolution as f64 * rpm.0);
        let us = us.round().min(u32::MAX as f64) as u32;
        Some(Self(us.max(MIN_STEP_DELAY_US)))
    }

    /// Create from microseconds, floored at [`StepDelay::MIN`].
    #[inline]
    pub fn from_micros(us: u32) -> Self {
        Self(us.max(MIN_STEP_DELAY_US))
    }

    /// Delay in microseconds.
    #[inline]
    pub const fn as_micros(self) -> u32 {
        self.0
    }

    /// Full step period (high + low) in microseconds.
    #[inline]
    pub fn period_micros(self) -> u32 {
        self.0.saturating_mul(2)
    }

    /// Speed this delay produces on a motor with `steps_per_revolution` steps.
    #[inline]
    pub fn to_rpm(self, steps_per_revolution: u32) -> Rpm {
        Rpm(HALF_PERIOD_CONSTANT_US / (steps_per_revolution as f64 * self.0 as f64))
    }
}

/// Angular position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct Degrees(pub f64);

impl Degrees {
    /// Create a new Degrees value.
    #[inline]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Convert to radians.
    #[inline]
    pub fn to_radians(self) -> f64 {
        self.0.to_radians()
    }
}
