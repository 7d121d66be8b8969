//! Speed ramping.
//!
//! The ramp moves a motor's working speed toward its commanded speed by a
//! bounded amount per control-loop iteration, or snaps when disabled.

use crate::config::units::Rpm;

/// Lowest speed a ramp will rest at.
const MIN_RAMP_RPM: f64 = 1.0;

/// Ramped speed state for one motor.
#[derive(Debug, Clone)]
pub struct SpeedRamp {
    enabled: bool,
    /// Acceleration in rpm per second of loop time.
    rate: f64,
    start: Rpm,
    target: Rpm,
    current: Rpm,
}

impl SpeedRamp {
    /// Create a ramp accelerating at `rate_rpm_per_sec` from `start`.
    pub fn new(rate_rpm_per_sec: f64, start: Rpm, target: Rpm) -> Self {
        Self {
            enabled: true,
            rate: rate_rpm_per_sec.max(0.0),
            start: Rpm(start.0.max(MIN_RAMP_RPM)),
            target,
            current: target,
        }
    }

    /// Whether ramping is active.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.rate > 0.0
    }

    /// Enable or disable ramping. Disabling snaps to the target.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !self.is_enabled() {
            self.current = self.target;
        }
    }

    /// Commanded speed.
    #[inline]
    pub fn target(&self) -> Rpm {
        self.target
    }

    /// Speed the motor is currently stepping at.
    #[inline]
    pub fn current(&self) -> Rpm {
        self.current
    }

    /// Set the commanded speed.
    pub fn set_target(&mut self, target: Rpm) {
        self.target = target;
        if !self.is_enabled() {
            self.current = target;
        }
    }

    /// Whether the working speed has reached the commanded speed.
    #[inline]
    pub fn is_at_target(&self) -> bool {
        self.current == self.target
    }

    /// Move toward the target for one iteration lasting `elapsed_us`.
    pub fn advance(&mut self, elapsed_us: u32) -> Rpm {
        if !self.is_enabled() {
            self.current = self.target;
            return self.current;
        }

        let max_step = self.rate * elapsed_us as f64 / 1_000_000.0;
        let diff = self.target.0 - self.current.0;
        if diff.abs() <= max_step {
            self.current = self.target;
        } else {
            self.current = Rpm(self.current.0 + max_step.copysign(diff));
        }
        self.current
    }

    /// Drop back to the start speed while the motor is standing still.
    pub fn rest(&mut self) {
        self.current = if self.is_enabled() {
            Rpm(self.start.0.min(self.target.0))
        } else {
            self.target
        };
    }
}
