//! Thread-cutting speed lock.
//!
//! While engaged, the carriage speed is recomputed from the spindle on every
//! call to [`ThreadingLock::update`] as `pitch × spindle rpm`. Exceeding the
//! configured axial limit halts the carriage. Every pass starts through the
//! encoder's zero-degree phase lock so passes land in the same groove.

use tracing::{debug, info, warn};

use crate::config::units::Degrees;
use crate::config::MachineConfig;
use crate::encoder::RotaryEncoder;
use crate::hal::HardwarePort;
use crate::motor::StepperMotor;

/// Outcome of one [`ThreadingLock::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThreadingStatus {
    /// The lock is not engaged; the motor was left alone.
    Disengaged,
    /// Carriage speed follows the spindle.
    Locked {
        /// Commanded axial speed in distance units per minute.
        speed: f64,
    },
    /// The spindle is too fast for this pitch; the carriage was stopped.
    OverSpeed {
        /// Speed the spindle would require.
        requested: f64,
        /// Configured limit.
        max: f64,
    },
    /// Spindle speed is not yet known or the spindle has stopped; the
    /// carriage was stopped.
    SpindleNotReady,
}

/// Spindle-to-carriage speed lock for single-point threading.
#[derive(Debug, Clone)]
pub struct ThreadingLock {
    pitch: f64,
    max_axial_speed: f64,
    engaged: bool,
    over_speed: bool,
    previous_ramping: Option<bool>,
}

impl ThreadingLock {
    /// Create a lock for `pitch` (distance per spindle revolution) limited to
    /// `max_axial_speed` (distance per minute).
    pub fn new(pitch: f64, max_axial_speed: f64) -> Self {
        Self {
            pitch,
            max_axial_speed,
            engaged: false,
            over_speed: false,
            previous_ramping: None,
        }
    }

    /// Create from machine configuration, or `None` without a carriage axis.
    pub fn from_config(config: &MachineConfig) -> Option<Self> {
        config
            .max_threading_speed()
            .map(|max| Self::new(config.threading.pitch, max))
    }

    /// Thread pitch.
    #[inline]
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Change the thread pitch. Takes effect on the next update.
    pub fn set_pitch(&mut self, pitch: f64) {
        self.pitch = pitch;
    }

    /// Axial speed limit.
    #[inline]
    pub fn max_axial_speed(&self) -> f64 {
        self.max_axial_speed
    }

    /// Whether the lock is engaged.
    #[inline]
    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Start locking `motor` to the spindle. Disables its ramping.
    pub fn engage<H: HardwarePort>(&mut self, motor: &StepperMotor<H>) {
        if self.engaged {
            return;
        }
        self.previous_ramping = Some(motor.is_ramping_enabled());
        motor.enable_ramping(false);
        self.engaged = true;
        self.over_speed = false;
        info!(motor = motor.name(), pitch = self.pitch, "threading lock engaged");
    }

    /// Release `motor`, restoring its ramping setting.
    pub fn disengage<H: HardwarePort>(&mut self, motor: &StepperMotor<H>) {
        if !self.engaged {
            return;
        }
        if let Some(previous) = self.previous_ramping.take() {
            motor.enable_ramping(previous);
        }
        self.engaged = false;
        info!(motor = motor.name(), "threading lock disengaged");
    }

    /// Recompute the carriage speed from the spindle. Call once per tick.
    pub fn update<H, E>(&mut self, motor: &StepperMotor<H>, encoder: &RotaryEncoder<E>) -> ThreadingStatus
    where
        H: HardwarePort,
        E: HardwarePort,
    {
        if !self.engaged {
            return ThreadingStatus::Disengaged;
        }
        // Zero while warming up or stopped
        let spindle_rpm = encoder.rpm();
        if spindle_rpm <= 0.0 {
            motor.stop();
            return ThreadingStatus::SpindleNotReady;
        }

        let requested = self.pitch.abs() * spindle_rpm;
        if requested > self.max_axial_speed {
            if !self.over_speed {
                warn!(
                    motor = motor.name(),
                    requested,
                    max = self.max_axial_speed,
                    "spindle too fast for threading, stopping carriage"
                );
                self.over_speed = true;
            }
            motor.stop();
            return ThreadingStatus::OverSpeed {
                requested,
                max: self.max_axial_speed,
            };
        }

        self.over_speed = false;
        motor.set_speed(requested);
        ThreadingStatus::Locked { speed: requested }
    }

    /// Start a cutting pass toward `target` (distance units) at the next
    /// zero-degree spindle phase.
    ///
    /// Blocks for up to one spindle revolution. Returns `false` without
    /// moving if the carriage is still busy or the spindle is warming up or
    /// stopped.
    pub fn start_pass<H, E>(&self, motor: &StepperMotor<H>, encoder: &RotaryEncoder<E>, target: f64) -> bool
    where
        H: HardwarePort,
        E: HardwarePort,
    {
        if motor.is_running() {
            debug!(motor = motor.name(), "carriage busy, pass not started");
            return false;
        }
        encoder
            .callback_at_zero_degrees(|| motor.go_to_position(target))
            .is_some()
    }

    /// Phase-lock advance for compound-slide infeed.
    ///
    /// Feeding `depth` at `infeed_angle` shifts the tool axially by
    /// `depth × tan(angle)`; the returned advance (µs) is the time the
    /// carriage needs to cover that shift at the locked speed.
    pub fn infeed_advance_us(&self, depth: f64, infeed_angle: Degrees, spindle_rpm: f64) -> f64 {
        let axial_per_us = self.pitch.abs() * spindle_rpm / 60_000_000.0;
        if axial_per_us.is_nan() || axial_per_us <= 0.0 {
            return 0.0;
        }
        depth * infeed_angle.to_radians().tan() / axial_per_us
    }
}
