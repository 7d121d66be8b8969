//! Lathe facade.
//!
//! Builds every motion component of a lathe from a single configuration and
//! wires the synchronisation protocols between them.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use leadscrew_motion::{hal::sim::SimulatedPort, load_config, Lathe};
//!
//! let config = load_config("lathe.toml")?;
//! let mut lathe = Lathe::from_config(&config, Arc::new(SimulatedPort::new()))?;
//!
//! lathe.engage_threading();
//! loop {
//!     lathe.update_threading();
//!     // ...poll input, start passes...
//! }
//! ```

use std::sync::Arc;

use crate::config::units::Degrees;
use crate::config::{validate_config, MachineConfig, CARRIAGE_AXIS, CROSS_AXIS};
use crate::encoder::RotaryEncoder;
use crate::error::{truncated, ConfigError, Result};
use crate::hal::HardwarePort;
use crate::motion::Direction;
use crate::sync::{engage_cross_slave, scale, taper, ThreadingLock, ThreadingStatus};

use super::builder::StepperMotorBuilder;
use super::driver::StepperMotor;

/// Carriage, optional cross-slide, spindle encoder and threading lock.
pub struct Lathe<H: HardwarePort> {
    carriage: StepperMotor<H>,
    cross_slide: Option<StepperMotor<H>>,
    spindle: RotaryEncoder<H>,
    threading: ThreadingLock,
}

impl<H: HardwarePort> Lathe<H> {
    /// Validate `config` and bring up every component on `port`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if validation fails or the carriage axis is
    /// missing, and a hardware error if any component cannot claim its pins.
    pub fn from_config(config: &MachineConfig, port: Arc<H>) -> Result<Self> {
        validate_config(config)?;

        let carriage_config = config
            .carriage()
            .ok_or_else(|| ConfigError::AxisNotFound(truncated(CARRIAGE_AXIS)))?;
        let carriage = StepperMotorBuilder::new()
            .name(CARRIAGE_AXIS)
            .from_axis_config(carriage_config)
            .build(port.clone())?;

        let cross_slide = match config.cross_slide() {
            Some(axis) => Some(
                StepperMotorBuilder::new()
                    .name(CROSS_AXIS)
                    .from_axis_config(axis)
                    .build(port.clone())?,
            ),
            None => None,
        };

        let spindle = RotaryEncoder::from_config(&config.spindle, port)?;
        let threading = ThreadingLock::from_config(config)
            .unwrap_or_else(|| ThreadingLock::new(config.threading.pitch, carriage.max_speed()));

        Ok(Self {
            carriage,
            cross_slide,
            spindle,
            threading,
        })
    }

    /// The carriage (leadscrew) motor.
    pub fn carriage(&self) -> &StepperMotor<H> {
        &self.carriage
    }

    /// The cross-slide motor, if fitted.
    pub fn cross_slide(&self) -> Option<&StepperMotor<H>> {
        self.cross_slide.as_ref()
    }

    /// The spindle encoder.
    pub fn spindle(&self) -> &RotaryEncoder<H> {
        &self.spindle
    }

    /// The thread-cutting lock.
    pub fn threading(&self) -> &ThreadingLock {
        &self.threading
    }

    /// Mutable access to the thread-cutting lock, e.g. to change pitch.
    pub fn threading_mut(&mut self) -> &mut ThreadingLock {
        &mut self.threading
    }

    /// Lock the carriage to the spindle.
    pub fn engage_threading(&mut self) {
        self.threading.engage(&self.carriage);
    }

    /// Release the carriage from the spindle.
    pub fn disengage_threading(&mut self) {
        self.threading.disengage(&self.carriage);
    }

    /// Recompute the threading speed. Call once per tick.
    pub fn update_threading(&mut self) -> ThreadingStatus {
        self.threading.update(&self.carriage, &self.spindle)
    }

    /// Start a threading pass toward `target` at the next zero-degree phase.
    pub fn start_threading_pass(&self, target: f64) -> bool {
        self.threading.start_pass(&self.carriage, &self.spindle, target)
    }

    /// Slave the cross-slide to the carriage to cut a taper of half-angle
    /// `angle`. Returns `false` without a cross-slide.
    pub fn engage_taper(&self, angle: Degrees, nudge: Direction) -> bool {
        match &self.cross_slide {
            Some(cross) => {
                engage_cross_slave(&self.carriage, cross, taper(angle), nudge);
                true
            }
            None => false,
        }
    }

    /// Slave the cross-slide to the carriage with a fixed ratio. Returns
    /// `false` without a cross-slide.
    pub fn engage_radius(&self, factor: f64, nudge: Direction) -> bool {
        match &self.cross_slide {
            Some(cross) => {
                engage_cross_slave(&self.carriage, cross, scale(factor), nudge);
                true
            }
            None => false,
        }
    }

    /// Stop cross-slide slaving.
    pub fn disengage_cross_slave(&self) {
        if let Some(cross) = &self.cross_slide {
            cross.synchronise_off();
        }
    }

    /// Stop every axis.
    pub fn stop_all(&self) {
        self.carriage.stop();
        if let Some(cross) = &self.cross_slide {
            cross.stop();
        }
    }
}
