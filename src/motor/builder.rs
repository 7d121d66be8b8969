//! Builder pattern for StepperMotor.

use std::sync::Arc;

use embedded_hal::digital::OutputPin;
use tracing::debug;

use crate::config::units::Rpm;
use crate::config::AxisConfig;
use crate::error::{truncated, ConfigError, Error, HardwareError, Result};
use crate::hal::{write_level, HardwarePort, Level, PinId};
use crate::motion::SpeedRamp;

use super::control::{ControlLoop, LoopPins};
use super::driver::StepperMotor;
use super::position::{Backlash, StepCounter};
use super::status::MotorStatus;

/// Builder for creating StepperMotor instances.
#[derive(Debug, Clone)]
pub struct StepperMotorBuilder {
    name: Option<heapless::String<32>>,
    step_pin: Option<PinId>,
    dir_pin: Option<PinId>,
    enable_pin: Option<PinId>,
    enable_active_low: bool,
    steps_per_revolution: Option<u32>,
    conversion_factor: Option<f64>,
    max_speed: Option<f64>,
    max_rpm: Option<f64>,
    ramping: bool,
    ramp_rate: f64,
    ramp_start_rpm: f64,
    backlash: Backlash,
    initial_rpm: f64,
}

impl Default for StepperMotorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StepperMotorBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            name: None,
            step_pin: None,
            dir_pin: None,
            enable_pin: None,
            enable_active_low: true,
            steps_per_revolution: None,
            conversion_factor: None,
            max_speed: None,
            max_rpm: None,
            ramping: true,
            ramp_rate: 200.0,
            ramp_start_rpm: 10.0,
            backlash: Backlash::default(),
            initial_rpm: 60.0,
        }
    }

    /// Set the motor name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = heapless::String::try_from(name).ok();
        self
    }

    /// Set the STEP and DIR pins.
    pub fn pins(mut self, step: PinId, dir: PinId) -> Self {
        self.step_pin = Some(step);
        self.dir_pin = Some(dir);
        self
    }

    /// Set the driver ENABLE pin and its polarity.
    pub fn enable_pin(mut self, pin: PinId, active_low: bool) -> Self {
        self.enable_pin = Some(pin);
        self.enable_active_low = active_low;
        self
    }

    /// Set steps per motor revolution (including microstepping).
    pub fn steps_per_revolution(mut self, steps: u32) -> Self {
        self.steps_per_revolution = Some(steps);
        self
    }

    /// Set distance per step. The sign encodes wiring orientation.
    pub fn conversion_factor(mut self, distance_per_step: f64) -> Self {
        self.conversion_factor = Some(distance_per_step);
        self
    }

    /// Set the speed ceiling in distance units per minute.
    pub fn max_speed(mut self, speed: f64) -> Self {
        self.max_speed = Some(speed);
        self
    }

    /// Set the speed ceiling in motor rpm. Takes precedence over
    /// [`max_speed`](Self::max_speed).
    pub fn max_rpm(mut self, rpm: f64) -> Self {
        self.max_rpm = Some(rpm);
        self
    }

    /// Enable or disable speed ramping.
    pub fn ramping(mut self, enabled: bool) -> Self {
        self.ramping = enabled;
        self
    }

    /// Set acceleration in rpm per second.
    pub fn ramp_rate(mut self, rpm_per_sec: f64) -> Self {
        self.ramp_rate = rpm_per_sec;
        self
    }

    /// Set the speed ramped moves start from.
    pub fn ramp_start_rpm(mut self, rpm: f64) -> Self {
        self.ramp_start_rpm = rpm;
        self
    }

    /// Set backlash compensation in raw steps per direction.
    pub fn backlash(mut self, forward_steps: u32, reverse_steps: u32) -> Self {
        self.backlash = Backlash::new(forward_steps, reverse_steps);
        self
    }

    /// Set the commanded speed at start-up.
    pub fn initial_rpm(mut self, rpm: f64) -> Self {
        self.initial_rpm = rpm;
        self
    }

    /// Configure from an AxisConfig.
    pub fn from_axis_config(mut self, config: &AxisConfig) -> Self {
        if !config.name.is_empty() {
            self.name = Some(config.name.clone());
        }
        self.step_pin = Some(config.step_pin);
        self.dir_pin = Some(config.dir_pin);
        self.enable_pin = config.enable_pin;
        self.enable_active_low = config.enable_active_low;
        self.steps_per_revolution = Some(config.steps_per_revolution);
        self.conversion_factor = Some(config.distance_per_step);
        self.max_speed = Some(config.max_speed);
        self.ramping = config.ramping;
        self.ramp_rate = config.ramp_rate;
        self.ramp_start_rpm = config.ramp_start_rpm;
        self.backlash = Backlash::new(config.backlash_forward, config.backlash_reverse);
        self
    }

    /// Claim the pins and start the motor's control thread.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a required field is missing or invalid,
    /// or a [`HardwareError`] if a pin cannot be claimed or the thread
    /// cannot be spawned.
    pub fn build<H: HardwarePort>(self, port: Arc<H>) -> Result<StepperMotor<H>> {
        let (step_id, dir_id) = match (self.step_pin, self.dir_pin) {
            (Some(step), Some(dir)) => (step, dir),
            _ => return Err(missing("step and dir pins are required")),
        };
        let steps_per_revolution = self
            .steps_per_revolution
            .ok_or_else(|| missing("steps_per_revolution is required"))?;
        if steps_per_revolution == 0 {
            return Err(ConfigError::InvalidStepsPerRevolution(0).into());
        }
        let conversion_factor = self
            .conversion_factor
            .ok_or_else(|| missing("conversion_factor is required"))?;
        if !conversion_factor.is_finite() || conversion_factor == 0.0 {
            return Err(ConfigError::InvalidConversionFactor(conversion_factor).into());
        }

        let distance_per_revolution = conversion_factor.abs() * steps_per_revolution as f64;
        let max_rpm = match (self.max_rpm, self.max_speed) {
            (Some(rpm), _) => rpm,
            (None, Some(speed)) => speed / distance_per_revolution,
            (None, None) => f64::INFINITY,
        };
        if max_rpm.is_nan() || max_rpm <= 0.0 {
            return Err(ConfigError::InvalidMaxSpeed(max_rpm).into());
        }
        let max_rpm = Rpm(max_rpm);
        let initial = Rpm(self.initial_rpm.max(0.0).min(max_rpm.0));

        let name = self
            .name
            .unwrap_or_else(|| truncated(&format!("axis-{}", step_id)));

        let mut step = port.output_pin(step_id)?;
        let dir = port.output_pin(dir_id)?;
        step.set_low()
            .map_err(|_| HardwareError::PinWrite(step_id))?;

        let enable = match self.enable_pin {
            Some(enable_id) => {
                let mut pin = port.output_pin(enable_id)?;
                let (active, inactive) = if self.enable_active_low {
                    (Level::Low, Level::High)
                } else {
                    (Level::High, Level::Low)
                };
                write_level(&mut pin, active).map_err(|_| HardwareError::PinWrite(enable_id))?;
                Some((pin, inactive))
            }
            None => None,
        };

        let status = Arc::new(MotorStatus::new(steps_per_revolution, conversion_factor, initial));
        status.set_ramping(self.ramping);

        let mut ramp = SpeedRamp::new(self.ramp_rate, Rpm(self.ramp_start_rpm), initial);
        ramp.set_enabled(self.ramping);
        ramp.rest();
        status.set_ramped_rpm(ramp.current());

        let (commands, receiver) = crossbeam_channel::unbounded();
        let control = ControlLoop::new(
            name.clone(),
            port.clone(),
            LoopPins { step, dir, enable },
            status.clone(),
            receiver,
            StepCounter::new(self.backlash),
            ramp,
        );

        let thread = std::thread::Builder::new()
            .name(format!("stepper-{}", name))
            .spawn(move || control.run())
            .map_err(|e| HardwareError::ThreadSpawn(truncated(&e.to_string())))?;

        debug!(motor = %name, steps_per_revolution, conversion_factor, "stepper motor started");

        Ok(StepperMotor::from_parts(name, port, status, commands, thread, max_rpm))
    }
}

fn missing(msg: &str) -> Error {
    Error::Config(ConfigError::Parse(truncated(msg)))
}
