//! Configuration validation.

use crate::error::{ConfigError, Result};
use crate::hal::PinId;

use super::{AxisConfig, MachineConfig, SpindleConfig};

/// Validate a machine configuration.
///
/// Checks:
/// - At most two axes are configured
/// - Axis calibration constants are usable
/// - Encoder pulse count is positive
/// - No pin is assigned twice
pub fn validate_config(config: &MachineConfig) -> Result<()> {
    if config.axes.len() > 2 {
        return Err(ConfigError::TooManyAxes(config.axes.len()).into());
    }

    for (_, axis) in config.axes.iter() {
        validate_axis(axis)?;
    }

    validate_spindle(&config.spindle)?;

    if let Some(max) = config.threading.max_axial_speed {
        if !is_positive(max) {
            return Err(ConfigError::InvalidMaxSpeed(max).into());
        }
    }

    let mut seen: heapless::Vec<PinId, 16> = heapless::Vec::new();
    let spindle_pins = [config.spindle.pin_a, config.spindle.pin_b];
    let pins = config
        .axes
        .values()
        .flat_map(|a| a.pins())
        .chain(spindle_pins);
    for pin in pins {
        if seen.contains(&pin) {
            return Err(ConfigError::DuplicatePin(pin).into());
        }
        // Capacity covers two axes of three pins plus two encoder pins
        let _ = seen.push(pin);
    }

    Ok(())
}

pub(crate) fn validate_axis(axis: &AxisConfig) -> Result<()> {
    if axis.steps_per_revolution == 0 {
        return Err(ConfigError::InvalidStepsPerRevolution(axis.steps_per_revolution).into());
    }

    if !axis.distance_per_step.is_finite() || axis.distance_per_step == 0.0 {
        return Err(ConfigError::InvalidConversionFactor(axis.distance_per_step).into());
    }

    if !is_positive(axis.max_speed) {
        return Err(ConfigError::InvalidMaxSpeed(axis.max_speed).into());
    }

    if axis.ramp_rate.is_nan() || axis.ramp_rate < 0.0 {
        return Err(ConfigError::InvalidRampRate(axis.ramp_rate).into());
    }

    if !is_positive(axis.ramp_start_rpm) {
        return Err(ConfigError::InvalidRampStartSpeed(axis.ramp_start_rpm).into());
    }

    Ok(())
}

/// False for zero, negatives and NaN.
fn is_positive(value: f64) -> bool {
    value > 0.0
}

pub(crate) fn validate_spindle(spindle: &SpindleConfig) -> Result<()> {
    let pulses = spindle.pulses_per_spindle_revolution();
    if !pulses.is_finite() || pulses <= 0.0 {
        return Err(ConfigError::InvalidPulsesPerRevolution(pulses).into());
    }
    if spindle.pin_a == spindle.pin_b {
        return Err(ConfigError::DuplicatePin(spindle.pin_a).into());
    }
    Ok(())
}
