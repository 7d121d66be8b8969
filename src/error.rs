//! Error types for leadscrew-motion.
//!
//! Only construction paths return errors. Steady-state motor and encoder
//! operations clamp or ignore bad input instead of failing.

use thiserror::Error;

use crate::hal::PinId;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all leadscrew-motion operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Configuration parsing or validation error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Hardware layer initialisation error
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    #[error("Parse error: {0}")]
    Parse(heapless::String<128>),
    /// File could not be read
    #[error("I/O error: {0}")]
    Io(heapless::String<128>),
    /// Axis name not found in configuration
    #[error("Axis '{0}' not found")]
    AxisNotFound(heapless::String<32>),
    /// A `${KEY}` reference could not be resolved
    #[error("Unresolved reference '${{{0}}}'")]
    UnresolvedReference(heapless::String<64>),
    /// Steps per revolution must be > 0
    #[error("Invalid steps per revolution: {0}. Must be > 0")]
    InvalidStepsPerRevolution(u32),
    /// Distance per step must be finite and non-zero
    #[error("Invalid conversion factor: {0}. Must be finite and non-zero")]
    InvalidConversionFactor(f64),
    /// Maximum speed must be > 0
    #[error("Invalid max speed: {0}. Must be > 0")]
    InvalidMaxSpeed(f64),
    /// Ramp rate must be >= 0
    #[error("Invalid ramp rate: {0}. Must be >= 0")]
    InvalidRampRate(f64),
    /// Ramp start speed must be > 0
    #[error("Invalid ramp start speed: {0} rpm. Must be > 0")]
    InvalidRampStartSpeed(f64),
    /// Encoder pulses per revolution (after gearing) must be > 0
    #[error("Invalid encoder pulses per revolution: {0}. Must be > 0")]
    InvalidPulsesPerRevolution(f64),
    /// The same pin is assigned twice
    #[error("Pin {0} is assigned more than once")]
    DuplicatePin(PinId),
    /// At most two linear axes are supported
    #[error("Too many axes: {0} (max 2)")]
    TooManyAxes(usize),
}

/// Hardware initialisation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HardwareError {
    /// The hardware layer refused to hand out a pin
    #[error("Pin {0} is unavailable")]
    PinUnavailable(PinId),
    /// Writing an initial level to a pin failed
    #[error("GPIO pin {0} write failed")]
    PinWrite(PinId),
    /// Edge callback registration failed
    #[error("Edge callback registration failed for pins {pin_a}/{pin_b}")]
    CallbackRegistration {
        /// Reference (A) pin
        pin_a: PinId,
        /// Quadrature (B) pin
        pin_b: PinId,
    },
    /// The hardware subsystem could not be initialised
    #[error("Hardware initialisation failed: {0}")]
    InitFailed(heapless::String<64>),
    /// The motor control thread could not be started
    #[error("Failed to spawn control thread: {0}")]
    ThreadSpawn(heapless::String<64>),
}

/// Truncate a message into a fixed-capacity string.
pub(crate) fn truncated<const N: usize>(msg: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in msg.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
