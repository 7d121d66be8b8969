//! Spindle encoder and threading configuration.

use serde::Deserialize;

use crate::hal::PinId;

/// Spindle rotary encoder configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SpindleConfig {
    /// Reference (A) channel.
    pub pin_a: PinId,

    /// Quadrature (B) channel.
    pub pin_b: PinId,

    /// Encoder pulses per encoder revolution.
    pub pulses_per_revolution: f64,

    /// Encoder revolutions per spindle revolution.
    #[serde(default = "default_gear_ratio")]
    pub gear_ratio: f64,

    /// Initial phase-lock advance in microseconds.
    #[serde(default)]
    pub advance_us: f64,
}

fn default_gear_ratio() -> f64 {
    1.0
}

impl SpindleConfig {
    /// Encoder pulses per spindle revolution after gearing.
    pub fn pulses_per_spindle_revolution(&self) -> f64 {
        self.pulses_per_revolution * self.gear_ratio
    }
}

/// Thread-cutting limits.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadingConfig {
    /// Highest axial speed (distance per minute) allowed while threading.
    ///
    /// Defaults to the carriage axis `max_speed`.
    #[serde(default)]
    pub max_axial_speed: Option<f64>,

    /// Thread pitch selected at start-up.
    #[serde(default = "default_pitch")]
    pub pitch: f64,
}

fn default_pitch() -> f64 {
    1.0
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            max_axial_speed: None,
            pitch: default_pitch(),
        }
    }
}
