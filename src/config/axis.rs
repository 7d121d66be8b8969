//! Linear axis configuration from TOML.

use heapless::String;
use serde::Deserialize;

use crate::hal::PinId;

use super::units::Rpm;

/// Complete configuration of one stepper-driven axis.
#[derive(Debug, Clone, Deserialize)]
pub struct AxisConfig {
    /// Human-readable name (max 32 chars).
    #[serde(default)]
    pub name: String<32>,

    /// STEP output pin.
    pub step_pin: PinId,

    /// DIR output pin.
    pub dir_pin: PinId,

    /// Optional driver ENABLE pin.
    #[serde(default)]
    pub enable_pin: Option<PinId>,

    /// Whether the driver is enabled by pulling ENABLE low.
    #[serde(default = "default_true")]
    pub enable_active_low: bool,

    /// Steps per motor revolution, including microstepping.
    pub steps_per_revolution: u32,

    /// Distance the axis moves per step (linear-scale resolution).
    ///
    /// The sign encodes which way the motor is wired relative to the axis.
    pub distance_per_step: f64,

    /// Maximum axis speed in distance units per minute.
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,

    /// Whether speed changes are ramped.
    #[serde(default = "default_true")]
    pub ramping: bool,

    /// Ramp rate in motor rpm per second.
    #[serde(default = "default_ramp_rate", rename = "ramp_rate_rpm_per_sec")]
    pub ramp_rate: f64,

    /// Speed every ramped move starts from, in motor rpm.
    #[serde(default = "default_ramp_start_rpm")]
    pub ramp_start_rpm: f64,

    /// Extra pulses taken up when reversing into forward motion.
    #[serde(default)]
    pub backlash_forward: u32,

    /// Extra pulses taken up when reversing into reverse motion.
    #[serde(default)]
    pub backlash_reverse: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_speed() -> f64 {
    1000.0
}

fn default_ramp_rate() -> f64 {
    200.0
}

fn default_ramp_start_rpm() -> f64 {
    10.0
}

impl AxisConfig {
    /// Create a configuration with the required fields and defaults elsewhere.
    pub fn new(
        step_pin: PinId,
        dir_pin: PinId,
        steps_per_revolution: u32,
        distance_per_step: f64,
    ) -> Self {
        Self {
            name: String::new(),
            step_pin,
            dir_pin,
            enable_pin: None,
            enable_active_low: true,
            steps_per_revolution,
            distance_per_step,
            max_speed: default_max_speed(),
            ramping: true,
            ramp_rate: default_ramp_rate(),
            ramp_start_rpm: default_ramp_start_rpm(),
            backlash_forward: 0,
            backlash_reverse: 0,
        }
    }

    /// Distance moved per motor revolution.
    pub fn distance_per_revolution(&self) -> f64 {
        self.distance_per_step.abs() * self.steps_per_revolution as f64
    }

    /// Motor speed corresponding to [`max_speed`](Self::max_speed).
    pub fn max_rpm(&self) -> Rpm {
        Rpm(self.max_speed / self.distance_per_revolution())
    }

    /// All pins this axis drives.
    pub fn pins(&self) -> impl Iterator<Item = PinId> {
        [Some(self.step_pin), Some(self.dir_pin), self.enable_pin]
            .into_iter()
            .flatten()
    }
}
