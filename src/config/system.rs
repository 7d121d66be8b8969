//! Machine configuration - root configuration structure.

use heapless::{FnvIndexMap, String};
use serde::Deserialize;

use super::axis::AxisConfig;
use super::spindle::{SpindleConfig, ThreadingConfig};

/// Key of the carriage (leadscrew) axis.
pub const CARRIAGE_AXIS: &str = "z";

/// Key of the cross-slide axis.
pub const CROSS_AXIS: &str = "x";

/// Root configuration structure from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineConfig {
    /// Named axis configurations (`z` carriage, optional `x` cross-slide).
    pub axes: FnvIndexMap<String<16>, AxisConfig, 4>,

    /// Spindle encoder.
    pub spindle: SpindleConfig,

    /// Thread-cutting limits.
    #[serde(default)]
    pub threading: ThreadingConfig,
}

impl MachineConfig {
    /// Get an axis configuration by key.
    pub fn axis(&self, name: &str) -> Option<&AxisConfig> {
        self.axes
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }

    /// The carriage axis, if configured.
    pub fn carriage(&self) -> Option<&AxisConfig> {
        self.axis(CARRIAGE_AXIS)
    }

    /// The cross-slide axis, if configured.
    pub fn cross_slide(&self) -> Option<&AxisConfig> {
        self.axis(CROSS_AXIS)
    }

    /// List all axis keys.
    pub fn axis_names(&self) -> impl Iterator<Item = &str> {
        self.axes.keys().map(|s| s.as_str())
    }

    /// Axial speed limit for threading.
    pub fn max_threading_speed(&self) -> Option<f64> {
        self.threading
            .max_axial_speed
            .or_else(|| self.carriage().map(|c| c.max_speed))
    }
}
