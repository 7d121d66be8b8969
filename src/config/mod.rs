//! Configuration module for leadscrew-motion.
//!
//! Provides types for loading and validating axis, spindle and threading
//! configuration from TOML. The motion core itself never parses text: these
//! types are turned into builder calls by [`Lathe`](crate::motor::Lathe).

mod axis;
mod loader;
mod spindle;
mod system;
pub mod units;
mod validation;

pub use axis::AxisConfig;
pub use loader::{expand_references, load_config, parse_config};
pub use spindle::{SpindleConfig, ThreadingConfig};
pub use system::{MachineConfig, CARRIAGE_AXIS, CROSS_AXIS};
pub use validation::validate_config;

// Re-export unit types at config level
pub use units::{Degrees, Rpm, StepDelay, Steps};
