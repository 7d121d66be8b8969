//! Motion module for leadscrew-motion.
//!
//! Provides the direction type and speed ramping shared by the motor loop.

mod direction;
mod ramp;

pub use direction::Direction;
pub use ramp::SpeedRamp;
