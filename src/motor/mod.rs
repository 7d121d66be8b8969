//! Stepper motors.
//!
//! Each [`StepperMotor`] owns one control thread that turns commands into
//! timed step pulses. The handle and the thread share nothing but a command
//! channel and a [`MotorStatus`] of atomics.

mod builder;
mod command;
mod control;
mod driver;
mod position;
pub mod state;
mod status;
mod system;

pub use builder::StepperMotorBuilder;
pub use command::SyncTransform;
pub use driver::StepperMotor;
pub use position::{Backlash, PulseKind, StepCounter};
pub use state::{MotionState, RampState, StateName};
pub use status::{MotorSnapshot, MotorStatus};
pub use system::Lathe;
