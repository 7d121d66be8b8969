//! # leadscrew-motion
//!
//! Motion-control core of an electronic leadscrew: stepper axes driven in
//! lock-step with a lathe spindle for power feed, taper turning and
//! single-point thread cutting.
//!
//! ## Features
//!
//! - **Thread-per-axis pulse generation**: each [`StepperMotor`] owns a control
//!   thread that times STEP pulses against the hardware tick counter
//! - **Ramped speed control** and **backlash compensation**
//! - **Cross-axis slaving**: a slave follows a master through a transform,
//!   without extending the master's lifetime
//! - **Spindle encoder**: quadrature decoding, per-revolution rpm averaging and
//!   a latency-compensated zero-degree phase lock
//! - **Configuration-driven**: axes and spindle from TOML with `${KEY}` references
//! - **embedded-hal 1.0**: STEP/DIR/ENABLE lines are `OutputPin`s handed out by a
//!   [`HardwarePort`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use leadscrew_motion::{hal::sim::SimulatedPort, PinId, StepperMotorBuilder};
//!
//! let port = Arc::new(SimulatedPort::new());
//! let carriage = StepperMotorBuilder::new()
//!     .name("z")
//!     .pins(PinId(20), PinId(21))
//!     .steps_per_revolution(1000)
//!     .conversion_factor(-0.005)
//!     .build(port)?;
//!
//! carriage.set_speed(120.0);
//! carriage.go_to_position(-25.0);
//! carriage.wait();
//! ```
//!
//! ## Feature Flags
//!
//! - `sim` (default): software [`HardwarePort`] and spindle simulator for
//!   demos and tests

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]

// Core modules
pub mod config;
pub mod encoder;
pub mod error;
pub mod hal;
pub mod motion;
pub mod motor;
pub mod sync;

// Re-exports for ergonomic API
pub use config::{load_config, parse_config, validate_config, AxisConfig, MachineConfig, SpindleConfig};
pub use encoder::{EncoderSnapshot, RotaryEncoder};
pub use error::{ConfigError, Error, HardwareError, Result};
pub use hal::{HardwarePort, Level, PinId, Tick};
pub use motion::Direction;
pub use motor::{state, Lathe, MotorSnapshot, StepperMotor, StepperMotorBuilder};
pub use sync::{ThreadingLock, ThreadingStatus};

// Unit types
pub use config::units::{Degrees, Rpm, StepDelay, Steps};
