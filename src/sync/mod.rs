//! Synchronisation protocols.
//!
//! Policies composed from [`StepperMotor`](crate::motor::StepperMotor) and
//! [`RotaryEncoder`](crate::encoder::RotaryEncoder), evaluated by the caller
//! once per tick:
//!
//! - **Thread cutting**: [`ThreadingLock`] keeps the carriage speed at
//!   `pitch × spindle rpm` and starts every pass at the same spindle phase.
//! - **Taper / radius**: [`engage_cross_slave`] slaves the cross-slide to the
//!   carriage through a [`taper`] or [`scale`] transform.

mod threading;
mod transform;

pub use crate::motor::SyncTransform;
pub use threading::{ThreadingLock, ThreadingStatus};
pub use transform::{engage_cross_slave, scale, taper};
