//! Spindle encoder.
//!
//! Decodes quadrature edges into spindle speed, direction and phase, and
//! provides the zero-degree phase lock used to start thread-cutting passes.

mod decoder;
mod rotary;

pub use decoder::{next_zero_phase_tick, EdgeOutcome, EncoderSnapshot, QuadratureDecoder};
pub use rotary::RotaryEncoder;
