//! Unit test harness for leadscrew-motion.
//!
//! This module organizes unit tests for each component of the library.

use std::time::{Duration, Instant};

use leadscrew_motion::hal::Tick;
use leadscrew_motion::EncoderSnapshot;

mod encoder;
mod motor_motion;
mod properties;
mod sync_protocols;

/// Poll `condition` until it holds or `timeout` passes.
pub(crate) fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// Fraction of a revolution between `tick` and the nearest zero-phase
/// boundary of `snapshot`, in `[-0.5, 0.5)`.
pub(crate) fn phase_from_zero(tick: Tick, snapshot: &EncoderSnapshot) -> f64 {
    let period = snapshot.revolution_period_us();
    let offset = f64::from(tick.signed_since(snapshot.last_zero_tick));
    let phase = offset.rem_euclid(period) / period;
    if phase >= 0.5 {
        phase - 1.0
    } else {
        phase
    }
}
