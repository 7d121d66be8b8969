//! Spindle rotary encoder.
//!
//! The decoder runs inside the edge callback registered with the hardware
//! layer and is its only writer. After each counted pulse it publishes an
//! [`EncoderSnapshot`] through `ArcSwap`, so readers never block the
//! interrupt-delivery thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, trace};

use crate::config::SpindleConfig;
use crate::error::{ConfigError, Result};
use crate::hal::{spin_until_tick, HardwarePort, PinId};
use crate::motion::Direction;

use super::decoder::{next_zero_phase_tick, EdgeOutcome, EncoderSnapshot, QuadratureDecoder};

#[derive(Debug)]
struct Shared {
    snapshot: ArcSwap<EncoderSnapshot>,
    advance_us: AtomicU64,
}

/// Decoded spindle encoder bound to two hardware pins.
pub struct RotaryEncoder<H: HardwarePort> {
    port: Arc<H>,
    pin_a: PinId,
    pin_b: PinId,
    shared: Arc<Shared>,
}

impl<H: HardwarePort> RotaryEncoder<H> {
    /// Register for edges on `pin_a` (reference) and `pin_b` (quadrature).
    ///
    /// `pulses_per_revolution` counts reference pulses per spindle
    /// revolution, gearing included.
    ///
    /// # Errors
    ///
    /// Fails if the pulse count is not positive, the pins coincide, or the
    /// hardware layer refuses the callback.
    pub fn new(port: Arc<H>, pin_a: PinId, pin_b: PinId, pulses_per_revolution: f64) -> Result<Self> {
        if !pulses_per_revolution.is_finite() || pulses_per_revolution <= 0.0 {
            return Err(ConfigError::InvalidPulsesPerRevolution(pulses_per_revolution).into());
        }
        if pin_a == pin_b {
            return Err(ConfigError::DuplicatePin(pin_a).into());
        }

        let mut decoder = QuadratureDecoder::new(pin_a, pin_b, pulses_per_revolution);
        let shared = Arc::new(Shared {
            snapshot: ArcSwap::from_pointee(decoder.snapshot()),
            advance_us: AtomicU64::new(0f64.to_bits()),
        });

        let writer = shared.clone();
        port.register_edge_callback(
            pin_a,
            pin_b,
            Box::new(move |event| {
                let before = decoder.direction();
                match decoder.on_edge(event) {
                    EdgeOutcome::Ignored | EdgeOutcome::Debounced => {}
                    EdgeOutcome::Level if decoder.direction() == before => {}
                    outcome => {
                        if outcome == EdgeOutcome::Revolution {
                            trace!(tick = event.tick.0, "spindle revolution");
                        }
                        writer.snapshot.store(Arc::new(decoder.snapshot()));
                    }
                }
            }),
        )?;

        debug!(%pin_a, %pin_b, pulses_per_revolution, "rotary encoder registered");

        Ok(Self {
            port,
            pin_a,
            pin_b,
            shared,
        })
    }

    /// Build from a spindle configuration.
    pub fn from_config(config: &SpindleConfig, port: Arc<H>) -> Result<Self> {
        let encoder = Self::new(
            port,
            config.pin_a,
            config.pin_b,
            config.pulses_per_spindle_revolution(),
        )?;
        encoder.set_advance_value_us(config.advance_us);
        Ok(encoder)
    }

    /// Latest decoded state.
    pub fn snapshot(&self) -> EncoderSnapshot {
        **self.shared.snapshot.load()
    }

    /// Spindle speed in rpm. Zero while warming up or once the spindle has
    /// stopped delivering edges.
    pub fn rpm(&self) -> f64 {
        let snapshot = self.snapshot();
        snapshot.rpm_at(self.port.ticks())
    }

    /// Whether the spindle speed is known and edges are still arriving.
    pub fn is_turning(&self) -> bool {
        let snapshot = self.snapshot();
        !snapshot.warming_up && !snapshot.is_stalled(self.port.ticks())
    }

    /// Approximate spindle angle in degrees. Low precision; for diagnostics.
    pub fn position_degrees(&self) -> f64 {
        self.snapshot().position_degrees()
    }

    /// Last decoded rotation direction.
    pub fn rotation_direction(&self) -> Direction {
        self.snapshot().direction
    }

    /// Whether the spindle has not yet been timed over a full revolution.
    pub fn is_warming_up(&self) -> bool {
        self.snapshot().warming_up
    }

    /// Reference pulses per spindle revolution.
    pub fn pulses_per_revolution(&self) -> f64 {
        self.snapshot().pulses_per_revolution
    }

    /// Fire the phase lock `value` microseconds before zero degrees.
    pub fn set_advance_value_us(&self, value: f64) {
        let value = if value.is_finite() { value } else { 0.0 };
        self.shared.advance_us.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Current phase-lock advance in microseconds.
    pub fn advance_value_us(&self) -> f64 {
        f64::from_bits(self.shared.advance_us.load(Ordering::Relaxed))
    }

    /// Run `callback` when the spindle next passes zero degrees (less the
    /// advance).
    ///
    /// Returns `None` without waiting while warming up or while the spindle
    /// is stopped. Otherwise spins on the caller's thread for up to one
    /// revolution. The target tick is extrapolated from the last revolution
    /// boundary and the measured period, not from the next delivered edge,
    /// so edge-delivery latency does not shift it. A spindle that stops
    /// mid-wait is not detected.
    pub fn callback_at_zero_degrees<R>(&self, callback: impl FnOnce() -> R) -> Option<R> {
        let snapshot = self.snapshot();
        if snapshot.warming_up {
            debug!("phase lock requested while encoder warming up");
            return None;
        }
        let now = self.port.ticks();
        if snapshot.is_stalled(now) {
            debug!("phase lock requested while spindle stopped");
            return None;
        }

        let target = next_zero_phase_tick(
            snapshot.last_zero_tick,
            snapshot.revolution_period_us(),
            self.advance_value_us(),
            now,
        );
        spin_until_tick(&*self.port, target);
        Some(callback())
    }
}

impl<H: HardwarePort> core::fmt::Debug for RotaryEncoder<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RotaryEncoder")
            .field("pin_a", &self.pin_a)
            .field("pin_b", &self.pin_b)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl<H: HardwarePort> Drop for RotaryEncoder<H> {
    fn drop(&mut self) {
        self.port.unregister_edge_callback(self.pin_a, self.pin_b);
        debug!(pin_a = %self.pin_a, pin_b = %self.pin_b, "rotary encoder unregistered");
    }
}
