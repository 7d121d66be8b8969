//! Hardware port abstraction.
//!
//! The motion core talks to GPIO hardware only through [`HardwarePort`]:
//! embedded-hal [`OutputPin`]s for STEP/DIR/ENABLE, edge-interrupt callbacks
//! for the spindle encoder, a free-running microsecond tick counter and a
//! microsecond delay.

use core::fmt;

use embedded_hal::digital::OutputPin;
use serde::Deserialize;

use crate::error::HardwareError;

#[cfg(feature = "sim")]
pub mod sim;

/// Hardware pin number (BCM numbering on a Raspberry Pi).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct PinId(pub u8);

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Digital level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    /// Logic low.
    #[default]
    Low,
    /// Logic high.
    High,
}

impl Level {
    /// Whether the level is high.
    #[inline]
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Drive an output pin to `level`.
pub(crate) fn write_level<P: OutputPin>(pin: &mut P, level: Level) -> Result<(), P::Error> {
    match level {
        Level::High => pin.set_high(),
        Level::Low => pin.set_low(),
    }
}

/// Reading of the free-running microsecond tick counter.
///
/// The counter wraps at `u32::MAX`; all arithmetic goes through the
/// wrapping helpers so differences stay correct across the wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tick(pub u32);

impl Tick {
    /// Microseconds elapsed from `earlier` to `self`.
    #[inline]
    pub fn elapsed_since(self, earlier: Tick) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Signed distance from `other` to `self` (positive when `self` is later).
    #[inline]
    pub fn signed_since(self, other: Tick) -> i32 {
        self.0.wrapping_sub(other.0) as i32
    }

    /// Tick `us` microseconds later.
    #[inline]
    pub fn add_us(self, us: u32) -> Tick {
        Tick(self.0.wrapping_add(us))
    }

    /// Tick `us` microseconds earlier.
    #[inline]
    pub fn sub_us(self, us: u32) -> Tick {
        Tick(self.0.wrapping_sub(us))
    }
}

/// A level change reported by the hardware layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    /// Pin that changed.
    pub pin: PinId,
    /// New level.
    pub level: Level,
    /// Tick counter value when the edge was sampled.
    pub tick: Tick,
}

/// Edge callback installed by the encoder.
pub type EdgeHandler = Box<dyn FnMut(EdgeEvent) + Send + 'static>;

/// Capability required from the GPIO layer.
///
/// Implementations must be shareable between the motor control threads,
/// the encoder and the application thread.
pub trait HardwarePort: Send + Sync + 'static {
    /// Output pin handed out for STEP, DIR and ENABLE lines.
    type Pin: OutputPin + Send + 'static;

    /// Claim a pin as an output.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::PinUnavailable`] if the pin cannot be used.
    fn output_pin(&self, pin: PinId) -> Result<Self::Pin, HardwareError>;

    /// Current value of the free-running microsecond counter.
    fn ticks(&self) -> Tick;

    /// Block the calling thread for roughly `us` microseconds.
    fn delay_us(&self, us: u32);

    /// Deliver every edge on `pin_a` and `pin_b` to `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::CallbackRegistration`] if the layer cannot
    /// watch the pins.
    fn register_edge_callback(
        &self,
        pin_a: PinId,
        pin_b: PinId,
        handler: EdgeHandler,
    ) -> Result<(), HardwareError>;

    /// Stop delivering edges for a pin pair registered earlier.
    fn unregister_edge_callback(&self, pin_a: PinId, pin_b: PinId);
}

/// Busy-wait until `duration_us` microseconds have passed since `start`.
///
/// Spins on the tick counter instead of sleeping: OS wake-up granularity is
/// far coarser than the pulse periods involved.
#[inline]
pub fn spin_until<H: HardwarePort + ?Sized>(port: &H, start: Tick, duration_us: u32) {
    while port.ticks().elapsed_since(start) < duration_us {
        core::hint::spin_loop();
    }
}

/// Busy-wait until the tick counter reaches `target`.
#[inline]
pub fn spin_until_tick<H: HardwarePort + ?Sized>(port: &H, target: Tick) {
    while target.signed_since(port.ticks()) > 0 {
        core::hint::spin_loop();
    }
}
