//! Simulated hardware for demos and tests.
//!
//! [`SimulatedPort`] backs the tick counter with a monotonic clock, records
//! every pin write and lets callers inject encoder edges. [`SpindleSimulator`]
//! drives a quadrature pin pair from a background thread as a turning spindle
//! would.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use embedded_hal::digital::{ErrorType, OutputPin};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::HardwareError;

use super::{EdgeEvent, EdgeHandler, HardwarePort, Level, PinId, Tick};

/// Recorded state of one simulated output pin.
#[derive(Debug, Default)]
struct PinRecord {
    high: AtomicBool,
    rising_edges: AtomicU64,
    writes: AtomicU64,
}

/// Output pin handed out by [`SimulatedPort`].
#[derive(Debug, Clone)]
pub struct SimPin {
    id: PinId,
    record: Arc<PinRecord>,
}

impl SimPin {
    /// Pin number.
    pub fn id(&self) -> PinId {
        self.id
    }

    fn write(&self, high: bool) {
        let was_high = self.record.high.swap(high, Ordering::AcqRel);
        if high && !was_high {
            self.record.rising_edges.fetch_add(1, Ordering::Relaxed);
        }
        self.record.writes.fetch_add(1, Ordering::Relaxed);
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false);
        Ok(())
    }
}

struct Registration {
    pin_a: PinId,
    pin_b: PinId,
    handler: Arc<Mutex<EdgeHandler>>,
}

/// Software implementation of [`HardwarePort`].
pub struct SimulatedPort {
    epoch: Instant,
    tick_offset: u32,
    pins: Mutex<HashMap<PinId, Arc<PinRecord>>>,
    callbacks: Mutex<Vec<Registration>>,
    fail_init: bool,
}

impl Default for SimulatedPort {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPort {
    /// Create a port whose tick counter starts at zero.
    pub fn new() -> Self {
        Self::with_tick_offset(0)
    }

    /// Create a port whose tick counter starts at `offset`.
    ///
    /// Starting close to `u32::MAX` exercises counter wrap-around.
    pub fn with_tick_offset(offset: u32) -> Self {
        Self {
            epoch: Instant::now(),
            tick_offset: offset,
            pins: Mutex::new(HashMap::new()),
            callbacks: Mutex::new(Vec::new()),
            fail_init: false,
        }
    }

    /// Create a port whose initialisation always fails.
    pub fn unavailable() -> Self {
        Self {
            fail_init: true,
            ..Self::new()
        }
    }

    /// Last level written to `pin`, if it was ever claimed.
    pub fn pin_level(&self, pin: PinId) -> Option<Level> {
        self.pins
            .lock()
            .get(&pin)
            .map(|r| Level::from(r.high.load(Ordering::Acquire)))
    }

    /// Number of low-to-high transitions written to `pin`.
    pub fn rising_edges(&self, pin: PinId) -> u64 {
        self.pins
            .lock()
            .get(&pin)
            .map(|r| r.rising_edges.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Number of writes (of either level) made to `pin`.
    pub fn writes(&self, pin: PinId) -> u64 {
        self.pins
            .lock()
            .get(&pin)
            .map(|r| r.writes.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Whether an edge callback is installed for `pin`.
    pub fn has_edge_callback(&self, pin: PinId) -> bool {
        self.callbacks
            .lock()
            .iter()
            .any(|r| r.pin_a == pin || r.pin_b == pin)
    }

    /// Deliver an edge on `pin` to its registered handler, stamped now.
    ///
    /// Returns `false` if no handler watches the pin.
    pub fn emit_edge(&self, pin: PinId, level: Level) -> bool {
        let tick = self.ticks();
        self.emit_edge_at(pin, level, tick)
    }

    /// Deliver an edge on `pin` with an explicit tick stamp.
    pub fn emit_edge_at(&self, pin: PinId, level: Level, tick: Tick) -> bool {
        let handler = self
            .callbacks
            .lock()
            .iter()
            .find(|r| r.pin_a == pin || r.pin_b == pin)
            .map(|r| r.handler.clone());

        match handler {
            Some(handler) => {
                (handler.lock())(EdgeEvent { pin, level, tick });
                true
            }
            None => false,
        }
    }
}

impl HardwarePort for SimulatedPort {
    type Pin = SimPin;

    fn output_pin(&self, pin: PinId) -> Result<Self::Pin, HardwareError> {
        if self.fail_init {
            return Err(HardwareError::InitFailed(crate::error::truncated(
                "simulated hardware unavailable",
            )));
        }

        let mut pins = self.pins.lock();
        if pins.contains_key(&pin) {
            return Err(HardwareError::PinUnavailable(pin));
        }
        let record = Arc::new(PinRecord::default());
        pins.insert(pin, record.clone());
        trace!("claimed simulated pin {}", pin);
        Ok(SimPin { id: pin, record })
    }

    fn ticks(&self) -> Tick {
        let micros = self.epoch.elapsed().as_micros() as u64;
        Tick((micros as u32).wrapping_add(self.tick_offset))
    }

    fn delay_us(&self, us: u32) {
        spin_sleep::sleep(Duration::from_micros(us as u64));
    }

    fn register_edge_callback(
        &self,
        pin_a: PinId,
        pin_b: PinId,
        handler: EdgeHandler,
    ) -> Result<(), HardwareError> {
        if self.fail_init {
            return Err(HardwareError::CallbackRegistration { pin_a, pin_b });
        }

        let mut callbacks = self.callbacks.lock();
        let taken = callbacks
            .iter()
            .any(|r| [r.pin_a, r.pin_b].iter().any(|p| *p == pin_a || *p == pin_b));
        if taken {
            return Err(HardwareError::CallbackRegistration { pin_a, pin_b });
        }
        callbacks.push(Registration {
            pin_a,
            pin_b,
            handler: Arc::new(Mutex::new(handler)),
        });
        Ok(())
    }

    fn unregister_edge_callback(&self, pin_a: PinId, pin_b: PinId) {
        self.callbacks
            .lock()
            .retain(|r| !(r.pin_a == pin_a && r.pin_b == pin_b));
    }
}

/// Background thread producing quadrature edges for a turning spindle.
///
/// Forward rotation raises B before A, so each rising edge on A sees B high.
pub struct SpindleSimulator {
    running: Arc<AtomicBool>,
    rpm_bits: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl SpindleSimulator {
    /// Start turning at `rpm` (negative for reverse) with `pulses_per_revolution`
    /// pulses on each of `pin_a` and `pin_b`.
    pub fn start(
        port: Arc<SimulatedPort>,
        pin_a: PinId,
        pin_b: PinId,
        pulses_per_revolution: u32,
        rpm: f64,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let rpm_bits = Arc::new(AtomicU64::new(rpm.to_bits()));
        let pulses = pulses_per_revolution.max(1) as f64;

        let thread = {
            let running = running.clone();
            let rpm_bits = rpm_bits.clone();
            std::thread::spawn(move || {
                debug!("spindle simulator started");
                let mut phase = 0usize;
                let mut next = Instant::now();
                while running.load(Ordering::Acquire) {
                    let rpm = f64::from_bits(rpm_bits.load(Ordering::Relaxed));
                    if rpm.abs() < 1e-3 {
                        std::thread::sleep(Duration::from_millis(1));
                        next = Instant::now();
                        continue;
                    }

                    let quarter_us = 60_000_000.0 / (rpm.abs() * pulses * 4.0);
                    next += Duration::from_nanos((quarter_us * 1000.0) as u64);
                    let now = Instant::now();
                    if next > now {
                        spin_sleep::sleep(next - now);
                    }

                    let (pin, level) = quadrature_edge(pin_a, pin_b, phase, rpm > 0.0);
                    port.emit_edge(pin, level);
                    phase = (phase + 1) % 4;
                }
                debug!("spindle simulator stopped");
            })
        };

        Self {
            running,
            rpm_bits,
            thread: Some(thread),
        }
    }

    /// Change spindle speed.
    pub fn set_rpm(&self, rpm: f64) {
        self.rpm_bits.store(rpm.to_bits(), Ordering::Relaxed);
    }
}

impl Drop for SpindleSimulator {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Edge number `phase` (0..4) of one quadrature cycle.
fn quadrature_edge(pin_a: PinId, pin_b: PinId, phase: usize, forward: bool) -> (PinId, Level) {
    let (lead, lag) = if forward { (pin_b, pin_a) } else { (pin_a, pin_b) };
    match phase {
        0 => (lead, Level::High),
        1 => (lag, Level::High),
        2 => (lead, Level::Low),
        _ => (lag, Level::Low),
    }
}
