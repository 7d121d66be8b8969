//! Quadrature decoding.
//!
//! [`QuadratureDecoder`] is a pure state machine fed one [`EdgeEvent`] at a
//! time. It owns no threads and never blocks, so it can run directly inside
//! the hardware layer's edge callback.

use crate::hal::{EdgeEvent, Level, PinId, Tick};
use crate::motion::Direction;

/// Pulse intervals without an edge after which a slow-pulsing spindle is
/// considered stopped.
const STALL_PULSE_INTERVALS: f64 = 4.0;

/// What a single edge did to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// The edge was on neither encoder pin.
    Ignored,
    /// Repeat on the same pin without an edge on the other pin.
    Debounced,
    /// Level recorded; no pulse counted.
    Level,
    /// First reference pulse: timing baseline established.
    Baseline,
    /// Reference pulse counted.
    Pulse,
    /// Reference pulse that completed a spindle revolution.
    Revolution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    A,
    B,
}

/// Immutable view of decoded spindle state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderSnapshot {
    /// True until the first full revolution has been timed.
    pub warming_up: bool,
    /// Last decoded rotation direction.
    pub direction: Direction,
    /// Mean microseconds between reference pulses over the last revolution.
    pub average_tick_delta: f64,
    /// Reference pulses per spindle revolution (after gearing).
    pub pulses_per_revolution: f64,
    /// Tick of the most recent revolution boundary.
    pub last_zero_tick: Tick,
    /// Tick of the most recent reference pulse.
    pub last_edge_tick: Option<Tick>,
    /// Reference pulses counted since `last_zero_tick`.
    pub revolution_phase: f64,
    /// Signed reference pulse count since start-up.
    pub position: i64,
    /// Completed revolutions since start-up.
    pub revolutions: u64,
}

impl EncoderSnapshot {
    /// Spindle speed in rpm as of the last revolution. Zero while warming up.
    ///
    /// A snapshot has no notion of the current time; use
    /// [`rpm_at`](Self::rpm_at) to account for a stopped spindle.
    pub fn rpm(&self) -> f64 {
        let period = self.revolution_period_us();
        if self.warming_up || period <= 0.0 {
            0.0
        } else {
            60_000_000.0 / period
        }
    }

    /// Duration of one spindle revolution in microseconds.
    pub fn revolution_period_us(&self) -> f64 {
        self.average_tick_delta * self.pulses_per_revolution
    }

    /// Whether no reference pulse has arrived for longer than the spindle
    /// needs at its measured speed: one revolution, or four pulse
    /// intervals when a revolution has fewer pulses than that.
    ///
    /// Always true before the first pulse. Edges stamped after `now` count
    /// as fresh.
    pub fn is_stalled(&self, now: Tick) -> bool {
        let Some(last) = self.last_edge_tick else {
            return true;
        };
        let limit = self
            .revolution_period_us()
            .max(STALL_PULSE_INTERVALS * self.average_tick_delta);
        f64::from(now.signed_since(last)) > limit
    }

    /// Spindle speed in rpm at tick `now`. Zero while warming up or stalled.
    pub fn rpm_at(&self, now: Tick) -> f64 {
        if self.is_stalled(now) {
            0.0
        } else {
            self.rpm()
        }
    }

    /// Spindle angle in `[0, 360)` degrees past the last zero-phase
    /// boundary, in the direction of rotation.
    ///
    /// Counts whole pulses, so it is only as current as the last delivered
    /// edge.
    pub fn position_degrees(&self) -> f64 {
        let ppr = self.pulses_per_revolution;
        self.revolution_phase.rem_euclid(ppr) / ppr * 360.0
    }
}

/// Quadrature decoder for a spindle encoder.
#[derive(Debug, Clone)]
pub struct QuadratureDecoder {
    pin_a: PinId,
    pin_b: PinId,
    pulses_per_revolution: f64,
    level_a: Level,
    level_b: Level,
    last_channel: Option<Channel>,
    direction: Direction,
    last_pulse_tick: Option<Tick>,
    tick_diff_total: u64,
    revolution_pulses: u32,
    /// Pulses into the current revolution, carried fractionally.
    revolution_phase: f64,
    average_tick_delta: f64,
    last_zero_tick: Tick,
    position: i64,
    revolutions: u64,
    warming_up: bool,
}

impl QuadratureDecoder {
    /// Create a decoder for reference pin `pin_a` and quadrature pin `pin_b`.
    pub fn new(pin_a: PinId, pin_b: PinId, pulses_per_revolution: f64) -> Self {
        Self {
            pin_a,
            pin_b,
            pulses_per_revolution,
            level_a: Level::Low,
            level_b: Level::Low,
            last_channel: None,
            direction: Direction::Forward,
            last_pulse_tick: None,
            tick_diff_total: 0,
            revolution_pulses: 0,
            revolution_phase: 0.0,
            average_tick_delta: 0.0,
            last_zero_tick: Tick(0),
            position: 0,
            revolutions: 0,
            warming_up: true,
        }
    }

    /// Feed one edge.
    pub fn on_edge(&mut self, event: EdgeEvent) -> EdgeOutcome {
        let channel = if event.pin == self.pin_a {
            Channel::A
        } else if event.pin == self.pin_b {
            Channel::B
        } else {
            return EdgeOutcome::Ignored;
        };

        let repeated = self.last_channel == Some(channel);
        match channel {
            Channel::A => self.level_a = event.level,
            Channel::B => self.level_b = event.level,
        }
        if repeated {
            return EdgeOutcome::Debounced;
        }
        self.last_channel = Some(channel);

        if !event.level.is_high() {
            return EdgeOutcome::Level;
        }

        match channel {
            Channel::B => {
                if self.level_a.is_high() {
                    self.direction = Direction::Reverse;
                }
                EdgeOutcome::Level
            }
            Channel::A => {
                if self.level_b.is_high() {
                    self.direction = Direction::Forward;
                }
                self.count_pulse(event.tick)
            }
        }
    }

    fn count_pulse(&mut self, tick: Tick) -> EdgeOutcome {
        let Some(previous) = self.last_pulse_tick.replace(tick) else {
            return EdgeOutcome::Baseline;
        };

        self.tick_diff_total += u64::from(tick.elapsed_since(previous));
        self.revolution_pulses += 1;
        self.position += self.direction.sign();
        self.revolution_phase += 1.0;

        if self.revolution_phase < self.pulses_per_revolution {
            return EdgeOutcome::Pulse;
        }

        self.revolution_phase -= self.pulses_per_revolution;
        self.average_tick_delta = self.tick_diff_total as f64 / f64::from(self.revolution_pulses);
        self.tick_diff_total = 0;
        self.revolution_pulses = 0;
        self.last_zero_tick = tick;
        self.revolutions += 1;
        self.warming_up = false;
        EdgeOutcome::Revolution
    }

    /// Whether the first revolution is still being timed.
    #[inline]
    pub fn is_warming_up(&self) -> bool {
        self.warming_up
    }

    /// Last decoded direction.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Copy of the decoded state.
    pub fn snapshot(&self) -> EncoderSnapshot {
        EncoderSnapshot {
            warming_up: self.warming_up,
            direction: self.direction,
            average_tick_delta: self.average_tick_delta,
            pulses_per_revolution: self.pulses_per_revolution,
            last_zero_tick: self.last_zero_tick,
            last_edge_tick: self.last_pulse_tick,
            revolution_phase: self.revolution_phase,
            position: self.position,
            revolutions: self.revolutions,
        }
    }
}

/// First zero-phase tick at or after `now`, shifted earlier by `advance_us`.
///
/// Extrapolates from the last observed revolution boundary by whole
/// revolution periods. All arithmetic wraps with the tick counter.
pub fn next_zero_phase_tick(last_zero: Tick, period_us: f64, advance_us: f64, now: Tick) -> Tick {
    let period = period_us.round().clamp(1.0, i32::MAX as f64) as u32;
    let offset = (period_us - advance_us).round().clamp(i32::MIN as f64, i32::MAX as f64) as i32;
    let target = Tick(last_zero.0.wrapping_add_signed(offset));

    let behind = now.signed_since(target);
    if behind <= 0 {
        return target;
    }
    let periods = behind as u64 / u64::from(period) + 1;
    target.add_us((periods * u64::from(period)) as u32)
}
