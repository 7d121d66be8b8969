//! Published motor state.
//!
//! The control loop is the only writer of positions and motion flags; every
//! other thread reads them lock-free. Values may be one loop iteration stale,
//! which is below the latency of the mechanism itself.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use crate::config::units::Rpm;
use crate::motion::Direction;

/// Shared, atomically updated view of one motor.
#[derive(Debug)]
pub struct MotorStatus {
    current_step: AtomicI64,
    raw_step: AtomicI64,
    target_step: AtomicI64,
    forward: AtomicBool,
    busy: AtomicBool,
    running: AtomicBool,
    synchronised: AtomicBool,
    ramping: AtomicBool,
    target_rpm: AtomicU64,
    ramped_rpm: AtomicU64,
    conversion_factor: f64,
    steps_per_revolution: u32,
}

/// Point-in-time copy of a motor's state for pollers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorSnapshot {
    /// Backlash-compensated position.
    pub current_step: i64,
    /// Pulses emitted, net of direction.
    pub raw_step: i64,
    /// Step the motor is heading for.
    pub target_step: i64,
    /// Direction of the last commanded move.
    pub direction: Direction,
    /// Whether a move is in progress.
    pub busy: bool,
    /// Whether the motor is following another motor.
    pub synchronised: bool,
    /// Commanded speed.
    pub target_rpm: Rpm,
    /// Speed the loop is stepping at.
    pub ramped_rpm: Rpm,
}

impl MotorStatus {
    pub(crate) fn new(steps_per_revolution: u32, conversion_factor: f64, rpm: Rpm) -> Self {
        Self {
            current_step: AtomicI64::new(0),
            raw_step: AtomicI64::new(0),
            target_step: AtomicI64::new(0),
            forward: AtomicBool::new(true),
            busy: AtomicBool::new(false),
            running: AtomicBool::new(true),
            synchronised: AtomicBool::new(false),
            ramping: AtomicBool::new(true),
            target_rpm: AtomicU64::new(rpm.0.to_bits()),
            ramped_rpm: AtomicU64::new(rpm.0.to_bits()),
            conversion_factor,
            steps_per_revolution,
        }
    }

    /// Backlash-compensated position (relaxed read).
    #[inline]
    pub fn current_step(&self) -> i64 {
        self.current_step.load(Ordering::Relaxed)
    }

    /// Raw pulse count.
    #[inline]
    pub fn raw_step(&self) -> i64 {
        self.raw_step.load(Ordering::Relaxed)
    }

    /// Target step.
    #[inline]
    pub fn target_step(&self) -> i64 {
        self.target_step.load(Ordering::Relaxed)
    }

    /// Direction of the last commanded move.
    #[inline]
    pub fn direction(&self) -> Direction {
        if self.forward.load(Ordering::Relaxed) {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }

    /// Whether a move is in progress.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Whether the control loop should keep running.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Whether the motor is following another motor.
    #[inline]
    pub fn is_synchronised(&self) -> bool {
        self.synchronised.load(Ordering::Relaxed)
    }

    /// Whether speed ramping is enabled.
    #[inline]
    pub fn is_ramping_enabled(&self) -> bool {
        self.ramping.load(Ordering::Relaxed)
    }

    /// Commanded speed.
    #[inline]
    pub fn target_rpm(&self) -> Rpm {
        Rpm(f64::from_bits(self.target_rpm.load(Ordering::Relaxed)))
    }

    /// Speed the loop is currently stepping at.
    #[inline]
    pub fn ramped_rpm(&self) -> Rpm {
        Rpm(f64::from_bits(self.ramped_rpm.load(Ordering::Relaxed)))
    }

    /// Distance per step.
    #[inline]
    pub fn conversion_factor(&self) -> f64 {
        self.conversion_factor
    }

    /// Steps per motor revolution.
    #[inline]
    pub fn steps_per_revolution(&self) -> u32 {
        self.steps_per_revolution
    }

    /// Take a consistent-enough copy of every field.
    pub fn snapshot(&self) -> MotorSnapshot {
        MotorSnapshot {
            current_step: self.current_step(),
            raw_step: self.raw_step(),
            target_step: self.target_step(),
            direction: self.direction(),
            busy: self.is_busy(),
            synchronised: self.is_synchronised(),
            target_rpm: self.target_rpm(),
            ramped_rpm: self.ramped_rpm(),
        }
    }

    pub(crate) fn publish_position(&self, current: i64, raw: i64) {
        self.current_step.store(current, Ordering::Relaxed);
        self.raw_step.store(raw, Ordering::Relaxed);
    }

    pub(crate) fn set_target_step(&self, target: i64) {
        self.target_step.store(target, Ordering::Relaxed);
    }

    pub(crate) fn set_direction(&self, direction: Direction) {
        self.forward
            .store(direction == Direction::Forward, Ordering::Relaxed);
    }

    pub(crate) fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::Release);
    }

    /// Claim the motor for a new move; fails if one is in progress.
    pub(crate) fn try_claim(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn shut_down(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub(crate) fn set_synchronised(&self, synchronised: bool) {
        self.synchronised.store(synchronised, Ordering::Relaxed);
    }

    pub(crate) fn set_ramping(&self, enabled: bool) {
        self.ramping.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn set_target_rpm(&self, rpm: Rpm) {
        self.target_rpm.store(rpm.0.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn set_ramped_rpm(&self, rpm: Rpm) {
        self.ramped_rpm.store(rpm.0.to_bits(), Ordering::Relaxed);
    }
}
