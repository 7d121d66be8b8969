//! Stepper motor handle.
//!
//! [`StepperMotor`] is the application-side half of a motor: it turns method
//! calls into [`MotorCommand`]s for the control thread and reads published
//! state back from [`MotorStatus`]. Dropping the handle stops and joins the
//! thread.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use tracing::{debug, error};

use crate::config::units::{Rpm, Steps, RPM_EPSILON};
use crate::hal::HardwarePort;
use crate::motion::Direction;

use super::command::{MotorCommand, SyncLink, SyncTransform};
use super::position::Backlash;
use super::state::{MotionState, RampState};
use super::status::{MotorSnapshot, MotorStatus};

/// One stepper-driven axis.
///
/// All commands are non-blocking except [`wait`](Self::wait). Accessors read
/// lock-free state that may lag the hardware by one loop iteration.
pub struct StepperMotor<H: HardwarePort> {
    name: heapless::String<32>,
    port: Arc<H>,
    status: Arc<MotorStatus>,
    commands: Option<Sender<MotorCommand>>,
    thread: Option<JoinHandle<()>>,
    max_rpm: Rpm,
}

impl<H: HardwarePort> StepperMotor<H> {
    pub(crate) fn from_parts(
        name: heapless::String<32>,
        port: Arc<H>,
        status: Arc<MotorStatus>,
        commands: Sender<MotorCommand>,
        thread: JoinHandle<()>,
        max_rpm: Rpm,
    ) -> Self {
        Self {
            name,
            port,
            status,
            commands: Some(commands),
            thread: Some(thread),
            max_rpm,
        }
    }

    /// Get the motor name.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    fn send(&self, command: MotorCommand) {
        if let Some(commands) = &self.commands {
            // The loop only disconnects after the handle drops its sender
            let _ = commands.send(command);
        }
    }

    /// Move to an absolute logical step.
    ///
    /// Ignored while a move is in progress; call [`stop`](Self::stop) and
    /// [`wait`](Self::wait) first.
    pub fn go_to_step(&self, step: i64) {
        if !self.status.try_claim() {
            debug!(motor = %self.name, step, "motor busy, ignoring move");
            return;
        }
        if let Some(direction) = Direction::from_delta(step - self.status.current_step()) {
            self.status.set_direction(direction);
        }
        self.status.set_target_step(step);
        self.send(MotorCommand::GoTo(step));
    }

    /// Move to an absolute position in distance units.
    pub fn go_to_position(&self, position: f64) {
        let step = Steps::from_distance(position, self.status.conversion_factor());
        self.go_to_step(step.value());
    }

    /// Halt within one loop iteration at whatever step the motor is on.
    pub fn stop(&self) {
        self.send(MotorCommand::Stop);
    }

    /// Block until the current move completes.
    ///
    /// Polls with the hardware delay. Never returns while the motor is
    /// slaved to a master that keeps moving.
    pub fn wait(&self) {
        while self.status.is_busy() {
            self.port.delay_us(100);
        }
    }

    /// Make the current position step zero without moving.
    pub fn zero_position(&self) {
        self.send(MotorCommand::ZeroPosition);
    }

    /// Extra pulses inserted on reversal into each direction.
    pub fn set_backlash_compensation(&self, forward_steps: u32, reverse_steps: u32) {
        self.send(MotorCommand::SetBacklash(Backlash::new(forward_steps, reverse_steps)));
    }

    /// Set the commanded speed in motor revolutions per minute.
    ///
    /// Clamped to the configured maximum. Speeds below a small epsilon
    /// (and NaN) stop the motor instead.
    pub fn set_rpm(&self, rpm: f64) {
        if rpm.is_nan() || rpm < RPM_EPSILON {
            debug!(motor = %self.name, rpm, "near-zero speed requested, stopping");
            self.stop();
            return;
        }
        let rpm = Rpm(rpm.min(self.max_rpm.0));
        self.status.set_target_rpm(rpm);
        self.send(MotorCommand::SetSpeed(rpm));
    }

    /// Set the commanded speed in distance units per minute.
    pub fn set_speed(&self, speed: f64) {
        self.set_rpm(speed / self.distance_per_revolution());
    }

    /// Ease speed changes (`true`) or apply them immediately (`false`).
    pub fn enable_ramping(&self, enabled: bool) {
        self.status.set_ramping(enabled);
        self.send(MotorCommand::SetRamping(enabled));
    }

    /// Whether speed ramping is enabled.
    #[inline]
    pub fn is_ramping_enabled(&self) -> bool {
        self.status.is_ramping_enabled()
    }

    /// Follow `master`: each master movement is mapped through `transform`
    /// and added to this motor's target.
    ///
    /// The link does not keep `master` alive. If the master is dropped, the
    /// slave disengages on its next iteration.
    pub fn synchronise_on<M: HardwarePort>(&self, master: &StepperMotor<M>, transform: SyncTransform) {
        debug!(slave = %self.name, master = %master.name, "engaging synchronisation");
        self.send(MotorCommand::SyncOn(SyncLink {
            master: Arc::downgrade(&master.status),
            transform,
        }));
    }

    /// Stop following the master. Motion already queued still completes.
    pub fn synchronise_off(&self) {
        self.send(MotorCommand::SyncOff);
    }

    /// Whether this motor is following another.
    #[inline]
    pub fn is_synchronised(&self) -> bool {
        self.status.is_synchronised()
    }

    /// Whether a move is in progress.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.status.is_busy()
    }

    /// Direction of the last commanded move.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.status.direction()
    }

    /// Backlash-compensated position in steps.
    #[inline]
    pub fn current_step(&self) -> i64 {
        self.status.current_step()
    }

    /// Pulses actually emitted, net of direction.
    #[inline]
    pub fn current_step_without_backlash_compensation(&self) -> i64 {
        self.status.raw_step()
    }

    /// Step the motor is heading for.
    #[inline]
    pub fn target_step(&self) -> i64 {
        self.status.target_step()
    }

    /// Current position in distance units.
    pub fn position(&self) -> f64 {
        self.position_at(self.current_step())
    }

    /// Position of an arbitrary step in distance units.
    pub fn position_at(&self, step: i64) -> f64 {
        Steps(step).to_distance(self.status.conversion_factor())
    }

    /// Commanded speed in distance units per minute.
    pub fn speed(&self) -> f64 {
        self.rpm() * self.distance_per_revolution()
    }

    /// Commanded speed in rpm.
    #[inline]
    pub fn rpm(&self) -> f64 {
        self.status.target_rpm().0
    }

    /// Speed currently being stepped at, in distance units per minute.
    pub fn ramped_speed(&self) -> f64 {
        self.ramped_rpm() * self.distance_per_revolution()
    }

    /// Speed currently being stepped at, in rpm.
    #[inline]
    pub fn ramped_rpm(&self) -> f64 {
        self.status.ramped_rpm().0
    }

    /// Maximum commandable speed in rpm.
    #[inline]
    pub fn max_rpm(&self) -> f64 {
        self.max_rpm.0
    }

    /// Maximum commandable speed in distance units per minute.
    pub fn max_speed(&self) -> f64 {
        self.max_rpm.0 * self.distance_per_revolution()
    }

    /// Distance per step. The sign reflects wiring orientation.
    #[inline]
    pub fn conversion_factor(&self) -> f64 {
        self.status.conversion_factor()
    }

    /// Steps per motor revolution.
    #[inline]
    pub fn steps_per_revolution(&self) -> u32 {
        self.status.steps_per_revolution()
    }

    fn distance_per_revolution(&self) -> f64 {
        self.status.conversion_factor().abs() * self.status.steps_per_revolution() as f64
    }

    /// Copy of all published state.
    pub fn snapshot(&self) -> MotorSnapshot {
        self.status.snapshot()
    }

    /// `Idle` or `Busy`.
    pub fn motion_state(&self) -> MotionState {
        MotionState::from(&self.snapshot())
    }

    /// `Ramping` or `AtTargetSpeed`.
    pub fn ramp_state(&self) -> RampState {
        RampState::from(&self.snapshot())
    }
}

impl<H: HardwarePort> core::fmt::Debug for StepperMotor<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StepperMotor")
            .field("name", &self.name)
            .field("status", &self.status.snapshot())
            .finish_non_exhaustive()
    }
}

impl<H: HardwarePort> Drop for StepperMotor<H> {
    fn drop(&mut self) {
        self.status.shut_down();
        self.commands.take();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!(motor = %self.name, "control thread panicked");
            }
        }
    }
}
