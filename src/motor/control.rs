//! Per-motor control loop.
//!
//! Each motor runs this loop on a dedicated thread. One iteration:
//!
//! 1. snapshot the tick counter,
//! 2. apply queued commands and fold in master motion when slaved,
//! 3. emit at most one pulse (STEP high for one delay, then low),
//! 4. ease the working speed toward the commanded speed,
//! 5. spin on the tick counter until two delays have passed since step 1.
//!
//! A moving motor busy-waits in step 5 and keeps a core occupied. An idle
//! motor blocks on its command channel instead.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use embedded_hal::digital::OutputPin;
use tracing::{debug, error, trace, warn};

use crate::config::units::StepDelay;
use crate::hal::{spin_until, write_level, HardwarePort, Level};
use crate::motion::{Direction, SpeedRamp};

use super::command::{MotorCommand, SyncLink};
use super::position::StepCounter;
use super::status::MotorStatus;

/// How long an idle, unslaved motor blocks waiting for a command.
const IDLE_POLL: Duration = Duration::from_millis(1);

/// How long an idle slave waits before sampling its master again.
const SLAVE_POLL: Duration = Duration::from_micros(200);

struct SyncState {
    link: SyncLink,
    last_master_step: i64,
    /// Fractional slave steps not yet added to the target.
    residual: f64,
}

/// State owned by a motor's control thread.
pub(crate) struct ControlLoop<H: HardwarePort> {
    name: heapless::String<32>,
    port: Arc<H>,
    step_pin: H::Pin,
    dir_pin: H::Pin,
    /// ENABLE pin and the level that disables the driver.
    enable: Option<(H::Pin, Level)>,
    status: Arc<MotorStatus>,
    commands: Receiver<MotorCommand>,
    counter: StepCounter,
    target: i64,
    moving: bool,
    written_direction: Option<Direction>,
    ramp: SpeedRamp,
    sync: Option<SyncState>,
    pin_fault: bool,
}

/// Hardware resources handed to a new control loop.
pub(crate) struct LoopPins<P> {
    pub step: P,
    pub dir: P,
    pub enable: Option<(P, Level)>,
}

impl<H: HardwarePort> ControlLoop<H> {
    pub(crate) fn new(
        name: heapless::String<32>,
        port: Arc<H>,
        pins: LoopPins<H::Pin>,
        status: Arc<MotorStatus>,
        commands: Receiver<MotorCommand>,
        counter: StepCounter,
        ramp: SpeedRamp,
    ) -> Self {
        Self {
            name,
            port,
            step_pin: pins.step,
            dir_pin: pins.dir,
            enable: pins.enable,
            status,
            commands,
            counter,
            target: 0,
            moving: false,
            written_direction: None,
            ramp,
            sync: None,
            pin_fault: false,
        }
    }

    /// Run until the owning handle shuts the loop down.
    pub(crate) fn run(mut self) {
        debug!(motor = %self.name, "control loop started");

        while self.status.is_running() {
            let start = self.port.ticks();

            if !self.drain_commands() {
                break;
            }
            self.follow_master();

            if !self.moving {
                self.ramp.rest();
                self.status.set_ramped_rpm(self.ramp.current());
                if !self.wait_for_command() {
                    break;
                }
                continue;
            }

            let Some(delay) = StepDelay::from_rpm(self.status.steps_per_revolution(), self.ramp.current())
            else {
                debug!(motor = %self.name, "speed below stepping threshold, halting");
                self.halt();
                continue;
            };

            self.step_toward_target(delay);

            let period = delay.period_micros();
            let ramped = self.ramp.advance(period);
            self.status.set_ramped_rpm(ramped);

            spin_until(&*self.port, start, period);
        }

        self.release_enable();
        debug!(motor = %self.name, "control loop exited");
    }

    /// Apply every queued command. Returns `false` once the handle is gone.
    fn drain_commands(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.apply(command),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// Block briefly for the next command while idle.
    fn wait_for_command(&mut self) -> bool {
        let timeout = if self.sync.is_some() {
            SLAVE_POLL
        } else {
            IDLE_POLL
        };
        match self.commands.recv_timeout(timeout) {
            Ok(command) => {
                self.apply(command);
                true
            }
            Err(RecvTimeoutError::Timeout) => true,
            Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    fn apply(&mut self, command: MotorCommand) {
        trace!(motor = %self.name, ?command, "applying command");
        match command {
            MotorCommand::GoTo(step) => {
                self.target = step;
                self.status.set_target_step(step);
                match Direction::from_delta(step - self.counter.logical()) {
                    Some(direction) => {
                        self.status.set_direction(direction);
                        self.moving = true;
                        self.status.set_busy(true);
                    }
                    None => self.finish_move(),
                }
            }
            MotorCommand::Stop => self.halt(),
            MotorCommand::SetSpeed(rpm) => {
                self.ramp.set_target(rpm);
                self.status.set_ramped_rpm(self.ramp.current());
            }
            MotorCommand::SetRamping(enabled) => {
                self.ramp.set_enabled(enabled);
                self.status.set_ramped_rpm(self.ramp.current());
            }
            MotorCommand::SetBacklash(backlash) => self.counter.set_backlash(backlash),
            MotorCommand::ZeroPosition => {
                let shift = self.counter.logical();
                self.counter.zero();
                self.target -= shift;
                self.status.set_target_step(self.target);
                self.status
                    .publish_position(self.counter.logical(), self.counter.raw());
            }
            MotorCommand::SyncOn(link) => match link.master.upgrade() {
                Some(master) => {
                    self.sync = Some(SyncState {
                        last_master_step: master.current_step(),
                        link,
                        residual: 0.0,
                    });
                    self.status.set_synchronised(true);
                }
                None => warn!(motor = %self.name, "master motor already dropped, not synchronising"),
            },
            MotorCommand::SyncOff => {
                self.sync = None;
                self.status.set_synchronised(false);
            }
        }
    }

    /// Fold master motion since the last sample into the target.
    fn follow_master(&mut self) {
        let Some(sync) = self.sync.as_mut() else {
            return;
        };
        let Some(master) = sync.link.master.upgrade() else {
            warn!(motor = %self.name, "master motor dropped, disengaging synchronisation");
            self.sync = None;
            self.status.set_synchronised(false);
            return;
        };

        // May lag the master by one of its iterations
        let master_step = master.current_step();
        let delta_steps = master_step - sync.last_master_step;
        if delta_steps == 0 {
            return;
        }
        sync.last_master_step = master_step;

        let factor = master.conversion_factor();
        let offset = (sync.link.transform)(master_step as f64 * factor, delta_steps as f64 * factor);
        let steps = offset / self.status.conversion_factor() + sync.residual;
        let whole = steps.trunc();
        sync.residual = steps - whole;

        if whole != 0.0 {
            self.target += whole as i64;
            self.status.set_target_step(self.target);
            if let Some(direction) = Direction::from_delta(self.target - self.counter.logical()) {
                self.status.set_direction(direction);
                if !self.moving {
                    self.moving = true;
                    self.status.set_busy(true);
                }
            }
        }
    }

    fn step_toward_target(&mut self, delay: StepDelay) {
        let Some(direction) = Direction::from_delta(self.target - self.counter.logical()) else {
            self.finish_move();
            return;
        };

        self.write_direction(direction);
        self.emit_pulse(delay);
        self.counter.pulse(direction);
        self.status
            .publish_position(self.counter.logical(), self.counter.raw());

        if self.counter.logical() == self.target {
            self.finish_move();
        }
    }

    /// Set DIR, writing the pin only when the direction changes.
    fn write_direction(&mut self, direction: Direction) {
        if self.written_direction == Some(direction) {
            return;
        }
        if write_level(&mut self.dir_pin, direction.pin_level()).is_err() {
            self.note_pin_fault("DIR");
        }
        self.written_direction = Some(direction);
    }

    fn emit_pulse(&mut self, delay: StepDelay) {
        if self.step_pin.set_high().is_err() {
            self.note_pin_fault("STEP");
        }
        self.port.delay_us(delay.as_micros());
        if self.step_pin.set_low().is_err() {
            self.note_pin_fault("STEP");
        }
    }

    /// Collapse the target onto the current step.
    fn halt(&mut self) {
        self.target = self.counter.logical();
        self.status.set_target_step(self.target);
        self.finish_move();
    }

    fn finish_move(&mut self) {
        self.moving = false;
        self.status.set_busy(false);
    }

    fn release_enable(&mut self) {
        if let Some((pin, disabled)) = self.enable.as_mut() {
            if write_level(pin, *disabled).is_err() {
                warn!(motor = %self.name, "failed to release ENABLE pin");
            }
        }
    }

    fn note_pin_fault(&mut self, pin: &str) {
        if !self.pin_fault {
            error!(motor = %self.name, pin, "GPIO write failed; further failures suppressed");
            self.pin_fault = true;
        }
    }
}
