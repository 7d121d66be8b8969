//! Slaving transforms and cross-slide engagement.

use tracing::debug;

use crate::config::units::Degrees;
use crate::hal::HardwarePort;
use crate::motion::Direction;
use crate::motor::{StepperMotor, SyncTransform};

/// Slave moves `factor` times the master's movement.
///
/// Used for radius/diameter tracking. Ignores the master's absolute position.
pub fn scale(factor: f64) -> SyncTransform {
    Box::new(move |_position, delta| delta * factor)
}

/// Slave moves `tan(angle)` times the master's movement, cutting a taper
/// with half-angle `angle` against the spindle axis.
pub fn taper(angle: Degrees) -> SyncTransform {
    scale(angle.to_radians().tan())
}

/// Slave `slave` to `master` through `transform`.
///
/// Stops the slave, disables its ramping, then takes up backlash with a
/// one-step nudge in `nudge` (the direction the slave will follow in) so
/// the slack is already consumed when slaving starts. Blocks until the
/// nudge completes.
pub fn engage_cross_slave<M, S>(
    master: &StepperMotor<M>,
    slave: &StepperMotor<S>,
    transform: SyncTransform,
    nudge: Direction,
) where
    M: HardwarePort,
    S: HardwarePort,
{
    slave.synchronise_off();
    slave.stop();
    slave.wait();
    slave.enable_ramping(false);

    let step = slave.current_step() + nudge.sign();
    debug!(slave = slave.name(), step, "taking up backlash before slaving");
    slave.go_to_step(step);
    slave.wait();

    slave.synchronise_on(master, transform);
}
