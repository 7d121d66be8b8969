//! Commands sent from a motor handle to its control loop.
//!
//! Every mutation of the loop's state travels through this channel and is
//! applied at the top of a loop iteration, so the loop never needs a lock.

use std::sync::Weak;

use crate::config::units::Rpm;

use super::position::Backlash;
use super::status::MotorStatus;

/// Slave-side transform: `(master_position, master_delta) -> slave_offset`.
///
/// Positions and deltas are in the master's distance units; the returned
/// offset is in the slave's distance units.
pub type SyncTransform = Box<dyn FnMut(f64, f64) -> f64 + Send + 'static>;

/// Non-owning link from a slave to the motor it follows.
pub struct SyncLink {
    /// Master's published status. Upgrading fails once the master is dropped.
    pub(crate) master: Weak<MotorStatus>,
    /// Maps master motion to slave motion.
    pub(crate) transform: SyncTransform,
}

impl core::fmt::Debug for SyncLink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SyncLink")
            .field("master_alive", &(self.master.strong_count() > 0))
            .finish_non_exhaustive()
    }
}

/// A request for the control loop.
#[derive(Debug)]
pub(crate) enum MotorCommand {
    /// Move to an absolute logical step. The handle has already set `busy`.
    GoTo(i64),
    /// Collapse the target onto the current step.
    Stop,
    /// New commanded speed.
    SetSpeed(Rpm),
    /// Enable or disable speed ramping.
    SetRamping(bool),
    /// New backlash budget.
    SetBacklash(Backlash),
    /// Make the current position the origin.
    ZeroPosition,
    /// Start following another motor.
    SyncOn(SyncLink),
    /// Stop following.
    SyncOff,
}
