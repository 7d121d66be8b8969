//! Motor state machine views.
//!
//! A motor is `Idle` or `Busy`; orthogonally its working speed is either
//! still `Ramping` or `AtTargetSpeed`.

use super::status::MotorSnapshot;

/// Motion state of a motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    /// Standing at its target step.
    Idle,
    /// Moving toward its target step.
    Busy,
}

/// Speed state of a motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampState {
    /// Working speed still approaching the commanded speed.
    Ramping,
    /// Working speed equals the commanded speed.
    AtTargetSpeed,
}

/// State name for display/debugging.
pub trait StateName {
    /// Get the state name as a static string.
    fn name(&self) -> &'static str;
}

impl StateName for MotionState {
    fn name(&self) -> &'static str {
        match self {
            MotionState::Idle => "Idle",
            MotionState::Busy => "Busy",
        }
    }
}

impl StateName for RampState {
    fn name(&self) -> &'static str {
        match self {
            RampState::Ramping => "Ramping",
            RampState::AtTargetSpeed => "AtTargetSpeed",
        }
    }
}

impl From<&MotorSnapshot> for MotionState {
    fn from(snapshot: &MotorSnapshot) -> Self {
        if snapshot.busy {
            MotionState::Busy
        } else {
            MotionState::Idle
        }
    }
}

impl From<&MotorSnapshot> for RampState {
    fn from(snapshot: &MotorSnapshot) -> Self {
        if snapshot.ramped_rpm == snapshot.target_rpm {
            RampState::AtTargetSpeed
        } else {
            RampState::Ramping
        }
    }
}
