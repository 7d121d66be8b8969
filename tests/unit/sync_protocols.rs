//! Unit tests for thread cutting and cross-axis slaving.

use std::sync::Arc;
use std::time::Duration;

use leadscrew_motion::encoder::RotaryEncoder;
use leadscrew_motion::hal::sim::{SimulatedPort, SpindleSimulator};
use leadscrew_motion::hal::{HardwarePort, PinId};
use leadscrew_motion::sync::{engage_cross_slave, taper, ThreadingLock, ThreadingStatus};
use leadscrew_motion::{Degrees, Direction, StepperMotor, StepperMotorBuilder};

use super::{phase_from_zero, wait_until};

const A: PinId = PinId(17);
const B: PinId = PinId(27);

/// Carriage with 5 distance units per motor revolution.
fn carriage(port: &Arc<SimulatedPort>) -> StepperMotor<SimulatedPort> {
    StepperMotorBuilder::new()
        .name("z")
        .pins(PinId(5), PinId(6))
        .steps_per_revolution(1000)
        .conversion_factor(0.005)
        .initial_rpm(600.0)
        .build(port.clone())
        .expect("carriage should build")
}

fn cross(port: &Arc<SimulatedPort>, backlash_forward: u32) -> StepperMotor<SimulatedPort> {
    StepperMotorBuilder::new()
        .name("x")
        .pins(PinId(20), PinId(21))
        .steps_per_revolution(1000)
        .conversion_factor(0.01)
        .ramping(false)
        .initial_rpm(600.0)
        .backlash(backlash_forward, 0)
        .build(port.clone())
        .expect("cross-slide should build")
}

fn spindle(port: &Arc<SimulatedPort>, rpm: f64) -> (RotaryEncoder<SimulatedPort>, SpindleSimulator) {
    let encoder = RotaryEncoder::new(port.clone(), A, B, 100.0).expect("encoder should register");
    let simulator = SpindleSimulator::start(port.clone(), A, B, 100, rpm);
    (encoder, simulator)
}

// =============================================================================
// Thread-cutting speed lock
// =============================================================================

#[test]
fn test_disengaged_lock_leaves_motor_alone() {
    let port = Arc::new(SimulatedPort::new());
    let z = carriage(&port);
    let (encoder, _sim) = spindle(&port, 600.0);
    let mut lock = ThreadingLock::new(1.0, 1000.0);

    assert_eq!(lock.update(&z, &encoder), ThreadingStatus::Disengaged);
    assert_eq!(z.rpm(), 600.0);
}

#[test]
fn test_engage_disables_and_restores_ramping() {
    let port = Arc::new(SimulatedPort::new());
    let z = carriage(&port);
    let mut lock = ThreadingLock::new(1.0, 1000.0);
    assert!(z.is_ramping_enabled());

    lock.engage(&z);
    assert!(lock.is_engaged());
    assert!(!z.is_ramping_enabled());

    lock.disengage(&z);
    assert!(!lock.is_engaged());
    assert!(z.is_ramping_enabled());
}

#[test]
fn test_lock_waits_for_spindle() {
    let port = Arc::new(SimulatedPort::new());
    let z = carriage(&port);
    let encoder = RotaryEncoder::new(port.clone(), A, B, 100.0).unwrap();
    let mut lock = ThreadingLock::new(1.0, 1000.0);

    lock.engage(&z);
    assert_eq!(lock.update(&z, &encoder), ThreadingStatus::SpindleNotReady);
    assert!(!lock.start_pass(&z, &encoder, 1.0));
    assert_eq!(z.target_step(), 0);
}

#[test]
fn test_speed_follows_spindle() {
    let port = Arc::new(SimulatedPort::new());
    let z = carriage(&port);
    let (encoder, _sim) = spindle(&port, 600.0);
    let mut lock = ThreadingLock::new(1.0, 1000.0);
    lock.engage(&z);

    assert!(wait_until(Duration::from_secs(2), || !encoder.is_warming_up()));
    match lock.update(&z, &encoder) {
        ThreadingStatus::Locked { speed } => {
            // 1 unit pitch × ~600 rpm
            assert!((speed - 600.0).abs() < 90.0, "speed {}", speed);
            assert!((z.speed() - speed).abs() < 1e-6);
            assert!((z.rpm() - speed / 5.0).abs() < 1e-6);
        }
        other => panic!("expected lock, got {:?}", other),
    }
}

#[test]
fn test_over_speed_halts_carriage() {
    let port = Arc::new(SimulatedPort::new());
    let z = carriage(&port);
    let (encoder, _sim) = spindle(&port, 600.0);
    let mut lock = ThreadingLock::new(2.0, 100.0);
    lock.engage(&z);
    assert!(wait_until(Duration::from_secs(2), || !encoder.is_warming_up()));

    z.go_to_step(1_000_000);
    assert!(z.is_running());

    match lock.update(&z, &encoder) {
        ThreadingStatus::OverSpeed { requested, max } => {
            assert!(requested > 1000.0);
            assert_eq!(max, 100.0);
        }
        other => panic!("expected over-speed, got {:?}", other),
    }
    z.wait();
    assert!(!z.is_running());
    assert!(z.current_step() < 1_000_000);
}

#[test]
fn test_pass_starts_at_phase_and_refuses_while_busy() {
    let port = Arc::new(SimulatedPort::new());
    let z = carriage(&port);
    let (encoder, _sim) = spindle(&port, 600.0);
    let mut lock = ThreadingLock::new(0.5, 1000.0);
    lock.engage(&z);
    assert!(wait_until(Duration::from_secs(2), || !encoder.is_warming_up()));
    assert!(matches!(lock.update(&z, &encoder), ThreadingStatus::Locked { .. }));

    assert!(lock.start_pass(&z, &encoder, 10.0));
    let started = port.ticks();
    assert_eq!(z.target_step(), 2000);
    assert!(z.is_running());
    let phase = phase_from_zero(started, &encoder.snapshot());
    assert!(phase.abs() < 0.1, "pass started at phase {}", phase);

    assert!(!lock.start_pass(&z, &encoder, 20.0));

    z.stop();
    z.wait();
}

#[test]
fn test_stopped_spindle_releases_carriage() {
    let port = Arc::new(SimulatedPort::new());
    let z = carriage(&port);
    let (encoder, sim) = spindle(&port, 600.0);
    let mut lock = ThreadingLock::new(1.0, 1000.0);
    lock.engage(&z);
    assert!(wait_until(Duration::from_secs(2), || !encoder.is_warming_up()));
    assert!(matches!(lock.update(&z, &encoder), ThreadingStatus::Locked { .. }));

    z.go_to_step(1_000_000);
    sim.set_rpm(0.0);

    assert!(
        wait_until(Duration::from_secs(1), || {
            lock.update(&z, &encoder) == ThreadingStatus::SpindleNotReady
        }),
        "carriage still locked to a stopped spindle"
    );
    assert_eq!(encoder.rpm(), 0.0);
    assert!(!encoder.is_turning());

    z.wait();
    assert!(z.current_step() < 1_000_000);
    assert!(!lock.start_pass(&z, &encoder, 1.0));
    assert_eq!(z.target_step(), z.current_step());
}

// =============================================================================
// Cross-axis slaving
// =============================================================================

#[test]
fn test_engage_takes_up_backlash_with_nudge() {
    let port = Arc::new(SimulatedPort::new());
    let z = carriage(&port);
    let x = cross(&port, 3);

    engage_cross_slave(&z, &x, taper(Degrees(45.0)), Direction::Forward);

    assert_eq!(x.current_step(), 1);
    assert_eq!(x.current_step_without_backlash_compensation(), 4);
    assert!(!x.is_ramping_enabled());
    assert!(wait_until(Duration::from_secs(1), || x.is_synchronised()));
}

#[test]
fn test_taper_slaving_tracks_carriage() {
    let port = Arc::new(SimulatedPort::new());
    let z = carriage(&port);
    let x = cross(&port, 0);

    engage_cross_slave(&z, &x, taper(Degrees(45.0)), Direction::Forward);
    assert!(wait_until(Duration::from_secs(1), || x.is_synchronised()));
    let start = x.position();

    z.enable_ramping(false);
    z.go_to_position(2.0);
    z.wait();

    assert!(
        wait_until(Duration::from_secs(2), || (x.position() - start - 2.0).abs() < 0.02),
        "cross-slide at {}",
        x.position()
    );
}
