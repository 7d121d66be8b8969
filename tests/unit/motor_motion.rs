//! Unit tests for stepper motor behaviour.
//!
//! Motors run on their real control threads against [`SimulatedPort`], so
//! these tests take wall-clock time. Speeds are chosen to keep each move
//! well under a second.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use embedded_hal_mock::eh1::digital::{Mock as PinMock, State as PinState, Transaction as PinTransaction};
use parking_lot::Mutex;

use leadscrew_motion::hal::sim::SimulatedPort;
use leadscrew_motion::hal::{EdgeHandler, HardwarePort, PinId, Tick};
use leadscrew_motion::motor::{MotionState, RampState, StateName};
use leadscrew_motion::sync::scale;
use leadscrew_motion::{Direction, HardwareError, StepperMotor, StepperMotorBuilder};

use super::wait_until;

const STEP: PinId = PinId(5);
const DIR: PinId = PinId(6);

fn motor(port: &Arc<SimulatedPort>) -> StepperMotor<SimulatedPort> {
    StepperMotorBuilder::new()
        .name("test")
        .pins(STEP, DIR)
        .steps_per_revolution(1000)
        .conversion_factor(0.01)
        .ramping(false)
        .initial_rpm(600.0)
        .build(port.clone())
        .expect("motor should build")
}

// =============================================================================
// Positioning
// =============================================================================

#[test]
fn test_go_to_step_reaches_target() {
    let port = Arc::new(SimulatedPort::new());
    let m = motor(&port);

    m.go_to_step(500);
    assert!(m.is_running());
    assert_eq!(m.target_step(), 500);
    m.wait();

    assert_eq!(m.current_step(), 500);
    assert_eq!(m.current_step_without_backlash_compensation(), 500);
    assert_eq!(port.rising_edges(STEP), 500);
    assert!(!m.is_running());
    assert_eq!(m.direction(), Direction::Forward);
}

#[test]
fn test_go_to_negative_step() {
    let port = Arc::new(SimulatedPort::new());
    let m = motor(&port);

    m.go_to_step(-250);
    assert_eq!(m.direction(), Direction::Reverse);
    m.wait();

    assert_eq!(m.current_step(), -250);
    assert!((m.position() + 2.5).abs() < 1e-9);
}

#[test]
fn test_go_to_current_step_is_immediate() {
    let port = Arc::new(SimulatedPort::new());
    let m = motor(&port);

    m.go_to_step(0);
    m.wait();
    assert_eq!(port.rising_edges(STEP), 0);
}

#[test]
fn test_second_go_to_while_busy_is_ignored() {
    let port = Arc::new(SimulatedPort::new());
    let m = motor(&port);

    m.go_to_step(1000);
    m.go_to_step(2000);
    assert_eq!(m.target_step(), 1000);
    m.wait();

    assert_eq!(m.current_step(), 1000);
}

#[test]
fn test_stop_mid_motion() {
    let port = Arc::new(SimulatedPort::new());
    let m = motor(&port);
    m.set_rpm(60.0);

    m.go_to_step(100_000);
    std::thread::sleep(Duration::from_millis(50));
    m.stop();
    m.wait();

    assert!(!m.is_running());
    let step = m.current_step();
    assert!(step > 0 && step < 100_000, "stopped at {}", step);
    assert_eq!(m.target_step(), step);
}

#[test]
fn test_go_to_position_uses_conversion_factor() {
    let port = Arc::new(SimulatedPort::new());
    let m = StepperMotorBuilder::new()
        .pins(STEP, DIR)
        .steps_per_revolution(1000)
        .conversion_factor(-0.005)
        .ramping(false)
        .initial_rpm(600.0)
        .build(port.clone())
        .unwrap();

    m.go_to_position(1.0);
    m.wait();

    assert_eq!(m.current_step(), -200);
    assert!((m.position() - 1.0).abs() < 1e-9);
    assert!((m.position_at(400) + 2.0).abs() < 1e-9);
}

#[test]
fn test_zero_position() {
    let port = Arc::new(SimulatedPort::new());
    let m = motor(&port);

    m.go_to_step(50);
    m.wait();
    m.zero_position();
    assert!(wait_until(Duration::from_secs(1), || m.current_step() == 0));
    assert_eq!(m.target_step(), 0);

    m.go_to_step(10);
    m.wait();
    assert_eq!(m.current_step(), 10);
    assert_eq!(port.rising_edges(STEP), 60);
}

// =============================================================================
// Backlash
// =============================================================================

#[test]
fn test_backlash_scenario() {
    let port = Arc::new(SimulatedPort::new());
    let m = motor(&port);
    m.set_backlash_compensation(10, 0);

    m.go_to_step(1);
    m.wait();
    assert_eq!(m.current_step(), 1);
    assert_eq!(m.current_step_without_backlash_compensation(), 11);

    m.go_to_step(2);
    m.wait();
    assert_eq!(m.current_step(), 2);
    assert_eq!(m.current_step_without_backlash_compensation(), 12);

    m.go_to_step(1);
    m.wait();
    assert_eq!(m.current_step(), 1);
    assert_eq!(m.current_step_without_backlash_compensation(), 1);

    // 11 + 1 + 11 pulses
    assert_eq!(port.rising_edges(STEP), 23);
}

#[test]
fn test_backlash_from_builder() {
    let port = Arc::new(SimulatedPort::new());
    let m = StepperMotorBuilder::new()
        .pins(STEP, DIR)
        .steps_per_revolution(1000)
        .conversion_factor(0.01)
        .ramping(false)
        .initial_rpm(600.0)
        .backlash(0, 4)
        .build(port.clone())
        .unwrap();

    m.go_to_step(-2);
    m.wait();
    assert_eq!(m.current_step_without_backlash_compensation(), -6);
}

// =============================================================================
// Speed
// =============================================================================

#[test]
fn test_set_rpm_and_speed_units() {
    let port = Arc::new(SimulatedPort::new());
    let m = StepperMotorBuilder::new()
        .pins(STEP, DIR)
        .steps_per_revolution(1000)
        .conversion_factor(0.005)
        .ramping(false)
        .build(port)
        .unwrap();

    // 1000 steps × 0.005 = 5 distance units per revolution
    m.set_speed(600.0);
    assert!((m.rpm() - 120.0).abs() < 1e-9);
    assert!((m.speed() - 600.0).abs() < 1e-9);

    m.set_rpm(30.0);
    assert!((m.speed() - 150.0).abs() < 1e-9);
}

#[test]
fn test_set_rpm_clamped_to_max() {
    let port = Arc::new(SimulatedPort::new());
    let m = StepperMotorBuilder::new()
        .pins(STEP, DIR)
        .steps_per_revolution(1000)
        .conversion_factor(0.01)
        .max_rpm(100.0)
        .build(port)
        .unwrap();

    m.set_rpm(500.0);
    assert_eq!(m.rpm(), 100.0);
    assert!((m.max_speed() - 1000.0).abs() < 1e-9);
}

#[test]
fn test_near_zero_rpm_stops() {
    let port = Arc::new(SimulatedPort::new());
    let m = motor(&port);
    m.set_rpm(60.0);

    m.go_to_step(100_000);
    std::thread::sleep(Duration::from_millis(20));
    m.set_rpm(0.0);
    m.wait();

    assert!(m.current_step() < 100_000);
    // Commanded speed is unchanged; zero is a stop request
    assert_eq!(m.rpm(), 60.0);
}

#[test]
fn test_ramped_speed_increases() {
    let port = Arc::new(SimulatedPort::new());
    let m = StepperMotorBuilder::new()
        .pins(STEP, DIR)
        .steps_per_revolution(1000)
        .conversion_factor(0.01)
        .ramp_rate(2000.0)
        .ramp_start_rpm(10.0)
        .build(port)
        .unwrap();
    assert!(m.is_ramping_enabled());

    m.set_rpm(1000.0);
    m.go_to_step(1_000_000);
    std::thread::sleep(Duration::from_millis(5));

    let mut samples = Vec::new();
    for _ in 0..5 {
        samples.push(m.ramped_rpm());
        std::thread::sleep(Duration::from_millis(15));
    }
    m.stop();
    m.wait();

    for pair in samples.windows(2) {
        assert!(pair[1] > pair[0], "samples not increasing: {:?}", samples);
    }
    assert!(samples.iter().all(|&s| s < 1000.0), "samples: {:?}", samples);
}

#[test]
fn test_disabled_ramping_snaps() {
    let port = Arc::new(SimulatedPort::new());
    let m = StepperMotorBuilder::new()
        .pins(STEP, DIR)
        .steps_per_revolution(1000)
        .conversion_factor(0.01)
        .ramp_rate(10.0)
        .build(port)
        .unwrap();

    m.enable_ramping(false);
    assert!(!m.is_ramping_enabled());
    m.set_rpm(300.0);
    assert!(wait_until(Duration::from_secs(1), || m.ramped_rpm() == 300.0));
    assert_eq!(m.ramp_state(), RampState::AtTargetSpeed);
}

#[test]
fn test_state_views() {
    let port = Arc::new(SimulatedPort::new());
    let m = motor(&port);
    assert_eq!(m.motion_state(), MotionState::Idle);
    assert_eq!(m.motion_state().name(), "Idle");

    m.set_rpm(60.0);
    m.go_to_step(10_000);
    assert_eq!(m.motion_state(), MotionState::Busy);
    let snapshot = m.snapshot();
    assert!(snapshot.busy);
    assert_eq!(snapshot.target_step, 10_000);
    m.stop();
    m.wait();
    assert_eq!(m.motion_state(), MotionState::Idle);
}

// =============================================================================
// Slaving
// =============================================================================

#[test]
fn test_slave_follows_master_with_scale() {
    let port = Arc::new(SimulatedPort::new());
    let master = motor(&port);
    let slave = StepperMotorBuilder::new()
        .name("slave")
        .pins(PinId(20), PinId(21))
        .steps_per_revolution(1000)
        .conversion_factor(0.01)
        .ramping(false)
        .initial_rpm(600.0)
        .build(port.clone())
        .unwrap();

    slave.synchronise_on(&master, scale(0.5));
    assert!(wait_until(Duration::from_secs(1), || slave.is_synchronised()));

    master.go_to_position(4.0);
    master.wait();
    assert_eq!(master.current_step(), 400);

    assert!(
        wait_until(Duration::from_secs(2), || (slave.position() - 2.0).abs() < 0.02),
        "slave at {}",
        slave.position()
    );

    slave.synchronise_off();
    assert!(wait_until(Duration::from_secs(1), || !slave.is_synchronised()));
}

#[test]
fn test_slave_disengages_when_master_dropped() {
    let port = Arc::new(SimulatedPort::new());
    let master = motor(&port);
    let slave = StepperMotorBuilder::new()
        .pins(PinId(20), PinId(21))
        .steps_per_revolution(1000)
        .conversion_factor(0.01)
        .build(port.clone())
        .unwrap();

    slave.synchronise_on(&master, scale(1.0));
    assert!(wait_until(Duration::from_secs(1), || slave.is_synchronised()));

    drop(master);
    assert!(wait_until(Duration::from_secs(1), || !slave.is_synchronised()));
}

// =============================================================================
// Pin-level behaviour (embedded-hal-mock)
// =============================================================================

/// Port handing out pre-programmed mock pins.
struct MockPort {
    epoch: Instant,
    pins: Mutex<HashMap<PinId, PinMock>>,
}

impl MockPort {
    fn new(pins: impl IntoIterator<Item = (PinId, PinMock)>) -> Self {
        Self {
            epoch: Instant::now(),
            pins: Mutex::new(pins.into_iter().collect()),
        }
    }
}

impl HardwarePort for MockPort {
    type Pin = PinMock;

    fn output_pin(&self, pin: PinId) -> Result<Self::Pin, HardwareError> {
        self.pins
            .lock()
            .remove(&pin)
            .ok_or(HardwareError::PinUnavailable(pin))
    }

    fn ticks(&self) -> Tick {
        Tick(self.epoch.elapsed().as_micros() as u32)
    }

    fn delay_us(&self, us: u32) {
        std::thread::sleep(Duration::from_micros(us as u64));
    }

    fn register_edge_callback(
        &self,
        pin_a: PinId,
        pin_b: PinId,
        _handler: EdgeHandler,
    ) -> Result<(), HardwareError> {
        Err(HardwareError::CallbackRegistration { pin_a, pin_b })
    }

    fn unregister_edge_callback(&self, _pin_a: PinId, _pin_b: PinId) {}
}

#[test]
fn test_direction_pin_written_only_on_change() {
    let mut step_expectations = vec![PinTransaction::set(PinState::Low)];
    for _ in 0..5 {
        step_expectations.push(PinTransaction::set(PinState::High));
        step_expectations.push(PinTransaction::set(PinState::Low));
    }
    let dir_expectations = [
        PinTransaction::set(PinState::High),
        PinTransaction::set(PinState::Low),
    ];

    let step = PinMock::new(&step_expectations);
    let dir = PinMock::new(&dir_expectations);
    let port = Arc::new(MockPort::new([(STEP, step.clone()), (DIR, dir.clone())]));

    let m = StepperMotorBuilder::new()
        .pins(STEP, DIR)
        .steps_per_revolution(1000)
        .conversion_factor(0.01)
        .ramping(false)
        .initial_rpm(600.0)
        .build(port)
        .unwrap();

    m.go_to_step(3);
    m.wait();
    m.go_to_step(1);
    m.wait();
    drop(m);

    let mut step = step;
    let mut dir = dir;
    step.done();
    dir.done();
}

#[test]
fn test_unavailable_pin_fails_construction() {
    let port = Arc::new(MockPort::new([]));
    let result = StepperMotorBuilder::new()
        .pins(STEP, DIR)
        .steps_per_revolution(1000)
        .conversion_factor(0.01)
        .build(port);
    assert!(result.is_err());
}
