//! Unit tests for the spindle rotary encoder.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use leadscrew_motion::encoder::RotaryEncoder;
use leadscrew_motion::hal::sim::{SimulatedPort, SpindleSimulator};
use leadscrew_motion::hal::{HardwarePort, Level, PinId, Tick};
use leadscrew_motion::{Direction, SpindleConfig};

use super::wait_until;

const A: PinId = PinId(17);
const B: PinId = PinId(27);

/// Spindle at 600 rpm with 100 pulses: 1 ms per pulse, 100 ms per revolution.
fn spinning(port: &Arc<SimulatedPort>, rpm: f64) -> (RotaryEncoder<SimulatedPort>, SpindleSimulator) {
    let encoder = RotaryEncoder::new(port.clone(), A, B, 100.0).expect("encoder should register");
    let spindle = SpindleSimulator::start(port.clone(), A, B, 100, rpm);
    (encoder, spindle)
}

#[test]
fn test_warming_up_without_edges() {
    let port = Arc::new(SimulatedPort::new());
    let encoder = RotaryEncoder::new(port, A, B, 100.0).unwrap();

    assert!(encoder.is_warming_up());
    assert_eq!(encoder.rpm(), 0.0);

    let calls = AtomicUsize::new(0);
    let result = encoder.callback_at_zero_degrees(|| calls.fetch_add(1, Ordering::SeqCst));
    assert!(result.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_rpm_from_simulated_spindle() {
    let port = Arc::new(SimulatedPort::new());
    let (encoder, _spindle) = spinning(&port, 600.0);

    assert!(wait_until(Duration::from_secs(2), || !encoder.is_warming_up()));
    // Let a second revolution complete
    std::thread::sleep(Duration::from_millis(150));

    let rpm = encoder.rpm();
    assert!((rpm - 600.0).abs() < 90.0, "rpm {}", rpm);
    assert_eq!(encoder.rotation_direction(), Direction::Forward);
    let degrees = encoder.position_degrees();
    assert!((0.0..360.0).contains(&degrees));
}

#[test]
fn test_reverse_rotation() {
    let port = Arc::new(SimulatedPort::new());
    let (encoder, _spindle) = spinning(&port, -600.0);

    assert!(wait_until(Duration::from_secs(2), || !encoder.is_warming_up()));
    assert_eq!(encoder.rotation_direction(), Direction::Reverse);
    assert!(encoder.rpm() > 0.0);
}

#[test]
fn test_callback_invoked_once_near_zero_phase() {
    let port = Arc::new(SimulatedPort::new());
    let (encoder, _spindle) = spinning(&port, 600.0);
    assert!(wait_until(Duration::from_secs(2), || !encoder.is_warming_up()));

    let calls = AtomicUsize::new(0);
    let fired = encoder.callback_at_zero_degrees(|| {
        calls.fetch_add(1, Ordering::SeqCst);
        port.ticks()
    });
    let fired = fired.expect("phase lock should run after warm-up");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let snapshot = encoder.snapshot();
    let period = snapshot.revolution_period_us();
    let phase = fired.signed_since(snapshot.last_zero_tick) as f64;
    let phase = phase.rem_euclid(period) / period;
    assert!(phase < 0.1 || phase > 0.9, "fired at phase {}", phase);
}

#[test]
fn test_advance_fires_early() {
    let port = Arc::new(SimulatedPort::new());
    let (encoder, _spindle) = spinning(&port, 600.0);
    assert!(wait_until(Duration::from_secs(2), || !encoder.is_warming_up()));

    encoder.set_advance_value_us(20_000.0);
    assert_eq!(encoder.advance_value_us(), 20_000.0);

    let fired = encoder.callback_at_zero_degrees(|| port.ticks()).unwrap();
    let snapshot = encoder.snapshot();
    let period = snapshot.revolution_period_us();
    let phase = (fired.signed_since(snapshot.last_zero_tick) as f64).rem_euclid(period) / period;
    assert!((phase - 0.8).abs() < 0.1, "fired at phase {}", phase);
}

#[test]
fn test_stopped_spindle_reads_zero() {
    let port = Arc::new(SimulatedPort::new());
    let (encoder, spindle) = spinning(&port, 600.0);
    assert!(wait_until(Duration::from_secs(2), || encoder.is_turning()));
    assert!(encoder.rpm() > 0.0);

    spindle.set_rpm(0.0);
    assert!(wait_until(Duration::from_secs(1), || encoder.rpm() == 0.0));
    assert!(!encoder.is_turning());
    assert!(!encoder.is_warming_up());
    assert!(encoder.callback_at_zero_degrees(|| ()).is_none());

    // Turning again resumes without a new warm-up
    spindle.set_rpm(600.0);
    assert!(wait_until(Duration::from_secs(1), || encoder.is_turning()));
}

#[test]
fn test_tick_counter_wrap() {
    // Wraps about 50 ms after start, inside the first revolution
    let port = Arc::new(SimulatedPort::with_tick_offset(u32::MAX - 50_000));
    let (encoder, _spindle) = spinning(&port, 600.0);

    assert!(wait_until(Duration::from_secs(2), || !encoder.is_warming_up()));
    std::thread::sleep(Duration::from_millis(150));
    let rpm = encoder.rpm();
    assert!((rpm - 600.0).abs() < 90.0, "rpm {}", rpm);
    assert!(encoder.callback_at_zero_degrees(|| ()).is_some());
}

#[test]
fn test_manual_edges_and_geared_config() {
    let port = Arc::new(SimulatedPort::new());
    let config = SpindleConfig {
        pin_a: A,
        pin_b: B,
        pulses_per_revolution: 1.0,
        gear_ratio: 2.0,
        advance_us: 125.0,
    };
    let encoder = RotaryEncoder::from_config(&config, port.clone()).unwrap();
    assert_eq!(encoder.advance_value_us(), 125.0);
    assert_eq!(encoder.pulses_per_revolution(), 2.0);

    // Three forward cycles, 10 ms apart
    for i in 0..3u32 {
        let t = 1_000 + i * 10_000;
        assert!(port.emit_edge_at(B, Level::High, Tick(t)));
        port.emit_edge_at(A, Level::High, Tick(t + 2_500));
        port.emit_edge_at(B, Level::Low, Tick(t + 5_000));
        port.emit_edge_at(A, Level::Low, Tick(t + 7_500));
    }

    // 2 pulses × 10 ms = 20 ms per revolution
    assert!(!encoder.is_warming_up());
    assert!((encoder.snapshot().rpm() - 3000.0).abs() < 1e-6);
    assert_eq!(encoder.snapshot().revolutions, 1);
}

#[test]
fn test_callback_registration_failure() {
    let port = Arc::new(SimulatedPort::unavailable());
    assert!(RotaryEncoder::new(port, A, B, 100.0).is_err());
}

#[test]
fn test_second_encoder_on_same_pins_rejected() {
    let port = Arc::new(SimulatedPort::new());
    let _first = RotaryEncoder::new(port.clone(), A, B, 100.0).unwrap();
    assert!(RotaryEncoder::new(port, A, PinId(4), 100.0).is_err());
}
