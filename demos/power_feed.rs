//! Power feed example.
//!
//! Drives the carriage back and forth at a fixed feed rate with backlash
//! compensation, on simulated hardware.

use std::sync::Arc;

use leadscrew_motion::hal::sim::SimulatedPort;
use leadscrew_motion::{PinId, StepperMotorBuilder};

fn main() -> leadscrew_motion::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Power Feed Example ===\n");

    let port = Arc::new(SimulatedPort::new());
    let carriage = StepperMotorBuilder::new()
        .name("z")
        .pins(PinId(5), PinId(6))
        .enable_pin(PinId(13), true)
        .steps_per_revolution(1000)
        .conversion_factor(0.005)
        .max_speed(1500.0)
        .ramp_rate(2000.0)
        .backlash(8, 8)
        .build(port.clone())?;

    println!("Motor: {}", carriage.name());
    println!("  Max speed: {:.0} mm/min ({:.0} rpm)", carriage.max_speed(), carriage.max_rpm());

    carriage.set_speed(600.0);
    println!("\nFeeding at {:.0} mm/min ({:.0} rpm)", carriage.speed(), carriage.rpm());

    for target in [-10.0, -5.0, -12.5, 0.0] {
        carriage.go_to_position(target);
        carriage.wait();
        println!(
            "  at {:>6.2} mm  (step {:>5}, raw {:>5})",
            carriage.position(),
            carriage.current_step(),
            carriage.current_step_without_backlash_compensation(),
        );
    }

    println!("\nSTEP pulses emitted: {}", port.rising_edges(PinId(5)));
    println!("=== Example Complete ===");
    Ok(())
}
