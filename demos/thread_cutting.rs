//! Thread cutting example.
//!
//! Builds a lathe from TOML, spins a simulated spindle and cuts several
//! threading passes, each started at the same spindle phase.

use std::sync::Arc;
use std::time::Duration;

use leadscrew_motion::hal::sim::{SimulatedPort, SpindleSimulator};
use leadscrew_motion::{parse_config, Degrees, Lathe, PinId, ThreadingStatus};

const CONFIG: &str = r#"
[axes.z]
name = "Carriage"
step_pin = 5
dir_pin = 6
steps_per_revolution = 1000
distance_per_step = 0.005
max_speed = 1500.0

[spindle]
pin_a = 17
pin_b = 27
pulses_per_revolution = 100

[threading]
pitch = 1.5
max_axial_speed = 900.0
"#;

fn main() -> leadscrew_motion::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Thread Cutting Example ===\n");

    let config = parse_config(CONFIG)?;
    let port = Arc::new(SimulatedPort::new());
    let mut lathe = Lathe::from_config(&config, port.clone())?;
    let spindle = SpindleSimulator::start(port, PinId(17), PinId(27), 100, 400.0);

    lathe.engage_threading();

    print!("Waiting for spindle");
    while lathe.spindle().is_warming_up() {
        print!(".");
        std::thread::sleep(Duration::from_millis(20));
    }
    println!(" {:.0} rpm", lathe.spindle().rpm());

    let length = -5.0;
    for pass in 1..=4 {
        match lathe.update_threading() {
            ThreadingStatus::Locked { speed } => println!("Pass {}: feed {:.0} mm/min", pass, speed),
            other => {
                println!("Pass {}: not locked ({:?})", pass, other);
                break;
            }
        }

        // Compound infeed at 29.5° shifts the start point; compensate in time
        let rpm = lathe.spindle().rpm();
        let advance = lathe.threading().infeed_advance_us(0.1 * pass as f64, Degrees(29.5), rpm);
        lathe.spindle().set_advance_value_us(advance);

        lathe.start_threading_pass(length);
        lathe.carriage().wait();
        println!("  reached {:.2} mm", lathe.carriage().position());

        lathe.carriage().go_to_position(0.0);
        lathe.carriage().wait();
    }

    println!("\nSpindle speeds up past the axial limit...");
    spindle.set_rpm(800.0);
    std::thread::sleep(Duration::from_millis(300));
    println!("  {:?}", lathe.update_threading());

    lathe.disengage_threading();
    println!("=== Example Complete ===");
    Ok(())
}
