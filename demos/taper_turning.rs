//! Taper turning example.
//!
//! Slaves the cross-slide to the carriage so that a carriage feed cuts a
//! 3° taper, then switches to a straight ratio for radius tracking.

use std::sync::Arc;

use leadscrew_motion::hal::sim::SimulatedPort;
use leadscrew_motion::{parse_config, Degrees, Direction, Lathe};

const CONFIG: &str = r#"
[axes.z]
step_pin = 5
dir_pin = 6
steps_per_revolution = 1000
distance_per_step = 0.005
max_speed = 600.0
ramping = false

[axes.x]
step_pin = 20
dir_pin = 21
steps_per_revolution = 1000
distance_per_step = -0.001
max_speed = "${axes.z.max_speed}"
ramping = false
backlash_forward = 15
backlash_reverse = 15

[spindle]
pin_a = 17
pin_b = 27
pulses_per_revolution = 1000
"#;

fn main() -> leadscrew_motion::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Taper Turning Example ===\n");

    let config = parse_config(CONFIG)?;
    let lathe = Lathe::from_config(&config, Arc::new(SimulatedPort::new()))?;
    let Some(cross) = lathe.cross_slide() else {
        println!("No cross-slide configured");
        return Ok(());
    };

    lathe.carriage().set_speed(120.0);
    cross.set_rpm(300.0);

    println!("Engaging 3° taper");
    lathe.engage_taper(Degrees(3.0), Direction::Reverse);
    let start = cross.position();

    lathe.carriage().go_to_position(-15.0);
    lathe.carriage().wait();
    cross.wait();
    println!(
        "  carriage {:.3} mm, cross-slide moved {:.4} mm",
        lathe.carriage().position(),
        cross.position() - start
    );

    lathe.disengage_cross_slave();
    lathe.carriage().go_to_position(0.0);
    lathe.carriage().wait();

    println!("\nEngaging 1:2 radius tracking");
    lathe.engage_radius(0.5, Direction::Forward);
    let start = cross.position();
    lathe.carriage().go_to_position(4.0);
    lathe.carriage().wait();
    cross.wait();
    println!("  cross-slide moved {:.3} mm", cross.position() - start);

    lathe.disengage_cross_slave();
    println!("=== Example Complete ===");
    Ok(())
}
