//! Property tests for the pure timing and counting math.

use proptest::prelude::*;

use leadscrew_motion::config::units::{Rpm, StepDelay, MIN_STEP_DELAY_US};
use leadscrew_motion::encoder::next_zero_phase_tick;
use leadscrew_motion::hal::Tick;
use leadscrew_motion::motion::{Direction, SpeedRamp};
use leadscrew_motion::motor::{Backlash, StepCounter};

proptest! {
    /// Faster speeds never produce longer delays, and the floor holds.
    #[test]
    fn delay_is_monotonic_and_floored(
        spr in 1u32..20_000,
        a in 0.01f64..10_000.0,
        b in 0.01f64..10_000.0,
    ) {
        let (slow, fast) = if a <= b { (a, b) } else { (b, a) };
        let slow_delay = StepDelay::from_rpm(spr, Rpm(slow)).unwrap();
        let fast_delay = StepDelay::from_rpm(spr, Rpm(fast)).unwrap();
        prop_assert!(fast_delay <= slow_delay);
        prop_assert!(fast_delay.as_micros() >= MIN_STEP_DELAY_US);
    }

    /// Near-zero and negative speeds are stop requests.
    #[test]
    fn tiny_speeds_stop(spr in 1u32..20_000, rpm in -1000.0f64..0.000_5) {
        prop_assert!(StepDelay::from_rpm(spr, Rpm(rpm)).is_none());
    }

    /// After any move sequence, the raw/logical offset is one of the two
    /// backlash rest positions (or zero before any motion), and the logical
    /// position reaches every target.
    #[test]
    fn backlash_offset_stays_bounded(
        forward in 0u32..20,
        reverse in 0u32..20,
        targets in prop::collection::vec(-50i64..50, 1..20),
    ) {
        let backlash = Backlash::new(forward, reverse);
        let mut counter = StepCounter::new(backlash);
        for target in targets {
            while let Some(direction) = Direction::from_delta(target - counter.logical()) {
                counter.pulse(direction);
            }
            prop_assert_eq!(counter.logical(), target);
            let offset = counter.offset();
            prop_assert!(offset <= forward as i64 && offset >= -(reverse as i64));
        }
    }

    /// The phase-lock target is never in the past, at most one period
    /// ahead, and on the extrapolated grid, across counter wrap.
    #[test]
    fn zero_phase_tick_is_next_on_grid(
        last_zero in any::<u32>(),
        period in 1_000u32..1_000_000,
        advance in 0u32..1_000,
        lag in 0u32..100_000_000,
    ) {
        let now = Tick(last_zero).add_us(lag);
        let target = next_zero_phase_tick(Tick(last_zero), period as f64, advance as f64, now);

        let ahead = target.signed_since(now);
        prop_assert!(ahead >= 0);
        prop_assert!(ahead as u32 <= period);

        let from_anchor = target.elapsed_since(Tick(last_zero)) as u64 + advance as u64;
        prop_assert_eq!(from_anchor % period as u64, 0);
    }

    /// One ramp step never overshoots and never moves away from the target.
    #[test]
    fn ramp_step_is_bounded(
        rate in 1.0f64..10_000.0,
        start in 1.0f64..100.0,
        target in 1.0f64..3_000.0,
        elapsed in 1u32..100_000,
    ) {
        let mut ramp = SpeedRamp::new(rate, Rpm(start), Rpm(target));
        ramp.rest();
        let before = ramp.current().0;
        let after = ramp.advance(elapsed).0;
        prop_assert!((after - before).abs() <= rate * elapsed as f64 / 1e6 + 1e-9);
        prop_assert!((target - after).abs() <= (target - before).abs() + 1e-9);
    }
}
