//! Ultrasonic ranging and tiered parking alerts
//!
//! Ranging is performed only while reversing: a trigger pulse goes
//! out, then two bounded spin-waits time the echo pulse. Either wait
//! timing out degrades to a 0.0 cm reading, which downstream treats
//! the same as "no obstacle". Distance maps to a green/yellow/red
//! tier, each with its own buzzer toggle cadence.

use crate::domain::vehicle::SharedVehicle;
use crate::domain::{AlertTier, Gear};
use crate::infra::config::UltrasonicConfig;
use crate::io::clock::{ticks_elapsed, Clock};
use crate::io::gpio::{Gpio, InputLine, Level, OutputLine};
use std::sync::Arc;
use tracing::{debug, trace};

/// Speed of sound as cm per microsecond, halved for the round trip
const CM_PER_US_ROUND_TRIP: f32 = 0.034 / 2.0;

pub struct Ranger {
    gpio: Arc<dyn Gpio>,
    clock: Arc<dyn Clock>,
    vehicle: SharedVehicle,
    config: UltrasonicConfig,
    last_gear: Gear,
    buzzer_on: bool,
    last_toggle_ms: u32,
}

impl Ranger {
    pub fn new(
        gpio: Arc<dyn Gpio>,
        clock: Arc<dyn Clock>,
        vehicle: SharedVehicle,
        config: &UltrasonicConfig,
    ) -> Self {
        let last_gear = vehicle.read().gear;
        Self {
            gpio,
            clock,
            vehicle,
            config: config.clone(),
            last_gear,
            buzzer_on: false,
            last_toggle_ms: 0,
        }
    }

    /// One ranging pass. Measures only in reverse; otherwise the
    /// published distance is forced to 0 and no pulse is emitted.
    /// Any gear change kills stale alerts before anything else.
    pub fn sample(&mut self) {
        let gear = self.vehicle.read().gear;
        if gear != self.last_gear {
            debug!(gear = gear.as_str(), "alerts_reset_on_gear_change");
            self.alerts_off();
            self.last_gear = gear;
        }

        if gear == Gear::Reverse {
            let distance = self.measure();
            self.vehicle.write().distance = distance;
            trace!(distance_cm = distance, "distance_sampled");
        } else {
            self.vehicle.write().distance = 0.0;
        }
    }

    pub fn current_distance(&self) -> f32 {
        self.vehicle.read().distance
    }

    /// Time one echo pulse and convert to cm, clamped to the
    /// configured ceiling. Both waits are hardware-polling loops with
    /// explicit timeouts, not suspension points.
    fn measure(&self) -> f32 {
        self.gpio.set_output(OutputLine::UltrasonicTrigger, Level::Low);
        self.spin_us(self.config.trigger_pulse_us);
        self.gpio.set_output(OutputLine::UltrasonicTrigger, Level::High);
        self.spin_us(self.config.trigger_pulse_us);
        self.gpio.set_output(OutputLine::UltrasonicTrigger, Level::Low);

        // Wait for the echo line to rise
        let wait_start = self.clock.now_us();
        loop {
            if self.gpio.read_digital(InputLine::UltrasonicEcho).is_high() {
                break;
            }
            if self.clock.now_us().wrapping_sub(wait_start) > self.config.echo_timeout_us {
                trace!("echo_rise_timeout");
                return 0.0;
            }
        }

        // Time the high phase
        let rise = self.clock.now_us();
        loop {
            if !self.gpio.read_digital(InputLine::UltrasonicEcho).is_high() {
                break;
            }
            if self.clock.now_us().wrapping_sub(rise) > self.config.echo_timeout_us {
                trace!("echo_fall_timeout");
                return 0.0;
            }
        }
        let high_us = self.clock.now_us().wrapping_sub(rise);

        let distance = high_us as f32 * CM_PER_US_ROUND_TRIP;
        distance.min(self.config.max_cm)
    }

    fn spin_us(&self, duration_us: u64) {
        let start = self.clock.now_us();
        while self.clock.now_us().wrapping_sub(start) < duration_us {}
    }

    /// Drive the LED tier and buzzer cadence for a measured distance.
    /// A 0 reading is ambiguous (timeout or clear path) and turns
    /// everything off rather than alarming.
    pub fn update_alerts(&mut self, distance_cm: f32) {
        let tier =
            match AlertTier::from_distance(distance_cm, self.config.safe_cm, self.config.caution_cm)
            {
                Some(tier) => tier,
                None => {
                    self.alerts_off();
                    return;
                }
            };

        self.set_led(OutputLine::GreenLed, tier == AlertTier::Safe);
        self.set_led(OutputLine::YellowLed, tier == AlertTier::Caution);
        self.set_led(OutputLine::RedLed, tier == AlertTier::Danger);
        self.update_buzzer(tier);
    }

    /// Force every alert output off and clear cadence state
    pub fn alerts_off(&mut self) {
        self.set_led(OutputLine::GreenLed, false);
        self.set_led(OutputLine::YellowLed, false);
        self.set_led(OutputLine::RedLed, false);
        self.gpio.set_output(OutputLine::Buzzer, Level::Low);
        self.buzzer_on = false;
        self.last_toggle_ms = 0;
    }

    fn update_buzzer(&mut self, tier: AlertTier) {
        let interval_ms = match tier {
            AlertTier::Safe => self.config.safe_beep_ms,
            AlertTier::Caution => self.config.caution_beep_ms,
            AlertTier::Danger => self.config.danger_beep_ms,
        };

        let now_ms = self.clock.now_ms();
        if ticks_elapsed(now_ms, self.last_toggle_ms) >= interval_ms {
            self.buzzer_on = !self.buzzer_on;
            self.gpio
                .set_output(OutputLine::Buzzer, if self.buzzer_on { Level::High } else { Level::Low });
            self.last_toggle_ms = now_ms;
        }
    }

    fn set_led(&self, line: OutputLine, on: bool) {
        self.gpio.set_output(line, if on { Level::High } else { Level::Low });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vehicle;
    use crate::infra::config::Config;
    use crate::io::mock::{MockClock, MockGpio};

    fn rig(step_us: u64) -> (Arc<MockGpio>, Arc<MockClock>, SharedVehicle, Ranger) {
        let clock = Arc::new(MockClock::with_step_us(step_us));
        let gpio = Arc::new(MockGpio::new().with_clock(clock.clone()));
        let shared = vehicle::new_shared();
        let config = Config::default();
        let ranger = Ranger::new(
            gpio.clone() as Arc<dyn Gpio>,
            clock.clone() as Arc<dyn Clock>,
            shared.clone(),
            config.ultrasonic(),
        );
        (gpio, clock, shared, ranger)
    }

    #[test]
    fn test_measures_only_in_reverse() {
        let (gpio, _, shared, mut ranger) = rig(1);
        shared.write().distance = 99.0;
        ranger.sample();
        assert_eq!(ranger.current_distance(), 0.0);
        // No trigger pulse while not reversing
        assert!(gpio.output_history().is_empty());
    }

    #[test]
    fn test_echo_pulse_maps_to_distance() {
        let (gpio, _, shared, mut ranger) = rig(1);
        shared.write().gear = Gear::Reverse;
        ranger.last_gear = Gear::Reverse;
        // 1471us high phase is a 25cm round trip
        gpio.set_echo_pulse(100, 100 + 1_471);
        ranger.sample();
        let distance = ranger.current_distance();
        assert!((distance - 25.0).abs() < 0.1, "got {distance}");
    }

    #[test]
    fn test_no_echo_times_out_to_zero() {
        let (_, _, shared, mut ranger) = rig(1_000);
        shared.write().gear = Gear::Reverse;
        ranger.last_gear = Gear::Reverse;
        ranger.sample();
        assert_eq!(ranger.current_distance(), 0.0);
    }

    #[test]
    fn test_stuck_echo_times_out_to_zero() {
        let (gpio, _, shared, mut ranger) = rig(1_000);
        shared.write().gear = Gear::Reverse;
        ranger.last_gear = Gear::Reverse;
        // Rises but never falls within the timeout
        gpio.set_echo_pulse(2_000, u64::MAX);
        ranger.sample();
        assert_eq!(ranger.current_distance(), 0.0);
    }

    #[test]
    fn test_cleared_pulse_reads_as_no_echo() {
        let (gpio, _, shared, mut ranger) = rig(1_000);
        shared.write().gear = Gear::Reverse;
        ranger.last_gear = Gear::Reverse;
        gpio.set_echo_pulse(5_000, 55_000);
        ranger.sample();
        assert!(ranger.current_distance() > 0.0);

        // Obstacle gone: the next pass times out to 0
        gpio.clear_echo_pulse();
        ranger.sample();
        assert_eq!(ranger.current_distance(), 0.0);
    }

    #[test]
    fn test_distance_clamped_to_ceiling() {
        let (gpio, _, shared, mut ranger) = rig(1);
        shared.write().gear = Gear::Reverse;
        ranger.last_gear = Gear::Reverse;
        // 12000us high phase would be 204cm
        gpio.set_echo_pulse(100, 100 + 12_000);
        ranger.sample();
        assert_eq!(ranger.current_distance(), 150.0);
    }

    #[test]
    fn test_danger_tier_drives_red_and_fast_cadence() {
        let (gpio, clock, _, mut ranger) = rig(1);
        clock.set_ms(500);
        ranger.update_alerts(25.0);
        assert_eq!(gpio.output(OutputLine::RedLed), Level::High);
        assert_eq!(gpio.output(OutputLine::GreenLed), Level::Low);
        assert_eq!(gpio.output(OutputLine::YellowLed), Level::Low);
        // First evaluation past the interval toggles the buzzer on
        assert_eq!(gpio.output(OutputLine::Buzzer), Level::High);

        // Inside the 200ms danger interval: no re-toggle
        clock.set_ms(600);
        ranger.update_alerts(25.0);
        assert_eq!(gpio.output(OutputLine::Buzzer), Level::High);

        // Interval elapsed: toggles off
        clock.set_ms(700);
        ranger.update_alerts(25.0);
        assert_eq!(gpio.output(OutputLine::Buzzer), Level::Low);
    }

    #[test]
    fn test_safe_tier_is_green_only() {
        let (gpio, clock, _, mut ranger) = rig(1);
        clock.set_ms(2_000);
        ranger.update_alerts(120.0);
        assert_eq!(gpio.output(OutputLine::GreenLed), Level::High);
        assert_eq!(gpio.output(OutputLine::YellowLed), Level::Low);
        assert_eq!(gpio.output(OutputLine::RedLed), Level::Low);
    }

    #[test]
    fn test_zero_reading_turns_everything_off() {
        let (gpio, clock, _, mut ranger) = rig(1);
        clock.set_ms(500);
        ranger.update_alerts(25.0);
        assert_eq!(gpio.output(OutputLine::RedLed), Level::High);

        ranger.update_alerts(0.0);
        assert_eq!(gpio.output(OutputLine::RedLed), Level::Low);
        assert_eq!(gpio.output(OutputLine::Buzzer), Level::Low);
    }

    #[test]
    fn test_gear_change_resets_alerts() {
        let (gpio, clock, shared, mut ranger) = rig(1);
        shared.write().gear = Gear::Reverse;
        ranger.last_gear = Gear::Reverse;
        clock.set_ms(500);
        ranger.update_alerts(25.0);
        assert_eq!(gpio.output(OutputLine::RedLed), Level::High);
        assert_eq!(gpio.output(OutputLine::Buzzer), Level::High);

        shared.write().gear = Gear::Drive;
        ranger.sample();
        assert_eq!(gpio.output(OutputLine::RedLed), Level::Low);
        assert_eq!(gpio.output(OutputLine::Buzzer), Level::Low);
        assert_eq!(ranger.current_distance(), 0.0);
    }
}
