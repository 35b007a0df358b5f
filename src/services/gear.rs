//! Gear selection from the two selector switch lines
//!
//! Drive asserted alone selects Drive, Reverse asserted alone selects
//! Reverse, every other combination resolves to Park. A selection is
//! only accepted while the vehicle is at or below the gear-change
//! speed threshold; a denied read is simply discarded and the switch
//! state is re-evaluated on the next poll.

use crate::domain::vehicle::SharedVehicle;
use crate::domain::Gear;
use crate::io::gpio::{Gpio, InputLine};
use std::sync::Arc;
use tracing::{debug, info};

pub struct GearSelector {
    gpio: Arc<dyn Gpio>,
    vehicle: SharedVehicle,
    gear_change_kmh: f32,
}

impl GearSelector {
    pub fn new(gpio: Arc<dyn Gpio>, vehicle: SharedVehicle, gear_change_kmh: f32) -> Self {
        Self { gpio, vehicle, gear_change_kmh }
    }

    /// Poll the switch lines once. Returns whether the selected gear
    /// actually changed this cycle.
    pub fn sample(&mut self) -> bool {
        let drive = self.gpio.read_digital(InputLine::GearDrive).is_high();
        let reverse = self.gpio.read_digital(InputLine::GearReverse).is_high();

        let candidate = match (drive, reverse) {
            (true, false) => Gear::Drive,
            (false, true) => Gear::Reverse,
            _ => Gear::Park,
        };

        let (current, speed) = {
            let state = self.vehicle.read();
            (state.gear, state.speed)
        };

        if candidate == current {
            return false;
        }

        if speed > self.gear_change_kmh {
            debug!(
                from = current.as_str(),
                to = candidate.as_str(),
                speed_kmh = speed,
                "gear_change_denied_moving"
            );
            return false;
        }

        self.vehicle.write().gear = candidate;
        info!(from = current.as_str(), to = candidate.as_str(), "gear_changed");
        true
    }

    pub fn current_gear(&self) -> Gear {
        self.vehicle.read().gear
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vehicle;
    use crate::io::gpio::Level;
    use crate::io::mock::MockGpio;

    fn rig() -> (Arc<MockGpio>, SharedVehicle, GearSelector) {
        let gpio = Arc::new(MockGpio::new());
        let shared = vehicle::new_shared();
        let selector = GearSelector::new(gpio.clone() as Arc<dyn Gpio>, shared.clone(), 5.0);
        (gpio, shared, selector)
    }

    fn select(gpio: &MockGpio, drive: Level, reverse: Level) {
        gpio.set_level(InputLine::GearDrive, drive);
        gpio.set_level(InputLine::GearReverse, reverse);
    }

    #[test]
    fn test_decode_switch_combinations() {
        let (gpio, _, mut selector) = rig();

        select(&gpio, Level::High, Level::Low);
        selector.sample();
        assert_eq!(selector.current_gear(), Gear::Drive);

        select(&gpio, Level::Low, Level::High);
        assert!(selector.sample());
        assert_eq!(selector.current_gear(), Gear::Reverse);

        // Both asserted is ambiguous and resolves to Park
        select(&gpio, Level::High, Level::High);
        assert!(selector.sample());
        assert_eq!(selector.current_gear(), Gear::Park);

        select(&gpio, Level::Low, Level::Low);
        assert!(!selector.sample());
        assert_eq!(selector.current_gear(), Gear::Park);
    }

    #[test]
    fn test_idempotent_when_unchanged() {
        let (gpio, _, mut selector) = rig();
        select(&gpio, Level::High, Level::Low);
        selector.sample();
        assert!(!selector.sample());
        assert!(!selector.sample());
        assert_eq!(selector.current_gear(), Gear::Drive);
    }

    #[test]
    fn test_change_denied_while_moving() {
        let (gpio, shared, mut selector) = rig();
        select(&gpio, Level::High, Level::Low);
        selector.sample();
        assert_eq!(selector.current_gear(), Gear::Drive);

        shared.write().speed = 40.0;
        select(&gpio, Level::Low, Level::High);
        assert!(!selector.sample());
        assert_eq!(selector.current_gear(), Gear::Drive);

        // Not queued: once speed drops the held switch state applies
        shared.write().speed = 4.0;
        assert!(selector.sample());
        assert_eq!(selector.current_gear(), Gear::Reverse);
    }

    #[test]
    fn test_change_accepted_at_threshold() {
        let (gpio, shared, mut selector) = rig();
        shared.write().speed = 5.0;
        select(&gpio, Level::Low, Level::High);
        assert!(selector.sample());
        assert_eq!(selector.current_gear(), Gear::Reverse);
    }
}
