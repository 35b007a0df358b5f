//! Speed estimation from the analog speed sender
//!
//! There is no factory calibration for the sender, so the estimator
//! keeps a running min/max of every raw sample it has seen and maps
//! new samples linearly into that observed range. The range only ever
//! widens over the process lifetime.

use crate::domain::vehicle::SharedVehicle;
use crate::domain::Gear;
use crate::infra::config::SpeedConfig;
use crate::io::gpio::{AnalogChannel, Gpio};
use std::sync::Arc;
use tracing::trace;

/// Raw-sample-to-km/h mapping strategy.
///
/// Behind a trait so a fixed or decaying calibration can replace the
/// ever-widening observed range without touching callers.
pub trait SpeedMap: Send {
    /// Fold the sample into the calibration and map it to km/h
    fn map(&mut self, sample: u16) -> f32;
}

/// Default mapping: linear over the observed raw min/max.
///
/// A single noise spike permanently widens the range; that is the
/// accepted trade-off of having no fixed sensor calibration.
pub struct ObservedRangeMap {
    min: u16,
    max: u16,
    max_kmh: f32,
}

impl ObservedRangeMap {
    pub fn new(max_kmh: f32) -> Self {
        // Start pessimistic so the first sample establishes both ends
        Self { min: 4095, max: 0, max_kmh }
    }

    /// Observed (min, max) raw range so far
    pub fn range(&self) -> (u16, u16) {
        (self.min, self.max)
    }
}

impl SpeedMap for ObservedRangeMap {
    fn map(&mut self, sample: u16) -> f32 {
        self.min = self.min.min(sample);
        self.max = self.max.max(sample);

        if self.max > self.min {
            f32::from(sample - self.min) * self.max_kmh / f32::from(self.max - self.min)
        } else {
            // Degenerate range; self-heals on the next distinct sample
            0.0
        }
    }
}

pub struct SpeedEstimator {
    gpio: Arc<dyn Gpio>,
    vehicle: SharedVehicle,
    map: Box<dyn SpeedMap>,
    config: SpeedConfig,
}

impl SpeedEstimator {
    pub fn new(gpio: Arc<dyn Gpio>, vehicle: SharedVehicle, config: &SpeedConfig) -> Self {
        Self::with_map(gpio, vehicle, config, Box::new(ObservedRangeMap::new(config.max_kmh)))
    }

    pub fn with_map(
        gpio: Arc<dyn Gpio>,
        vehicle: SharedVehicle,
        config: &SpeedConfig,
        map: Box<dyn SpeedMap>,
    ) -> Self {
        Self { gpio, vehicle, map, config: config.clone() }
    }

    /// Take one analog sample and publish the calibrated speed.
    ///
    /// With the ignition off the output is pinned to 0 and no
    /// conversion is started, leaving the calibration untouched.
    pub fn sample(&mut self) {
        let (ignition_on, gear) = {
            let state = self.vehicle.read();
            (state.ignition_on, state.gear)
        };

        if !ignition_on {
            self.vehicle.write().speed = 0.0;
            return;
        }

        let raw = self.gpio.read_analog(AnalogChannel::SpeedSense);
        let mut speed = self.map.map(raw);

        match gear {
            Gear::Reverse => speed = speed.min(self.config.reverse_limit_kmh),
            Gear::Park => speed = 0.0,
            Gear::Drive => {}
        }

        self.vehicle.write().speed = speed;
        trace!(raw = raw, speed_kmh = speed, gear = gear.as_str(), "speed_sampled");
    }

    pub fn current_speed(&self) -> f32 {
        self.vehicle.read().speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vehicle;
    use crate::infra::config::Config;
    use crate::io::mock::MockGpio;

    fn rig() -> (Arc<MockGpio>, SharedVehicle, SpeedEstimator) {
        let gpio = Arc::new(MockGpio::new());
        let shared = vehicle::new_shared();
        let config = Config::default();
        let estimator =
            SpeedEstimator::new(gpio.clone() as Arc<dyn Gpio>, shared.clone(), config.speed());
        (gpio, shared, estimator)
    }

    #[test]
    fn test_first_sample_reads_zero() {
        let (gpio, _, mut estimator) = rig();
        gpio.push_analog(2000);
        estimator.sample();
        // Degenerate range until a second, different sample arrives
        assert_eq!(estimator.current_speed(), 0.0);
    }

    #[test]
    fn test_range_maps_to_full_scale() {
        let (gpio, _, mut estimator) = rig();
        gpio.push_analog(0);
        gpio.push_analog(4095);
        estimator.sample();
        estimator.sample();
        assert_eq!(estimator.current_speed(), 100.0);

        // Mid-range sample lands mid-scale
        gpio.push_analog(2048);
        estimator.sample();
        let speed = estimator.current_speed();
        assert!((speed - 50.0).abs() < 0.1, "got {speed}");
    }

    #[test]
    fn test_calibration_range_only_widens() {
        let mut map = ObservedRangeMap::new(100.0);
        let samples = [2000u16, 500, 3000, 1000, 3500, 2500];
        let mut last_range = (u16::MAX, 0u16);
        for (i, sample) in samples.iter().enumerate() {
            map.map(*sample);
            let (min, max) = map.range();
            if i > 0 {
                assert!(min <= last_range.0, "min grew: {min} > {}", last_range.0);
                assert!(max >= last_range.1, "max shrank: {max} < {}", last_range.1);
            }
            last_range = (min, max);
        }
        assert_eq!(map.range(), (500, 3500));
    }

    #[test]
    fn test_ignition_off_pins_speed_to_zero() {
        let (gpio, shared, mut estimator) = rig();
        gpio.push_analog(0);
        gpio.push_analog(4095);
        estimator.sample();
        estimator.sample();
        assert_eq!(estimator.current_speed(), 100.0);

        shared.write().ignition_on = false;
        gpio.push_analog(4095);
        estimator.sample();
        assert_eq!(estimator.current_speed(), 0.0);
    }

    #[test]
    fn test_reverse_clamps_speed() {
        let (gpio, shared, mut estimator) = rig();
        shared.write().gear = Gear::Reverse;
        gpio.push_analog(0);
        gpio.push_analog(4095);
        estimator.sample();
        estimator.sample();
        assert_eq!(estimator.current_speed(), 30.0);
    }

    #[test]
    fn test_park_pins_speed_to_zero() {
        let (gpio, shared, mut estimator) = rig();
        shared.write().gear = Gear::Park;
        for sample in [0u16, 4095, 1234, 4000] {
            gpio.push_analog(sample);
            estimator.sample();
            assert_eq!(estimator.current_speed(), 0.0);
        }
    }
}
