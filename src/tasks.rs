//! Periodic monitor tasks - the coordination layer
//!
//! One tokio task per subsystem, each an infinite loop that performs
//! one sampling/evaluation pass and then sleeps on its poll interval.
//! Cross-task state flows through the shared vehicle hub; the display
//! is the one resource needing mutual exclusion, and every group of
//! logically-related writes happens under a single lock guard.

use crate::domain::vehicle::{self, SharedVehicle};
use crate::domain::{DoorOpenState, Gear, LockState};
use crate::infra::config::{Config, TasksConfig};
use crate::io::clock::{ticks_elapsed, Clock};
use crate::io::display::SharedDisplay;
use crate::io::gpio::{Gpio, Level, OutputLine};
use crate::services::{DoorSystem, GearSelector, Ranger, SpeedEstimator};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::info;

/// Row-0 default view showing the lock state
pub fn door_view(lock: LockState) -> &'static str {
    match lock {
        LockState::Unlocked => "Door: Unlocked",
        LockState::Locked => "Door: Locked  ",
    }
}

/// Row-1 default view while not reversing
pub fn speed_view(speed_kmh: f32) -> String {
    format!("Speed={speed_kmh:.1} km/h  ")
}

/// Row-1 view while reversing with a valid reading
pub fn distance_view(distance_cm: f32) -> String {
    format!("Dist={distance_cm:.1} cm  ")
}

const DOOR_OPEN_WARNING: &str = "WARNING: Door Open! ";

/// Polls the door lock state machine and reflects lock changes on
/// display row 0, holding the status message for a fixed time before
/// reverting to the default view.
pub struct DoorLockMonitor {
    door: DoorSystem,
    display: SharedDisplay,
    clock: Arc<dyn Clock>,
    period: Duration,
    hold_ms: u32,
}

impl DoorLockMonitor {
    pub fn new(
        door: DoorSystem,
        display: SharedDisplay,
        clock: Arc<dyn Clock>,
        tasks: &TasksConfig,
    ) -> Self {
        Self {
            door,
            display,
            clock,
            period: Duration::from_millis(tasks.door_poll_ms),
            hold_ms: tasks.door_status_hold_ms,
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(period_ms = %self.period.as_millis(), "door_lock_monitor_started");
        let mut poll = interval(self.period);
        let mut last_lock = self.door.lock_state();
        let mut showing_status = false;
        let mut status_ms = 0u32;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("door_lock_monitor_shutdown");
                        return;
                    }
                }
                _ = poll.tick() => {}
            }

            let now_ms = self.clock.now_ms();
            if self.door.sample() {
                let lock = self.door.lock_state();
                if lock != last_lock {
                    self.display.lock().write_at(0, 0, door_view(lock));
                    showing_status = true;
                    status_ms = now_ms;
                    last_lock = lock;
                }
            } else if showing_status && ticks_elapsed(now_ms, status_ms) > self.hold_ms {
                self.display.lock().write_at(0, 0, door_view(self.door.lock_state()));
                showing_status = false;
            }
        }
    }
}

/// Tracks door open/close transitions, drives the door-open-while-
/// moving warning, and keeps the row-1 speed view fresh while the
/// vehicle is not reversing.
pub struct DoorOpenMonitor {
    gpio: Arc<dyn Gpio>,
    display: SharedDisplay,
    vehicle: SharedVehicle,
    clock: Arc<dyn Clock>,
    period: Duration,
    hold_ms: u32,
}

impl DoorOpenMonitor {
    pub fn new(
        gpio: Arc<dyn Gpio>,
        display: SharedDisplay,
        vehicle: SharedVehicle,
        clock: Arc<dyn Clock>,
        tasks: &TasksConfig,
    ) -> Self {
        Self {
            gpio,
            display,
            vehicle,
            clock,
            period: Duration::from_millis(tasks.door_poll_ms),
            hold_ms: tasks.door_status_hold_ms,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(period_ms = %self.period.as_millis(), "door_open_monitor_started");
        let mut poll = interval(self.period);
        let mut last_open = self.vehicle.read().door_open;
        let mut showing_status = false;
        let mut status_ms = 0u32;
        let mut warning_active = false;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("door_open_monitor_shutdown");
                        return;
                    }
                }
                _ = poll.tick() => {}
            }

            let state = vehicle::snapshot(&self.vehicle);
            let now_ms = self.clock.now_ms();

            if state.door_open != last_open {
                let text = match state.door_open {
                    DoorOpenState::Open => "Door: Opened  ",
                    DoorOpenState::Closed => "Door: Closed  ",
                };
                self.display.lock().write_at(0, 0, text);
                showing_status = true;
                status_ms = now_ms;
                last_open = state.door_open;
            } else if showing_status && ticks_elapsed(now_ms, status_ms) > self.hold_ms {
                self.display.lock().write_at(0, 0, door_view(state.lock_state));
                showing_status = false;
            }

            let warn = state.door_open == DoorOpenState::Open && state.speed > 0.0;
            if warn {
                if !warning_active {
                    info!(speed_kmh = state.speed, "door_open_while_moving");
                    self.gpio.set_output(OutputLine::Buzzer, Level::High);
                    warning_active = true;
                }
                self.display.lock().write_at(1, 0, DOOR_OPEN_WARNING);
            } else {
                if warning_active {
                    self.gpio.set_output(OutputLine::Buzzer, Level::Low);
                    warning_active = false;
                }
                if state.gear != Gear::Reverse {
                    self.display.lock().write_at(1, 0, &speed_view(state.speed));
                }
            }
        }
    }
}

/// Samples the speed estimator and re-arms auto-lock when the speed
/// falls back through the override re-arm threshold.
pub struct SpeedMonitor {
    estimator: SpeedEstimator,
    vehicle: SharedVehicle,
    period: Duration,
    rearm_kmh: f32,
}

impl SpeedMonitor {
    pub fn new(estimator: SpeedEstimator, vehicle: SharedVehicle, config: &Config) -> Self {
        Self {
            estimator,
            vehicle,
            period: Duration::from_millis(config.tasks().speed_poll_ms),
            rearm_kmh: config.speed().override_rearm_kmh,
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(period_ms = %self.period.as_millis(), "speed_monitor_started");
        let mut poll = interval(self.period);
        let mut last_speed = 0.0f32;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("speed_monitor_shutdown");
                        return;
                    }
                }
                _ = poll.tick() => {}
            }

            self.estimator.sample();
            let speed = self.estimator.current_speed();

            // Edge-triggered on the speed signal: crossing down through
            // the threshold re-arms auto-lock after a manual unlock
            if last_speed > self.rearm_kmh && speed <= self.rearm_kmh {
                let mut state = self.vehicle.write();
                if state.manual_override {
                    state.manual_override = false;
                    info!(speed_kmh = speed, "manual_override_rearmed");
                }
            }
            last_speed = speed;
        }
    }
}

/// Polls the gear selector and paints the gear letter on changes
pub struct GearMonitor {
    selector: GearSelector,
    display: SharedDisplay,
    vehicle: SharedVehicle,
    period: Duration,
}

impl GearMonitor {
    pub fn new(
        selector: GearSelector,
        display: SharedDisplay,
        vehicle: SharedVehicle,
        tasks: &TasksConfig,
    ) -> Self {
        Self { selector, display, vehicle, period: Duration::from_millis(tasks.gear_poll_ms) }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(period_ms = %self.period.as_millis(), "gear_monitor_started");
        let mut poll = interval(self.period);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("gear_monitor_shutdown");
                        return;
                    }
                }
                _ = poll.tick() => {}
            }

            if self.selector.sample() {
                let gear = self.vehicle.read().gear;
                self.display.lock().write_at(0, 15, gear.letter());
            }
        }
    }
}

/// Runs the ranging pass and owns the row-1 view while reversing:
/// distance plus alerts for valid readings, speed with alerts off at
/// the clamp ceiling or on timeout.
pub struct UltrasonicMonitor {
    ranger: Ranger,
    display: SharedDisplay,
    vehicle: SharedVehicle,
    period: Duration,
    max_cm: f32,
}

impl UltrasonicMonitor {
    pub fn new(
        ranger: Ranger,
        display: SharedDisplay,
        vehicle: SharedVehicle,
        config: &Config,
    ) -> Self {
        Self {
            ranger,
            display,
            vehicle,
            period: Duration::from_millis(config.tasks().ultrasonic_poll_ms),
            max_cm: config.ultrasonic().max_cm,
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(period_ms = %self.period.as_millis(), "ultrasonic_monitor_started");
        let mut poll = interval(self.period);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("ultrasonic_monitor_shutdown");
                        return;
                    }
                }
                _ = poll.tick() => {}
            }

            self.ranger.sample();
            let (gear, speed) = {
                let state = self.vehicle.read();
                (state.gear, state.speed)
            };

            if gear == Gear::Reverse {
                let distance = self.ranger.current_distance();
                if distance > 0.0 && distance < self.max_cm {
                    self.display.lock().write_at(1, 0, &distance_view(distance));
                    self.ranger.update_alerts(distance);
                } else {
                    self.display.lock().write_at(1, 0, &speed_view(speed));
                    self.ranger.alerts_off();
                }
            } else {
                self.ranger.alerts_off();
            }
        }
    }
}

/// Edge-detects ignition transitions and shows them on row 0,
/// reverting to the door view after the hold time.
pub struct IgnitionMonitor {
    display: SharedDisplay,
    vehicle: SharedVehicle,
    clock: Arc<dyn Clock>,
    period: Duration,
    hold_ms: u32,
}

impl IgnitionMonitor {
    pub fn new(
        display: SharedDisplay,
        vehicle: SharedVehicle,
        clock: Arc<dyn Clock>,
        tasks: &TasksConfig,
    ) -> Self {
        Self {
            display,
            vehicle,
            clock,
            period: Duration::from_millis(tasks.ignition_poll_ms),
            hold_ms: tasks.ignition_status_hold_ms,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(period_ms = %self.period.as_millis(), "ignition_monitor_started");
        let mut poll = interval(self.period);
        let mut last_ignition = self.vehicle.read().ignition_on;
        let mut showing_status = false;
        let mut status_ms = 0u32;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("ignition_monitor_shutdown");
                        return;
                    }
                }
                _ = poll.tick() => {}
            }

            let (ignition_on, lock_state) = {
                let state = self.vehicle.read();
                (state.ignition_on, state.lock_state)
            };
            let now_ms = self.clock.now_ms();

            if ignition_on != last_ignition {
                let text = if ignition_on { "Ignition: ON  " } else { "Ignition: OFF " };
                self.display.lock().write_at(0, 0, text);
                showing_status = true;
                status_ms = now_ms;
                last_ignition = ignition_on;
            } else if showing_status && ticks_elapsed(now_ms, status_ms) > self.hold_ms {
                self.display.lock().write_at(0, 0, door_view(lock_state));
                showing_status = false;
            }
        }
    }
}

/// Paints the full default view once at startup, then periodically
/// repaints the gear letter.
pub struct DisplayRefresh {
    display: SharedDisplay,
    vehicle: SharedVehicle,
    period: Duration,
}

impl DisplayRefresh {
    pub fn new(display: SharedDisplay, vehicle: SharedVehicle, tasks: &TasksConfig) -> Self {
        Self { display, vehicle, period: Duration::from_millis(tasks.display_refresh_ms) }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(period_ms = %self.period.as_millis(), "display_refresh_started");

        // Initial full paint under one lock span
        {
            let state = vehicle::snapshot(&self.vehicle);
            let mut display = self.display.lock();
            display.clear();
            display.write_at(0, 0, door_view(state.lock_state));
            display.write_at(0, 15, state.gear.letter());
            if state.gear == Gear::Reverse {
                display.write_at(1, 0, &distance_view(state.distance));
            } else {
                display.write_at(1, 0, &speed_view(state.speed));
            }
        }

        let mut poll = interval(self.period);
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("display_refresh_shutdown");
                        return;
                    }
                }
                _ = poll.tick() => {}
            }

            let gear = self.vehicle.read().gear;
            self.display.lock().write_at(0, 15, gear.letter());
        }
    }
}
