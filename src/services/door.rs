//! Door lock/unlock state machine and ignition gate
//!
//! One sampling pass reads the lock button, unlock button, ignition
//! request line and door switch, then applies the transition rules in
//! fixed priority order: door switch, ignition, lock press, unlock
//! press, auto-lock. The lock/unlock buttons and the door switch share
//! a single debounce timestamp, so any accepted edge suppresses
//! further edges on all three inputs for one debounce window.
//!
//! The ignition line itself is not debounced; the gate's permission
//! rules (no shutoff while moving, no start outside Park) are the
//! safety filter for that input.

use crate::domain::vehicle::SharedVehicle;
use crate::domain::{DoorOpenState, Gear, LockState};
use crate::infra::config::{DoorConfig, SpeedConfig};
use crate::io::clock::{ticks_elapsed, Clock};
use crate::io::gpio::{Gpio, InputLine, Level};
use std::sync::Arc;
use tracing::{debug, info};

pub struct DoorSystem {
    gpio: Arc<dyn Gpio>,
    clock: Arc<dyn Clock>,
    vehicle: SharedVehicle,
    debounce_ms: u32,
    auto_lock_kmh: f32,
    // Previously sampled levels; buttons idle high through pull-ups
    prev_lock_level: Level,
    prev_unlock_level: Level,
    prev_door_switch_level: Level,
    /// Shared last-accepted-edge timestamp for all debounced inputs
    last_edge_ms: u32,
}

impl DoorSystem {
    pub fn new(
        gpio: Arc<dyn Gpio>,
        clock: Arc<dyn Clock>,
        vehicle: SharedVehicle,
        door_config: &DoorConfig,
        speed_config: &SpeedConfig,
    ) -> Self {
        Self {
            gpio,
            clock,
            vehicle,
            debounce_ms: door_config.debounce_ms,
            auto_lock_kmh: speed_config.auto_lock_kmh,
            prev_lock_level: Level::High,
            prev_unlock_level: Level::High,
            prev_door_switch_level: Level::High,
            last_edge_ms: 0,
        }
    }

    /// One sampling/evaluation pass. Returns whether the lock or
    /// ignition state changed in a way worth a display refresh.
    pub fn sample(&mut self) -> bool {
        let lock_level = self.gpio.read_digital(InputLine::LockButton);
        let unlock_level = self.gpio.read_digital(InputLine::UnlockButton);
        let ignition_level = self.gpio.read_digital(InputLine::Ignition);
        let door_level = self.gpio.read_digital(InputLine::DoorSwitch);
        let now_ms = self.clock.now_ms();

        let outcome = self.evaluate(lock_level, unlock_level, ignition_level, door_level, now_ms);

        // A denied shutoff consumes the whole pass; pending button and
        // door-switch edges stay armed and are honored once the denial
        // clears.
        let Some(changed) = outcome else {
            return false;
        };

        self.prev_lock_level = lock_level;
        self.prev_unlock_level = unlock_level;
        self.prev_door_switch_level = door_level;

        changed
    }

    fn evaluate(
        &mut self,
        lock_level: Level,
        unlock_level: Level,
        ignition_level: Level,
        door_level: Level,
        now_ms: u32,
    ) -> Option<bool> {
        // 1. Door switch level change; affects only the open state
        if door_level != self.prev_door_switch_level && self.debounce_elapsed(now_ms) {
            let open_state =
                if door_level.is_high() { DoorOpenState::Closed } else { DoorOpenState::Open };
            self.vehicle.write().door_open = open_state;
            self.last_edge_ms = now_ms;
            info!(door = open_state.as_str(), "door_switch_changed");
        }

        // 2. Ignition request against the gate rules
        let requested_on = ignition_level.is_high();
        let ignition_on = self.vehicle.read().ignition_on;
        if requested_on != ignition_on {
            if !requested_on {
                let speed = self.vehicle.read().speed;
                if speed > 0.0 {
                    // Cannot kill ignition while moving; not an error,
                    // the request is dropped for this cycle
                    info!(speed_kmh = speed, "ignition_off_denied_moving");
                    return None;
                }

                let forced_unlock = {
                    let mut state = self.vehicle.write();
                    state.ignition_on = false;
                    if state.lock_state != LockState::Unlocked {
                        state.lock_state = LockState::Unlocked;
                        state.manual_override = false;
                        true
                    } else {
                        false
                    }
                };
                info!(doors_unlocked = forced_unlock, "ignition_off");
                if forced_unlock {
                    return Some(true);
                }
            } else {
                let gear = self.vehicle.read().gear;
                if gear == Gear::Park {
                    self.vehicle.write().ignition_on = true;
                    info!("ignition_on");
                } else {
                    // Request downgraded; line says on, gate keeps off
                    info!(gear = gear.as_str(), "ignition_on_denied_not_park");
                }
            }
        }

        // 3. Lock button press (falling edge)
        if lock_level == Level::Low
            && self.prev_lock_level == Level::High
            && self.debounce_elapsed(now_ms)
            && self.vehicle.read().lock_state != LockState::Locked
        {
            {
                let mut state = self.vehicle.write();
                state.lock_state = LockState::Locked;
                state.manual_override = true;
            }
            self.last_edge_ms = now_ms;
            info!(manual = true, "doors_locked");
            return Some(true);
        }

        // 4. Unlock button press (falling edge)
        if unlock_level == Level::Low
            && self.prev_unlock_level == Level::High
            && self.debounce_elapsed(now_ms)
            && self.vehicle.read().lock_state != LockState::Unlocked
        {
            {
                let mut state = self.vehicle.write();
                state.lock_state = LockState::Unlocked;
                // A rolling unlock is deliberate and must hold against
                // auto-lock; at standstill auto-lock stays armed
                state.manual_override = state.speed > 0.0;
            }
            self.last_edge_ms = now_ms;
            info!(manual = true, "doors_unlocked");
            return Some(true);
        }

        // 5. Speed-based auto-lock
        {
            let state = self.vehicle.read();
            if !state.manual_override
                && state.ignition_on
                && state.speed > self.auto_lock_kmh
                && state.lock_state != LockState::Locked
            {
                drop(state);
                self.vehicle.write().lock_state = LockState::Locked;
                info!(manual = false, "doors_locked");
                return Some(true);
            }
        }

        Some(false)
    }

    fn debounce_elapsed(&self, now_ms: u32) -> bool {
        if ticks_elapsed(now_ms, self.last_edge_ms) > self.debounce_ms {
            true
        } else {
            debug!(
                elapsed_ms = ticks_elapsed(now_ms, self.last_edge_ms),
                window_ms = self.debounce_ms,
                "edge_debounced"
            );
            false
        }
    }

    pub fn lock_state(&self) -> LockState {
        self.vehicle.read().lock_state
    }

    pub fn open_state(&self) -> DoorOpenState {
        self.vehicle.read().door_open
    }

    pub fn set_lock_state(&self, state: LockState) {
        self.vehicle.write().lock_state = state;
    }

    pub fn is_ignition_on(&self) -> bool {
        self.vehicle.read().ignition_on
    }

    pub fn manual_override(&self) -> bool {
        self.vehicle.read().manual_override
    }

    pub fn clear_manual_override(&self) {
        self.vehicle.write().manual_override = false;
    }
}
