//! Shared vehicle state hub
//!
//! Every scalar the periodic tasks exchange (speed, gear, ignition,
//! door state) lives in one `VehicleState` behind a `parking_lot`
//! RwLock. Each field has exactly one writer service; all other tasks
//! go through read guards. Writers take the lock for the minimum span
//! around a single field update, so cross-subsystem reads are
//! eventually consistent within one polling interval.

use crate::domain::types::{DoorOpenState, Gear, LockState};
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct VehicleState {
    /// km/h, written only by the speed estimator
    pub speed: f32,
    /// written only by the gear selector
    pub gear: Gear,
    /// written only by the door system's ignition gate
    pub ignition_on: bool,
    pub lock_state: LockState,
    pub door_open: DoorOpenState,
    /// Suppresses auto-lock/auto-unlock after a deliberate user action
    pub manual_override: bool,
    /// cm, valid only while in reverse; 0 means no/invalid echo
    pub distance: f32,
}

impl Default for VehicleState {
    fn default() -> Self {
        // Power-on defaults of the original unit: ignition on, gear in
        // Drive, doors closed and unlocked.
        VehicleState {
            speed: 0.0,
            gear: Gear::Drive,
            ignition_on: true,
            lock_state: LockState::Unlocked,
            door_open: DoorOpenState::Closed,
            manual_override: false,
            distance: 0.0,
        }
    }
}

pub type SharedVehicle = Arc<RwLock<VehicleState>>;

pub fn new_shared() -> SharedVehicle {
    Arc::new(RwLock::new(VehicleState::default()))
}

/// Consistent point-in-time copy for display/logging
pub fn snapshot(vehicle: &SharedVehicle) -> VehicleState {
    vehicle.read().clone()
}
