//! Domain models - vehicle state types shared across the interlock services
//!
//! This module contains the canonical data types used throughout the system:
//! - `Gear` - discrete gear selection (Drive / Reverse / Park)
//! - `LockState` / `DoorOpenState` - door lock and door open state
//! - `AlertTier` - parking-proximity alert zone derived from distance
//! - `VehicleState` - the shared state hub every periodic task reads from

pub mod types;
pub mod vehicle;

// Re-export commonly used types at module level
pub use types::{AlertTier, DoorOpenState, Gear, LockState};
pub use vehicle::{SharedVehicle, VehicleState};
