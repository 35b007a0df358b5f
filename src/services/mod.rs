//! Services - the interlock state machines
//!
//! This module contains the core safety logic:
//! - `speed` - self-calibrating analog-to-km/h estimation
//! - `gear` - gear selection from the switch lines, speed-gated
//! - `door` - ignition gate plus door lock/unlock state machine
//! - `ultrasonic` - echo-timed ranging and tiered parking alerts

pub mod door;
pub mod gear;
pub mod speed;
pub mod ultrasonic;

// Re-export commonly used types
pub use door::DoorSystem;
pub use gear::GearSelector;
pub use speed::{ObservedRangeMap, SpeedEstimator, SpeedMap};
pub use ultrasonic::Ranger;
