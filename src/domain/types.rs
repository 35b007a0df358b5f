//! Shared types for the safety interlock core

/// Discrete gear selection derived from the two gear switch lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gear {
    Drive,
    Reverse,
    Park,
}

impl Gear {
    pub fn as_str(&self) -> &str {
        match self {
            Gear::Drive => "drive",
            Gear::Reverse => "reverse",
            Gear::Park => "park",
        }
    }

    /// Single-character indicator shown at the right edge of display row 0
    pub fn letter(&self) -> &str {
        match self {
            Gear::Drive => "D",
            Gear::Reverse => "R",
            Gear::Park => "P",
        }
    }
}

/// Door lock state; transitions only via explicit set, never implicit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked,
}

impl LockState {
    pub fn as_str(&self) -> &str {
        match self {
            LockState::Unlocked => "unlocked",
            LockState::Locked => "locked",
        }
    }
}

/// Door open/closed state as last debounced reading of the door switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorOpenState {
    Closed,
    Open,
}

impl DoorOpenState {
    pub fn as_str(&self) -> &str {
        match self {
            DoorOpenState::Closed => "closed",
            DoorOpenState::Open => "open",
        }
    }
}

/// Parking-proximity alert zone, descending by distance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTier {
    Safe,
    Caution,
    Danger,
}

impl AlertTier {
    /// Classify a measured distance into an alert tier.
    ///
    /// A reading of exactly 0 means "no/invalid echo" and maps to no
    /// tier at all (all alert outputs off), not "very close".
    pub fn from_distance(distance_cm: f32, safe_cm: f32, caution_cm: f32) -> Option<Self> {
        if distance_cm <= 0.0 {
            None
        } else if distance_cm > safe_cm {
            Some(AlertTier::Safe)
        } else if distance_cm > caution_cm {
            Some(AlertTier::Caution)
        } else {
            Some(AlertTier::Danger)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AlertTier::Safe => "safe",
            AlertTier::Caution => "caution",
            AlertTier::Danger => "danger",
        }
    }
}
