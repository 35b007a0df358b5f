//! Configuration loading from TOML files
//!
//! Defaults mirror the compiled-in thresholds of the original safety
//! unit, so a missing or partial config file still yields a working
//! system. Config file is selected via:
//! 1. --config <path> command line argument
//! 2. Default: config/dev.toml

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct SpeedConfig {
    /// Full-scale speed the calibrated analog range maps to (km/h)
    #[serde(default = "default_max_kmh")]
    pub max_kmh: f32,
    /// Speed cap applied while in reverse (km/h)
    #[serde(default = "default_reverse_limit_kmh")]
    pub reverse_limit_kmh: f32,
    /// Gear selection changes are accepted at or below this speed
    #[serde(default = "default_gear_change_kmh")]
    pub gear_change_kmh: f32,
    /// Auto-lock engages above this speed
    #[serde(default = "default_auto_lock_kmh")]
    pub auto_lock_kmh: f32,
    /// Manual override re-arms when speed drops to or below this
    #[serde(default = "default_override_rearm_kmh")]
    pub override_rearm_kmh: f32,
}

fn default_max_kmh() -> f32 {
    100.0
}

fn default_reverse_limit_kmh() -> f32 {
    30.0
}

fn default_gear_change_kmh() -> f32 {
    5.0
}

fn default_auto_lock_kmh() -> f32 {
    20.0
}

fn default_override_rearm_kmh() -> f32 {
    20.0
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            max_kmh: default_max_kmh(),
            reverse_limit_kmh: default_reverse_limit_kmh(),
            gear_change_kmh: default_gear_change_kmh(),
            auto_lock_kmh: default_auto_lock_kmh(),
            override_rearm_kmh: default_override_rearm_kmh(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoorConfig {
    /// Shared debounce window for lock/unlock buttons and door switch
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
}

fn default_debounce_ms() -> u32 {
    50
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UltrasonicConfig {
    #[serde(default = "default_safe_cm")]
    pub safe_cm: f32,
    #[serde(default = "default_caution_cm")]
    pub caution_cm: f32,
    /// Measured distance is clamped here
    #[serde(default = "default_max_cm")]
    pub max_cm: f32,
    /// Bound on each of the two echo spin-waits
    #[serde(default = "default_echo_timeout_us")]
    pub echo_timeout_us: u64,
    #[serde(default = "default_trigger_pulse_us")]
    pub trigger_pulse_us: u64,
    /// Buzzer toggle intervals per tier (ms)
    #[serde(default = "default_safe_beep_ms")]
    pub safe_beep_ms: u32,
    #[serde(default = "default_caution_beep_ms")]
    pub caution_beep_ms: u32,
    #[serde(default = "default_danger_beep_ms")]
    pub danger_beep_ms: u32,
}

fn default_safe_cm() -> f32 {
    100.0
}

fn default_caution_cm() -> f32 {
    30.0
}

fn default_max_cm() -> f32 {
    150.0
}

fn default_echo_timeout_us() -> u64 {
    100_000
}

fn default_trigger_pulse_us() -> u64 {
    10
}

fn default_safe_beep_ms() -> u32 {
    1000
}

fn default_caution_beep_ms() -> u32 {
    500
}

fn default_danger_beep_ms() -> u32 {
    200
}

impl Default for UltrasonicConfig {
    fn default() -> Self {
        Self {
            safe_cm: default_safe_cm(),
            caution_cm: default_caution_cm(),
            max_cm: default_max_cm(),
            echo_timeout_us: default_echo_timeout_us(),
            trigger_pulse_us: default_trigger_pulse_us(),
            safe_beep_ms: default_safe_beep_ms(),
            caution_beep_ms: default_caution_beep_ms(),
            danger_beep_ms: default_danger_beep_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TasksConfig {
    #[serde(default = "default_door_poll_ms")]
    pub door_poll_ms: u64,
    #[serde(default = "default_gear_poll_ms")]
    pub gear_poll_ms: u64,
    #[serde(default = "default_speed_poll_ms")]
    pub speed_poll_ms: u64,
    #[serde(default = "default_ultrasonic_poll_ms")]
    pub ultrasonic_poll_ms: u64,
    #[serde(default = "default_ignition_poll_ms")]
    pub ignition_poll_ms: u64,
    #[serde(default = "default_display_refresh_ms")]
    pub display_refresh_ms: u64,
    /// How long door/ignition status messages hold row 0
    #[serde(default = "default_door_status_hold_ms")]
    pub door_status_hold_ms: u32,
    #[serde(default = "default_ignition_status_hold_ms")]
    pub ignition_status_hold_ms: u32,
}

fn default_door_poll_ms() -> u64 {
    100
}

fn default_gear_poll_ms() -> u64 {
    50
}

fn default_speed_poll_ms() -> u64 {
    100
}

fn default_ultrasonic_poll_ms() -> u64 {
    100
}

fn default_ignition_poll_ms() -> u64 {
    100
}

fn default_display_refresh_ms() -> u64 {
    1000
}

fn default_door_status_hold_ms() -> u32 {
    2000
}

fn default_ignition_status_hold_ms() -> u32 {
    1000
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            door_poll_ms: default_door_poll_ms(),
            gear_poll_ms: default_gear_poll_ms(),
            speed_poll_ms: default_speed_poll_ms(),
            ultrasonic_poll_ms: default_ultrasonic_poll_ms(),
            ignition_poll_ms: default_ignition_poll_ms(),
            display_refresh_ms: default_display_refresh_ms(),
            door_status_hold_ms: default_door_status_hold_ms(),
            ignition_status_hold_ms: default_ignition_status_hold_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub speed: SpeedConfig,
    #[serde(default)]
    pub door: DoorConfig,
    #[serde(default)]
    pub ultrasonic: UltrasonicConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone, Default)]
pub struct Config {
    speed: SpeedConfig,
    door: DoorConfig,
    ultrasonic: UltrasonicConfig,
    tasks: TasksConfig,
    config_file: String,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            speed: toml_config.speed,
            door: toml_config.door,
            ultrasonic: toml_config.ultrasonic,
            tasks: toml_config.tasks,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {e:#}. Using defaults.");
                Self::default()
            }
        }
    }

    pub fn speed(&self) -> &SpeedConfig {
        &self.speed
    }

    pub fn door(&self) -> &DoorConfig {
        &self.door
    }

    pub fn ultrasonic(&self) -> &UltrasonicConfig {
        &self.ultrasonic
    }

    pub fn tasks(&self) -> &TasksConfig {
        &self.tasks
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to shrink the debounce window
    #[cfg(test)]
    pub fn with_debounce_ms(mut self, ms: u32) -> Self {
        self.door.debounce_ms = ms;
        self
    }
}
