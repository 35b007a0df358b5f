//! Integration tests for configuration loading

use safety_core::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[speed]
max_kmh = 120.0
reverse_limit_kmh = 25.0
auto_lock_kmh = 15.0

[door]
debounce_ms = 30

[ultrasonic]
safe_cm = 90.0
caution_cm = 40.0
danger_beep_ms = 150

[tasks]
gear_poll_ms = 25
door_status_hold_ms = 1500
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.speed().max_kmh, 120.0);
    assert_eq!(config.speed().reverse_limit_kmh, 25.0);
    assert_eq!(config.speed().auto_lock_kmh, 15.0);
    // Omitted keys keep their defaults
    assert_eq!(config.speed().gear_change_kmh, 5.0);
    assert_eq!(config.door().debounce_ms, 30);
    assert_eq!(config.ultrasonic().safe_cm, 90.0);
    assert_eq!(config.ultrasonic().caution_cm, 40.0);
    assert_eq!(config.ultrasonic().danger_beep_ms, 150);
    assert_eq!(config.ultrasonic().safe_beep_ms, 1000);
    assert_eq!(config.tasks().gear_poll_ms, 25);
    assert_eq!(config.tasks().door_status_hold_ms, 1500);
    assert_eq!(config.tasks().display_refresh_ms, 1000);
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.speed().auto_lock_kmh, 20.0);
    assert_eq!(config.door().debounce_ms, 50);
    assert_eq!(config.ultrasonic().max_cm, 150.0);
}

#[test]
fn test_invalid_toml_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[speed\nmax_kmh = ").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}
