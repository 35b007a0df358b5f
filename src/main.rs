//! Safety core - vehicle interlock and sensor-fusion engine
//!
//! Coordinates door locking, ignition gating, gear selection, speed
//! estimation and reverse parking assistance as periodic tokio tasks
//! over a shared vehicle state hub.
//!
//! Module structure:
//! - `domain/` - Core vehicle types and the shared state hub
//! - `io/` - Hardware seams (GPIO, clock, display) plus mocks
//! - `services/` - Subsystem logic (door, gear, speed, ultrasonic)
//! - `infra/` - Configuration
//! - `tasks` - Periodic monitor loops

use clap::Parser;
use parking_lot::Mutex;
use safety_core::domain::vehicle;
use safety_core::infra::Config;
use safety_core::io::{Clock, Gpio, MockGpio, MonotonicClock, SharedDisplay, TracingDisplay};
use safety_core::services::{DoorSystem, GearSelector, Ranger, SpeedEstimator};
use safety_core::tasks::{
    DisplayRefresh, DoorLockMonitor, DoorOpenMonitor, GearMonitor, IgnitionMonitor, SpeedMonitor,
    UltrasonicMonitor,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Safety core - vehicle interlock and sensor-fusion engine
#[derive(Parser, Debug)]
#[command(name = "safety-core", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("safety-core starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        auto_lock_kmh = %config.speed().auto_lock_kmh,
        reverse_limit_kmh = %config.speed().reverse_limit_kmh,
        gear_change_kmh = %config.speed().gear_change_kmh,
        debounce_ms = %config.door().debounce_ms,
        safe_cm = %config.ultrasonic().safe_cm,
        caution_cm = %config.ultrasonic().caution_cm,
        "config_loaded"
    );

    // Hardware seams. The default binary runs against the in-memory
    // fabric; a target port supplies its own Gpio implementation here.
    let gpio: Arc<dyn Gpio> = Arc::new(MockGpio::new());
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let display: SharedDisplay = Arc::new(Mutex::new(TracingDisplay::new()));
    let hub = vehicle::new_shared();

    let door = DoorSystem::new(
        gpio.clone(),
        clock.clone(),
        hub.clone(),
        config.door(),
        config.speed(),
    );
    let estimator = SpeedEstimator::new(gpio.clone(), hub.clone(), config.speed());
    let selector = GearSelector::new(gpio.clone(), hub.clone(), config.speed().gear_change_kmh);
    let ranger = Ranger::new(gpio.clone(), clock.clone(), hub.clone(), config.ultrasonic());

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut monitors = Vec::new();

    let door_lock = DoorLockMonitor::new(door, display.clone(), clock.clone(), config.tasks());
    monitors.push(tokio::spawn(door_lock.run(shutdown_rx.clone())));

    let door_open = DoorOpenMonitor::new(
        gpio.clone(),
        display.clone(),
        hub.clone(),
        clock.clone(),
        config.tasks(),
    );
    monitors.push(tokio::spawn(door_open.run(shutdown_rx.clone())));

    let speed = SpeedMonitor::new(estimator, hub.clone(), &config);
    monitors.push(tokio::spawn(speed.run(shutdown_rx.clone())));

    let gear = GearMonitor::new(selector, display.clone(), hub.clone(), config.tasks());
    monitors.push(tokio::spawn(gear.run(shutdown_rx.clone())));

    let ultrasonic = UltrasonicMonitor::new(ranger, display.clone(), hub.clone(), &config);
    monitors.push(tokio::spawn(ultrasonic.run(shutdown_rx.clone())));

    let ignition = IgnitionMonitor::new(display.clone(), hub.clone(), clock.clone(), config.tasks());
    monitors.push(tokio::spawn(ignition.run(shutdown_rx.clone())));

    let refresh = DisplayRefresh::new(display.clone(), hub.clone(), config.tasks());
    monitors.push(tokio::spawn(refresh.run(shutdown_rx)));

    info!(monitor_count = monitors.len(), "monitors_started");

    // Handle shutdown on Ctrl+C
    tokio::signal::ctrl_c().await.ok();
    info!("shutdown_signal_received");
    let _ = shutdown_tx.send(true);

    for monitor in monitors {
        let _ = monitor.await;
    }

    info!("safety-core shutdown complete");
    Ok(())
}
