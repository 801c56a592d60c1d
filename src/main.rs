//! Device PoC - device-side telemetry agent
//!
//! Connects to the cloud IoT platform over MQTT, publishes synthetic sensor
//! readings on a fixed interval, and logs commands received from
//! applications.
//!
//! Module structure:
//! - `domain/` - Telemetry packets and inbound command model
//! - `io/` - External interfaces (MQTT session, publisher, keepalive HTTP)
//! - `infra/` - Infrastructure (Config)

use clap::Parser;
use device_poc::infra::Config;
use device_poc::io::{start_keepalive_server, PlatformSession, TelemetryPublisher};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Device PoC - IoT platform device-side telemetry agent
#[derive(Parser, Debug)]
#[command(name = "device-poc", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug to log every emitted packet
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(git_hash = env!("GIT_HASH"), "device-poc starting");

    let args = Args::parse();

    // TOML file (if present) plus IOTF_* / PORT environment overrides
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        org = %config.org(),
        device_id = %config.device_id(),
        device_type = %config.device_type(),
        broker_host = %config.broker_host(),
        broker_port = %config.broker_port(),
        qos = %config.qos(),
        publish_interval_ms = %config.publish_interval_ms(),
        keepalive_port = %config.keepalive_port(),
        "config_loaded"
    );

    // Create shutdown and connected signals
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (connected_tx, connected_rx) = watch::channel(false);

    // Start keepalive HTTP listener (bind failure is logged, not fatal)
    let keepalive_port = config.keepalive_port();
    let keepalive_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        start_keepalive_server(keepalive_port, keepalive_shutdown).await;
    });

    // Connect to the platform; the event loop driver exits the process on
    // any broker error
    let session = PlatformSession::connect(&config, connected_tx, shutdown_rx.clone()).await?;

    // Start the periodic publisher; it waits for the connected signal
    let publisher = TelemetryPublisher::new(session, config.publish_interval_ms());
    let publisher_shutdown = shutdown_rx.clone();
    let publisher_task = tokio::spawn(async move {
        publisher.run(connected_rx, publisher_shutdown).await;
    });

    // Handle shutdown on Ctrl+C
    tokio::signal::ctrl_c().await.ok();
    info!("shutdown_signal_received");
    let _ = shutdown_tx.send(true);
    publisher_task.await.ok();

    info!("device-poc shutdown complete");
    Ok(())
}
