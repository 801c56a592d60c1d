//! Periodic telemetry publisher
//!
//! Waits for the platform to accept the session, publishes the static
//! info-board packet once, then emits the rolling sensor packet on a fixed
//! interval. The packet is published first and stepped after, so the values
//! on the wire for tick n are the values before the nth step.

use crate::domain::packet::{InfoBoardPacket, SensorPacket};
use crate::io::mqtt::PlatformSession;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Event id for the rolling sensor packet
pub const STATUS_EVENT: &str = "status";
/// Event id for the one-shot board info packet
pub const INFOBOARD_EVENT: &str = "infoboard";
/// Wire format of both events
pub const EVENT_FORMAT: &str = "json";

/// Publisher actor owning the rolling packet state
pub struct TelemetryPublisher {
    session: PlatformSession,
    interval: Duration,
    packet: SensorPacket,
}

impl TelemetryPublisher {
    pub fn new(session: PlatformSession, interval_ms: u64) -> Self {
        Self { session, interval: Duration::from_millis(interval_ms), packet: SensorPacket::new() }
    }

    /// Run until shutdown
    ///
    /// Blocks on the connected signal before the first publish; the signal
    /// only ever flips false -> true, so a broker re-ack cannot restart the
    /// interval.
    pub async fn run(
        mut self,
        mut connected: watch::Receiver<bool>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        while !*connected.borrow() {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
                changed = connected.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }

        info!(interval_ms = %self.interval.as_millis(), "telemetry_publisher_started");
        self.publish_infoboard().await;

        let mut interval = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("telemetry_publisher_shutdown");
                        return;
                    }
                }
                _ = interval.tick() => {
                    self.publish_status().await;
                }
            }
        }
    }

    /// One-shot board info publish, fired right after connect
    async fn publish_infoboard(&self) {
        if let Ok(json) = serde_json::to_string(&InfoBoardPacket::new()) {
            if let Err(e) =
                self.session.publish_event(INFOBOARD_EVENT, EVENT_FORMAT, json.as_bytes()).await
            {
                error!(error = %e, "infoboard_publish_failed");
            }
        }
    }

    /// Stamp, publish, then step the packet fields
    async fn publish_status(&mut self) {
        self.packet.stamp();
        if let Ok(json) = serde_json::to_string(&self.packet) {
            debug!(packet = %json, "status_packet");
            if let Err(e) =
                self.session.publish_event(STATUS_EVENT, EVENT_FORMAT, json.as_bytes()).await
            {
                error!(error = %e, "status_publish_failed");
            }
        }
        self.packet.advance();
    }
}
