//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `mqtt` - MQTT session with the IoT platform (publish + command subscribe)
//! - `publisher` - periodic telemetry publisher
//! - `keepalive` - routeless HTTP listener for the platform's process supervisor

pub mod keepalive;
pub mod mqtt;
pub mod publisher;

// Re-export commonly used types
pub use keepalive::start_keepalive_server;
pub use mqtt::PlatformSession;
pub use publisher::TelemetryPublisher;
