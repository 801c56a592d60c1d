//! Domain models - telemetry packets and inbound commands
//!
//! This module contains the data types the device emits and receives:
//! - `SensorPacket` - the rolling synthetic sensor reading
//! - `InfoBoardPacket` - the static board info published once after connect
//! - `Command` - an application command received from the platform

pub mod command;
pub mod packet;

// Re-export commonly used types at module level
pub use command::{Command, CommandAction};
pub use packet::{InfoBoardPacket, SensorPacket};
