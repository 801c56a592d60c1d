//! Synthetic sensor packet emitted on every publish tick
//!
//! The packet is created once at startup and mutated in place: each tick the
//! current values are published, then the fields are stepped. A field is reset
//! to zero only when it is exactly 100 *before* stepping, so a field whose
//! step does not land it on 100 will walk past the bound and never reset.
//! This matches the behavior of the device firmware the packet emulates.

use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Value at which a field wraps back to zero before the next step
const RESET_POINT: i64 = 100;

const TEMPERATURE_STEP: i64 = 20;
const HUMIDITY_STEP: i64 = 2;
const PRESSURE_STEP: i64 = 2;

/// The four sensor fields carried under the `d` key of the envelope
#[derive(Debug, Clone, Serialize)]
pub struct SensorReadings {
    pub temperature: i64,
    pub pressure: i64,
    pub humidity: i64,
    pub luminosity: i64,
}

/// Rolling sensor packet: `{"d": {...}, "ts": "<RFC 3339>"}`
#[derive(Debug, Clone, Serialize)]
pub struct SensorPacket {
    pub d: SensorReadings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
}

impl Default for SensorPacket {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPacket {
    /// Initial field values before the first tick
    pub fn new() -> Self {
        Self {
            d: SensorReadings { temperature: 0, pressure: 50, humidity: 10, luminosity: 5 },
            ts: None,
        }
    }

    /// Refresh the timestamp with the current wall clock
    pub fn stamp(&mut self) {
        self.stamp_at(OffsetDateTime::now_utc());
    }

    /// Refresh the timestamp from an explicit instant
    pub fn stamp_at(&mut self, now: OffsetDateTime) {
        if let Ok(ts) = now.format(&Rfc3339) {
            self.ts = Some(ts);
        }
    }

    /// Step the fields for the next tick
    ///
    /// Luminosity is intentionally never stepped.
    pub fn advance(&mut self) {
        step_field(&mut self.d.temperature, TEMPERATURE_STEP);
        step_field(&mut self.d.humidity, HUMIDITY_STEP);
        step_field(&mut self.d.pressure, PRESSURE_STEP);
    }
}

/// Reset-then-step. The reset fires only when the value sits exactly on the
/// reset point, so overshooting values keep climbing.
fn step_field(value: &mut i64, step: i64) {
    if *value == RESET_POINT {
        *value = 0;
    }
    *value += step;
}

/// Board info payload under the `d` key
#[derive(Debug, Clone, Serialize)]
pub struct BoardInfo {
    pub pinsboard: u32,
    pub voltageboard: u32,
}

/// Static info-board packet published once after connecting.
/// Carries no timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct InfoBoardPacket {
    pub d: BoardInfo,
}

impl Default for InfoBoardPacket {
    fn default() -> Self {
        Self::new()
    }
}

impl InfoBoardPacket {
    pub fn new() -> Self {
        Self { d: BoardInfo { pinsboard: 42, voltageboard: 5 } }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    /// Publish-then-advance, collecting the published values of one field
    fn published_sequence(field: fn(&SensorPacket) -> i64, ticks: usize) -> Vec<i64> {
        let mut packet = SensorPacket::new();
        let mut out = Vec::with_capacity(ticks);
        for _ in 0..ticks {
            out.push(field(&packet));
            packet.advance();
        }
        out
    }

    #[test]
    fn test_temperature_sequence_resets_after_hundred() {
        let seq = published_sequence(|p| p.d.temperature, 9);
        assert_eq!(seq, vec![0, 20, 40, 60, 80, 100, 20, 40, 60]);
    }

    #[test]
    fn test_humidity_sequence() {
        let seq = published_sequence(|p| p.d.humidity, 48);
        assert_eq!(seq[0], 10);
        assert_eq!(seq[1], 12);
        // 10 + 2*45 = 100 on tick index 45, then the reset-then-step yields 2
        assert_eq!(seq[45], 100);
        assert_eq!(seq[46], 2);
        assert_eq!(seq[47], 4);
    }

    #[test]
    fn test_pressure_sequence() {
        let seq = published_sequence(|p| p.d.pressure, 28);
        assert_eq!(seq[0], 50);
        // 50 + 2*25 = 100 on tick index 25
        assert_eq!(seq[25], 100);
        assert_eq!(seq[26], 2);
    }

    #[test]
    fn test_luminosity_never_steps() {
        let seq = published_sequence(|p| p.d.luminosity, 10);
        assert!(seq.iter().all(|&v| v == 5));
    }

    #[test]
    fn test_reset_only_fires_on_exact_hundred() {
        let mut packet = SensorPacket::new();
        packet.d.temperature = 90;
        packet.advance();
        assert_eq!(packet.d.temperature, 110);
        // past the reset point and climbing
        packet.advance();
        assert_eq!(packet.d.temperature, 130);
    }

    #[test]
    fn test_packet_json_shape() {
        let mut packet = SensorPacket::new();
        packet.stamp_at(datetime!(2026-08-06 12:00:00 UTC));

        let value = serde_json::to_value(&packet).unwrap();
        let d = value.get("d").and_then(|d| d.as_object()).unwrap();
        assert_eq!(d.len(), 4);
        for field in ["temperature", "pressure", "humidity", "luminosity"] {
            assert!(d.contains_key(field), "missing field {field}");
        }

        let ts = value.get("ts").and_then(|ts| ts.as_str()).unwrap();
        assert!(OffsetDateTime::parse(ts, &Rfc3339).is_ok(), "ts not RFC 3339: {ts}");
    }

    #[test]
    fn test_unstamped_packet_has_no_ts_key() {
        let packet = SensorPacket::new();
        let value = serde_json::to_value(&packet).unwrap();
        assert!(value.get("ts").is_none());
    }

    #[test]
    fn test_infoboard_packet_json() {
        let value = serde_json::to_value(InfoBoardPacket::new()).unwrap();
        assert_eq!(value["d"]["pinsboard"], 42);
        assert_eq!(value["d"]["voltageboard"], 5);
        assert!(value.get("ts").is_none());
    }

    #[test]
    fn test_stamp_refreshes_timestamp() {
        let mut packet = SensorPacket::new();
        packet.stamp_at(datetime!(2026-08-06 12:00:00 UTC));
        let first = packet.ts.clone().unwrap();
        packet.stamp_at(datetime!(2026-08-06 12:00:03 UTC));
        let second = packet.ts.clone().unwrap();
        assert_ne!(first, second);
    }
}
