//! Wire format and value types for 2-byte temperature telemetry frames.
//!
//! This crate has no runtime dependencies beyond serialization and is shared
//! by the aggregation core (thermo-core) and the HTTP/WebSocket service
//! (thermo-service).
//!
//! # Features
//!
//! - Frame decoding and encoding for the 2-byte wire format
//! - Value types for readings and per-sensor summaries
//! - Error types for diagnostics on rejected frames
//!
//! # Example
//!
//! ```
//! use thermo_types::{decode_one, Reading};
//!
//! let reading: Reading = decode_one(&[0xA1, 0x10], 0).unwrap();
//! assert_eq!(reading.sensor_id, 33);
//! assert_eq!(reading.temperature, 16);
//!
//! // Type-1 frames are filtered out.
//! assert!(decode_one(&[0x73, 0x0F], 0).is_none());
//! ```

pub mod error;
pub mod frame;
pub mod types;

pub use error::{FrameError, FrameResult};
pub use frame::{
    FRAME_LEN, Frame, MAX_SENSOR_ID, MessageType, decode_one, decode_one_at, decode_stream,
    decode_stream_at,
};
pub use types::{Reading, SensorDetail, SensorStats, SensorSummary, now_millis};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_serialization_uses_camel_case() {
        let reading = Reading::new(33, 16, 1_700_000_000_000);
        let json = serde_json::to_value(reading).unwrap();

        assert_eq!(json["sensorId"], 33);
        assert_eq!(json["temperature"], 16);
        assert_eq!(json["timestamp"], 1_700_000_000_000u64);
    }

    #[test]
    fn test_reading_deserialization() {
        let reading: Reading =
            serde_json::from_str(r#"{"sensorId":5,"temperature":21,"timestamp":42}"#).unwrap();
        assert_eq!(reading, Reading::new(5, 21, 42));
    }

    #[test]
    fn test_stats_serialization() {
        let stats = SensorStats {
            active_sensor_count: 3,
            average_messages_per_minute: 12.5,
        };
        let json = serde_json::to_value(stats).unwrap();

        assert_eq!(json["activeSensorCount"], 3);
        assert_eq!(json["averageMessagesPerMinute"], 12.5);
    }

    #[test]
    fn test_summary_serializes_missing_last_reading_as_null() {
        let summary = SensorSummary {
            sensor_id: 7,
            average_temperature: 0.0,
            reading_count: 0,
            last_reading: None,
            last_timestamp: None,
        };
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["sensorId"], 7);
        assert!(json["lastReading"].is_null());
        assert!(json["lastTimestamp"].is_null());
    }

    #[test]
    fn test_detail_flattens_summary() {
        let detail = SensorDetail {
            summary: SensorSummary {
                sensor_id: 2,
                average_temperature: 21.33,
                reading_count: 3,
                last_reading: Some(22),
                last_timestamp: Some(99),
            },
            readings: vec![Reading::new(2, 22, 99)],
        };
        let json = serde_json::to_value(&detail).unwrap();

        assert_eq!(json["sensorId"], 2);
        assert_eq!(json["averageTemperature"], 21.33);
        assert_eq!(json["readingCount"], 3);
        assert_eq!(json["lastReading"], 22);
        assert_eq!(json["readings"][0]["temperature"], 22);
        assert!(json.get("summary").is_none());
    }

    #[test]
    fn test_now_millis_is_recent() {
        // 2023-11-14 in milliseconds
        assert!(now_millis() > 1_700_000_000_000);
    }
}
