//! Value types shared by the aggregator, the broadcaster and the HTTP layer.
//!
//! All types serialize with camelCase field names, which is the shape the
//! REST and WebSocket clients consume.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A decoded temperature reading.
///
/// Produced once by the frame decoder and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Reading {
    /// Sensor id (0-63).
    pub sensor_id: u8,
    /// Temperature in degrees Celsius (0-255).
    pub temperature: u8,
    /// Capture time in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl Reading {
    /// Create a reading.
    pub fn new(sensor_id: u8, temperature: u8, timestamp: u64) -> Self {
        Self {
            sensor_id,
            temperature,
            timestamp,
        }
    }
}

/// Aggregate statistics across all sensors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SensorStats {
    /// Number of distinct sensor ids seen so far.
    pub active_sensor_count: usize,
    /// Throughput over the trailing rate window, rounded to 2 decimals.
    pub average_messages_per_minute: f64,
}

/// Per-sensor summary.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SensorSummary {
    /// Sensor id.
    pub sensor_id: u8,
    /// Lifetime mean temperature, rounded to 2 decimals.
    pub average_temperature: f64,
    /// Lifetime number of readings.
    pub reading_count: u64,
    /// Temperature of the newest retained reading.
    pub last_reading: Option<u8>,
    /// Timestamp of the newest retained reading.
    pub last_timestamp: Option<u64>,
}

/// Per-sensor summary plus the retained history, oldest first.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorDetail {
    /// Per-sensor summary, flattened into the same JSON object.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub summary: SensorSummary,
    /// Retained readings, oldest first.
    pub readings: Vec<Reading>,
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    u64::try_from(nanos / 1_000_000).unwrap_or(0)
}
