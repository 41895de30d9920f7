//! Per-sensor statistics built from the raw telemetry byte stream.
//!
//! The [`Aggregator`] accepts arbitrary byte chunks, which may split a frame
//! across two deliveries. It keeps at most one residual byte between calls,
//! decodes complete frames, folds each reading into its [`SensorRecord`] and
//! the throughput [`RateWindow`], and hands the reading to a [`ReadingSink`].
//!
//! Malformed or filtered frames never cause an error; they simply produce no
//! reading. Queries only distinguish known and unknown sensor ids. Range
//! checks on ids belong to the caller.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use thermo_core::{Aggregator, NullSink};
//!
//! let mut aggregator = Aggregator::new(Arc::new(NullSink));
//! aggregator.ingest(&[0xA1]);
//! aggregator.ingest(&[0x10]);
//!
//! let sensor = aggregator.sensor(33).unwrap();
//! assert_eq!(sensor.summary.reading_count, 1);
//! assert_eq!(sensor.summary.last_reading, Some(16));
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use tracing::trace;

use thermo_types::{
    FRAME_LEN, Reading, SensorDetail, SensorStats, SensorSummary, decode_one_at, decode_stream_at,
};

use crate::clock::{Clock, SystemClock};
use crate::events::{NullSink, ReadingSink};
use crate::window::{RATE_WINDOW_MS, RateWindow};

/// Maximum number of readings retained per sensor.
pub const HISTORY_CAPACITY: usize = 100;

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Aggregate state for one sensor.
///
/// The history is bounded to [`HISTORY_CAPACITY`] entries, but the sum and
/// count cover every reading ever received, so the average stays exact after
/// eviction.
#[derive(Debug, Clone, Default)]
pub struct SensorRecord {
    history: VecDeque<Reading>,
    total_sum: u64,
    total_count: u64,
}

impl SensorRecord {
    fn push(&mut self, reading: Reading) {
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(reading);
        self.total_sum += u64::from(reading.temperature);
        self.total_count += 1;
    }

    /// Retained readings, oldest first.
    pub fn history(&self) -> &VecDeque<Reading> {
        &self.history
    }

    /// Sum of every temperature ever received.
    pub fn total_sum(&self) -> u64 {
        self.total_sum
    }

    /// Number of readings ever received.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Newest retained reading.
    pub fn last(&self) -> Option<&Reading> {
        self.history.back()
    }

    /// Lifetime mean temperature rounded to 2 decimals, 0 when empty.
    pub fn average_temperature(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        round2(self.total_sum as f64 / self.total_count as f64)
    }

    fn summary(&self, sensor_id: u8) -> SensorSummary {
        let last = self.last();
        SensorSummary {
            sensor_id,
            average_temperature: self.average_temperature(),
            reading_count: self.total_count,
            last_reading: last.map(|r| r.temperature),
            last_timestamp: last.map(|r| r.timestamp),
        }
    }
}

/// Owns all per-sensor state and the throughput window.
pub struct Aggregator {
    sensors: BTreeMap<u8, SensorRecord>,
    rate: RateWindow,
    residual: Option<u8>,
    started_at: u64,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ReadingSink>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("sensors", &self.sensors.len())
            .field("residual", &self.residual)
            .field("started_at", &self.started_at)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(Arc::new(NullSink))
    }
}

impl Aggregator {
    /// Create an aggregator publishing to `sink`, timed by the system clock.
    pub fn new(sink: Arc<dyn ReadingSink>) -> Self {
        Self::with_clock(sink, Arc::new(SystemClock::new()))
    }

    /// Create an aggregator with an explicit clock.
    ///
    /// The start time used for throughput reporting is read from `clock`
    /// immediately.
    pub fn with_clock(sink: Arc<dyn ReadingSink>, clock: Arc<dyn Clock>) -> Self {
        let started_at = clock.now_millis();
        Self {
            sensors: BTreeMap::new(),
            rate: RateWindow::new(RATE_WINDOW_MS),
            residual: None,
            started_at,
            clock,
            sink,
        }
    }

    /// Feed a chunk of raw bytes.
    ///
    /// A byte held over from the previous chunk is paired with the first byte
    /// of this one. Every decoded reading is folded into its sensor record and
    /// published to the sink, in stream order. A trailing unpaired byte is
    /// kept for the next call. Returns the readings produced by this chunk.
    pub fn ingest(&mut self, chunk: &[u8]) -> Vec<Reading> {
        if chunk.is_empty() {
            return Vec::new();
        }

        let now = self.clock.now_millis();
        let mut readings = Vec::new();
        let mut rest = chunk;

        if let Some(first) = self.residual.take()
            && let Some((&second, tail)) = rest.split_first()
        {
            readings.extend(decode_one_at(&[first, second], 0, now));
            rest = tail;
        }

        readings.extend(decode_stream_at(rest, now));

        if rest.len() % FRAME_LEN != 0 {
            self.residual = rest.last().copied();
        }

        for reading in &readings {
            self.record(*reading, now);
            self.sink.publish(reading);
        }

        trace!(
            bytes = chunk.len(),
            readings = readings.len(),
            residual = self.residual.is_some(),
            "Ingested chunk"
        );

        readings
    }

    fn record(&mut self, reading: Reading, now: u64) {
        self.sensors
            .entry(reading.sensor_id)
            .or_default()
            .push(reading);
        self.rate.record(reading.timestamp, now);
    }

    /// Active sensor count and throughput.
    ///
    /// Throughput keeps the historical formula: the elapsed time is floored at
    /// one minute and the divisor is then capped at one minute, so the value
    /// reported is the number of readings in the trailing window.
    pub fn stats(&mut self) -> SensorStats {
        let now = self.clock.now_millis();
        let in_window = self.rate.count(now) as f64;

        let elapsed_minutes =
            (now.saturating_sub(self.started_at) as f64 / MILLIS_PER_MINUTE).max(1.0);
        let average_messages_per_minute = if elapsed_minutes < 1.0 {
            in_window
        } else {
            round2(in_window / elapsed_minutes.min(1.0))
        };

        SensorStats {
            active_sensor_count: self.sensors.len(),
            average_messages_per_minute,
        }
    }

    /// Summaries of every known sensor, ascending by id.
    pub fn all_sensors(&self) -> Vec<SensorSummary> {
        self.sensors
            .iter()
            .map(|(&id, record)| record.summary(id))
            .collect()
    }

    /// Summary and retained history for one sensor, or `None` if it has never
    /// reported.
    pub fn sensor(&self, sensor_id: u8) -> Option<SensorDetail> {
        let record = self.sensors.get(&sensor_id)?;
        Some(SensorDetail {
            summary: record.summary(sensor_id),
            readings: record.history.iter().copied().collect(),
        })
    }

    /// Raw record for one sensor.
    pub fn record_for(&self, sensor_id: u8) -> Option<&SensorRecord> {
        self.sensors.get(&sensor_id)
    }

    /// Number of distinct sensors seen.
    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    /// Whether a byte is waiting for its partner.
    pub fn has_residual(&self) -> bool {
        self.residual.is_some()
    }

    /// Start time used for throughput reporting, in epoch milliseconds.
    pub fn started_at(&self) -> u64 {
        self.started_at
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
