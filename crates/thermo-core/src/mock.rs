//! Synthetic telemetry for running without a measuring process.
//!
//! [`MockSource`] emits one reading frame per tick for a random sensor,
//! occasionally followed by a type-1 frame that the decoder must filter out.
//! Temperatures sit around `20 + sensor_id % 10` with ±5 °C of noise so that
//! different sensors have visibly different averages.
//!
//! ```
//! use std::time::Duration;
//! use thermo_core::{MockSource, MockSourceOptions};
//!
//! let mut source = MockSource::with_seed(
//!     MockSourceOptions {
//!         sensor_count: 4,
//!         interval: Duration::from_millis(10),
//!         noise_ratio: 0.0,
//!     },
//!     7,
//! );
//! let chunk = source.generate_chunk();
//! assert_eq!(chunk.len(), 2);
//! assert_eq!(chunk[0] >> 6, 2);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{Interval, MissedTickBehavior};

use thermo_types::{FRAME_LEN, Frame, MAX_SENSOR_ID, MessageType};

use crate::error::Result;
use crate::source::ByteSource;

/// Base temperature before the per-sensor offset.
const BASE_TEMPERATURE: i16 = 20;

/// Maximum deviation from a sensor's base temperature.
const TEMPERATURE_JITTER: i16 = 5;

/// Shortest allowed time between chunks.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Options for [`MockSource`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockSourceOptions {
    /// Sensors are drawn from `0..sensor_count` (at most 64).
    pub sensor_count: u8,
    /// Time between chunks (at least 1 ms).
    pub interval: Duration,
    /// Probability that a chunk also carries a type-1 frame.
    pub noise_ratio: f64,
}

impl Default for MockSourceOptions {
    fn default() -> Self {
        Self {
            sensor_count: 10,
            interval: Duration::from_millis(2000),
            noise_ratio: 0.1,
        }
    }
}

/// A [`ByteSource`] producing random but plausible frames.
#[derive(Debug)]
pub struct MockSource {
    options: MockSourceOptions,
    rng: StdRng,
    ticker: Option<Interval>,
}

impl MockSource {
    /// Create a generator seeded from the OS.
    pub fn new(options: MockSourceOptions) -> Self {
        Self::from_rng(options, StdRng::from_os_rng())
    }

    /// Create a deterministic generator.
    pub fn with_seed(options: MockSourceOptions, seed: u64) -> Self {
        Self::from_rng(options, StdRng::seed_from_u64(seed))
    }

    fn from_rng(mut options: MockSourceOptions, rng: StdRng) -> Self {
        options.sensor_count = options.sensor_count.clamp(1, MAX_SENSOR_ID + 1);
        options.interval = options.interval.max(MIN_INTERVAL);
        options.noise_ratio = if options.noise_ratio.is_finite() {
            options.noise_ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            options,
            rng,
            ticker: None,
        }
    }

    /// The effective options after clamping.
    pub fn options(&self) -> &MockSourceOptions {
        &self.options
    }

    /// Produce the bytes for one tick without waiting.
    pub fn generate_chunk(&mut self) -> Bytes {
        let sensor_id = self.rng.random_range(0..self.options.sensor_count);
        let temperature = self.temperature_for(sensor_id);

        let mut buf = BytesMut::with_capacity(FRAME_LEN * 2);
        buf.put_slice(&Frame::reading(sensor_id, temperature).encode());
        if self.rng.random_bool(self.options.noise_ratio) {
            let noise = Frame::new(MessageType::Reserved1, sensor_id, temperature);
            buf.put_slice(&noise.encode());
        }
        buf.freeze()
    }

    fn temperature_for(&mut self, sensor_id: u8) -> u8 {
        let base = BASE_TEMPERATURE + i16::from(sensor_id % 10);
        let jitter = self
            .rng
            .random_range(-TEMPERATURE_JITTER..=TEMPERATURE_JITTER);
        (base + jitter).clamp(0, i16::from(u8::MAX)) as u8
    }
}

#[async_trait]
impl ByteSource for MockSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let period = self.options.interval;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        ticker.tick().await;
        Ok(Some(self.generate_chunk()))
    }
}
