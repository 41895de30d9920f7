//! Stream aggregation and live fan-out for 2-byte temperature telemetry.
//!
//! This crate turns a raw byte stream into per-sensor statistics and
//! republishes every decoded reading to subscribers.
//!
//! # Features
//!
//! - **Aggregation**: chunk-boundary-safe decoding, bounded per-sensor
//!   history, lifetime averages and a trailing 60 s throughput window
//! - **Fan-out**: per-connection sensor filters and JSON control messages
//! - **Byte sources**: a measuring child process or a synthetic generator
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use thermo_core::{Aggregator, Broadcaster, ReadingSink, ServerMessage, outbound_channel};
//!
//! let broadcaster = Arc::new(Broadcaster::new());
//! let (tx, mut rx) = outbound_channel();
//! let id = broadcaster.on_connect(tx);
//! broadcaster.on_client_message(id, r#"{"type":"subscribe","sensorId":33}"#);
//!
//! let mut aggregator = Aggregator::new(broadcaster.clone() as Arc<dyn ReadingSink>);
//! aggregator.ingest(&[0xA1]);
//! aggregator.ingest(&[0x10, 0x80]);
//!
//! assert_eq!(aggregator.stats().active_sensor_count, 1);
//! assert!(matches!(rx.try_recv(), Ok(ServerMessage::Connected { .. })));
//! assert!(matches!(rx.try_recv(), Ok(ServerMessage::Subscribed { sensor_id: 33 })));
//! assert!(matches!(rx.try_recv(), Ok(ServerMessage::Reading { data }) if data.temperature == 16));
//! ```

pub mod aggregator;
pub mod broadcaster;
pub mod clock;
pub mod error;
pub mod events;
pub mod messages;
pub mod mock;
pub mod source;
pub mod window;

pub use aggregator::{Aggregator, HISTORY_CAPACITY, SensorRecord};
pub use broadcaster::{
    Broadcaster, ConnectionId, OUTBOUND_CAPACITY, Outbound, OutboundReceiver, outbound_channel,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use events::{NullSink, ReadingSink};
pub use messages::{ClientMessage, INVALID_MESSAGE, MessageError, ServerMessage, WELCOME_MESSAGE};
pub use mock::{MockSource, MockSourceOptions};
pub use source::{ByteSource, ProcessSource, ReplaySource};
pub use window::{RATE_WINDOW_MS, RateWindow};

// Re-export the shared value types so downstream crates need one dependency.
pub use thermo_types::{
    FrameError, MessageType, Reading, SensorDetail, SensorStats, SensorSummary,
};
