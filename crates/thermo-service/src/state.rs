//! Application state shared across handlers.
//!
//! # Locking
//!
//! - `aggregator` is a `tokio::sync::Mutex`: an ingest and a query never
//!   interleave, so a query always sees every reading of a chunk or none.
//! - The [`Broadcaster`] guards its own registry and is called by the
//!   aggregator while the aggregator lock is held. The lock order is always
//!   aggregator, then registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use thermo_core::{Aggregator, Broadcaster, Clock, ReadingSink, SystemClock};

use crate::config::Config;

/// Shared application state.
pub struct AppState {
    /// Per-sensor statistics, fed by the collector.
    pub aggregator: Mutex<Aggregator>,
    /// Live subscriber connections.
    pub broadcaster: Arc<Broadcaster>,
    /// Configuration the service was started with.
    pub config: Config,
    /// Collector control state.
    pub collector: CollectorState,
}

impl AppState {
    /// Create new application state using the system clock.
    pub fn new(config: Config) -> Arc<Self> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create new application state with an explicit clock.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Arc<Self> {
        let broadcaster = Arc::new(Broadcaster::new());
        let sink: Arc<dyn ReadingSink> = broadcaster.clone();
        Arc::new(Self {
            aggregator: Mutex::new(Aggregator::with_clock(sink, clock)),
            broadcaster,
            config,
            collector: CollectorState::new(),
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("broadcaster", &self.broadcaster)
            .field("config", &self.config)
            .field("collector", &self.collector)
            .finish_non_exhaustive()
    }
}

/// State for tracking and controlling the collector.
#[derive(Debug)]
pub struct CollectorState {
    /// Whether the collector is currently running.
    running: AtomicBool,
    /// When the collector was started (Unix timestamp).
    started_at: AtomicU64,
    /// Total bytes handed to the aggregator.
    bytes_ingested: AtomicU64,
    /// Cancelled to stop the collector.
    cancel: CancellationToken,
}

impl CollectorState {
    /// Create a new collector state.
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            started_at: AtomicU64::new(0),
            bytes_ingested: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        }
    }

    /// Check if the collector is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Mark the collector as started or stopped.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
        if running {
            let now = OffsetDateTime::now_utc().unix_timestamp() as u64;
            self.started_at.store(now, Ordering::SeqCst);
        }
    }

    /// Get the collector start time.
    pub fn started_at(&self) -> Option<OffsetDateTime> {
        let ts = self.started_at.load(Ordering::SeqCst);
        if ts == 0 {
            None
        } else {
            OffsetDateTime::from_unix_timestamp(ts as i64).ok()
        }
    }

    /// Record `n` more bytes ingested.
    pub fn add_bytes(&self, n: usize) {
        self.bytes_ingested.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Total bytes ingested so far.
    pub fn bytes_ingested(&self) -> u64 {
        self.bytes_ingested.load(Ordering::Relaxed)
    }

    /// A token that is cancelled when the collector should stop.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signal the collector to stop.
    pub fn signal_stop(&self) {
        self.cancel.cancel();
    }
}

impl Default for CollectorState {
    fn default() -> Self {
        Self::new()
    }
}
