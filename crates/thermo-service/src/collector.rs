//! Background data collector.
//!
//! Pulls chunks from one [`ByteSource`] and folds them into the shared
//! aggregator until the source ends, fails, or the collector is cancelled.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use thermo_core::{ByteSource, MockSource, ProcessSource};

use crate::config::{SourceConfig, SourceMode};
use crate::state::AppState;

/// Why a collector run ended.
#[derive(Debug)]
pub enum CollectorExit {
    /// The source reported end of stream.
    SourceClosed,
    /// The collector was cancelled.
    Cancelled,
    /// The source failed; accumulated state is kept.
    Failed(thermo_core::Error),
}

/// Background collector that feeds one byte source into the aggregator.
pub struct Collector {
    state: Arc<AppState>,
    source: Box<dyn ByteSource>,
}

impl Collector {
    /// Create a collector reading from `source`.
    pub fn new(state: Arc<AppState>, source: Box<dyn ByteSource>) -> Self {
        Self { state, source }
    }

    /// Create a collector for the configured source.
    ///
    /// Process mode spawns the measuring command immediately, so this must
    /// run inside a tokio runtime.
    pub fn from_config(state: Arc<AppState>) -> thermo_core::Result<Self> {
        let source = open_source(&state.config.source)?;
        Ok(Self::new(state, source))
    }

    /// Start collecting in the background.
    ///
    /// Returns immediately; the handle resolves when collection stops.
    pub fn start(self) -> JoinHandle<CollectorExit> {
        tokio::spawn(self.run())
    }

    /// Collect until the source ends, fails, or the collector is cancelled.
    pub async fn run(mut self) -> CollectorExit {
        let cancel = self.state.collector.cancellation();
        self.state.collector.set_running(true);
        info!("Collector started");

        let exit = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break CollectorExit::Cancelled,
                next = self.source.next_chunk() => next,
            };

            match next {
                Ok(Some(chunk)) => {
                    let produced = self.state.aggregator.lock().await.ingest(&chunk).len();
                    self.state.collector.add_bytes(chunk.len());
                    debug!(bytes = chunk.len(), readings = produced, "Collected chunk");
                }
                Ok(None) => break CollectorExit::SourceClosed,
                Err(e) => break CollectorExit::Failed(e),
            }
        };

        self.state.collector.set_running(false);
        match &exit {
            CollectorExit::SourceClosed => info!("Byte source closed, collector stopped"),
            CollectorExit::Cancelled => info!("Collector cancelled"),
            CollectorExit::Failed(e) => error!("Byte source failed, collector stopped: {}", e),
        }
        exit
    }
}

/// Start the configured collector in the background.
///
/// A source that cannot be opened is logged and leaves the collector
/// stopped; the API keeps serving the (empty) state.
pub fn start_collector(state: Arc<AppState>) -> Option<JoinHandle<CollectorExit>> {
    match Collector::from_config(state) {
        Ok(collector) => Some(collector.start()),
        Err(e) => {
            error!("Failed to open byte source, serving without collection: {}", e);
            None
        }
    }
}

/// Open the byte source selected by `config`.
pub fn open_source(config: &SourceConfig) -> thermo_core::Result<Box<dyn ByteSource>> {
    match config.mode {
        SourceMode::Mock => {
            let options = config.mock.to_options();
            info!(
                "Mock temperature source: {} sensors, {}ms interval",
                options.sensor_count,
                options.interval.as_millis()
            );
            Ok(Box::new(MockSource::new(options)))
        }
        SourceMode::Process => Ok(Box::new(ProcessSource::spawn(&config.command, &config.args)?)),
    }
}
