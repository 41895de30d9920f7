//! Reading delivery from the aggregator to its consumers.
//!
//! The [`Aggregator`](crate::Aggregator) hands every decoded reading to a
//! [`ReadingSink`] in ingestion order. The [`Broadcaster`](crate::Broadcaster)
//! is the sink used by the service; closures and [`NullSink`] cover tests.

use thermo_types::Reading;

/// Receives readings as the aggregator produces them.
///
/// Implementations are called while the aggregator is being updated, so
/// they must not block.
pub trait ReadingSink: Send + Sync {
    /// Deliver one reading.
    fn publish(&self, reading: &Reading);
}

impl<F> ReadingSink for F
where
    F: Fn(&Reading) + Send + Sync,
{
    fn publish(&self, reading: &Reading) {
        self(reading)
    }
}

/// A sink that discards every reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ReadingSink for NullSink {
    fn publish(&self, _reading: &Reading) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |reading: &Reading| seen.lock().unwrap().push(reading.sensor_id);

        sink.publish(&Reading::new(4, 20, 0));
        sink.publish(&Reading::new(9, 21, 0));

        assert_eq!(*seen.lock().unwrap(), vec![4, 9]);
    }

    #[test]
    fn test_null_sink_accepts_readings() {
        NullSink.publish(&Reading::new(1, 1, 1));
    }
}
