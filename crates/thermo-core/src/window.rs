//! Sliding time window used for throughput accounting.

use std::collections::VecDeque;

/// Length of the throughput window in milliseconds.
pub const RATE_WINDOW_MS: u64 = 60_000;

/// Timestamps of recent readings within a trailing time window.
///
/// Entries are kept in non-decreasing order and pruned from the front on
/// every read or write, so the cost of pruning is proportional to the
/// number of entries that expired.
#[derive(Debug, Clone)]
pub struct RateWindow {
    timestamps: VecDeque<u64>,
    span_ms: u64,
}

impl RateWindow {
    /// Create a window covering the trailing `span_ms` milliseconds.
    pub fn new(span_ms: u64) -> Self {
        Self {
            timestamps: VecDeque::new(),
            span_ms,
        }
    }

    /// Window length in milliseconds.
    pub fn span_ms(&self) -> u64 {
        self.span_ms
    }

    /// Record a reading timestamp and prune relative to `now`.
    pub fn record(&mut self, timestamp: u64, now: u64) {
        // Never let a late timestamp break the ordering the pruning relies on.
        let timestamp = self
            .timestamps
            .back()
            .map_or(timestamp, |&last| timestamp.max(last));
        self.timestamps.push_back(timestamp);
        self.prune(now);
    }

    /// Drop every entry older than `now - span`.
    pub fn prune(&mut self, now: u64) {
        let cutoff = now.saturating_sub(self.span_ms);
        while self.timestamps.front().is_some_and(|&ts| ts < cutoff) {
            self.timestamps.pop_front();
        }
    }

    /// Number of entries inside the window after pruning at `now`.
    pub fn count(&mut self, now: u64) -> usize {
        self.prune(now);
        self.timestamps.len()
    }

    /// Iterate the retained timestamps, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &u64> {
        self.timestamps.iter()
    }
}

impl Default for RateWindow {
    fn default() -> Self {
        Self::new(RATE_WINDOW_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_counts_recent_entries() {
        let mut window = RateWindow::default();
        window.record(1_000, 1_000);
        window.record(2_000, 2_000);
        window.record(3_000, 3_000);
        assert_eq!(window.count(3_000), 3);
    }

    #[test]
    fn test_window_prunes_expired_entries() {
        let mut window = RateWindow::default();
        window.record(0, 0);
        window.record(30_000, 30_000);

        // Exactly at the boundary the first entry is still inside.
        assert_eq!(window.count(60_000), 2);
        assert_eq!(window.count(60_001), 1);
        assert_eq!(window.count(90_001), 0);
    }

    #[test]
    fn test_window_prunes_on_record() {
        let mut window = RateWindow::new(10);
        window.record(0, 0);
        window.record(100, 100);
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![100]);
    }

    #[test]
    fn test_window_keeps_non_decreasing_order() {
        let mut window = RateWindow::default();
        window.record(5_000, 5_000);
        window.record(4_000, 5_000);

        let entries: Vec<_> = window.iter().copied().collect();
        assert_eq!(entries, vec![5_000, 5_000]);
    }

    #[test]
    fn test_window_near_zero_does_not_underflow() {
        let mut window = RateWindow::default();
        window.record(10, 10);
        assert_eq!(window.count(20), 1);
        assert_eq!(window.span_ms(), RATE_WINDOW_MS);
    }
}
