//! Progress logging at regular item counts.

use crate::config;
use log::info;
use std::time::Instant;

/// Counts processed items and logs a line every time the count crosses a
/// multiple of the interval.
///
/// # Example
///
/// ```
/// use kmr::progress::ProgressTracker;
///
/// let mut tracker = ProgressTracker::new("Merged k-mers").with_interval(100);
/// for _ in 0..250 {
///     tracker.inc(); // logs at 100 and 200
/// }
/// tracker.finish(); // logs "Merged k-mers 250 (complete, ...)"
/// assert_eq!(tracker.count(), 250);
/// ```
#[derive(Debug)]
pub struct ProgressTracker {
    message: String,
    interval: u64,
    count: u64,
    started: Instant,
}

impl ProgressTracker {
    /// Create a tracker using the process-wide default interval.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            interval: config::progress_interval(),
            count: 0,
            started: Instant::now(),
        }
    }

    /// Override the logging interval. Zero is treated as one.
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Count one item.
    #[inline]
    pub fn inc(&mut self) {
        self.add(1);
    }

    /// Count `n` items, logging once per interval boundary crossed.
    pub fn add(&mut self, n: u64) {
        let prev = self.count;
        self.count += n;
        for i in (prev / self.interval + 1)..=(self.count / self.interval) {
            info!("{} {}", self.message, i * self.interval);
        }
    }

    /// Log the final count unless it already landed on a boundary.
    pub fn finish(&self) {
        if self.count > 0 && self.count % self.interval != 0 {
            info!(
                "{} {} (complete, {:.1}s)",
                self.message,
                self.count,
                self.started.elapsed().as_secs_f64()
            );
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut t = ProgressTracker::new("Items").with_interval(10);
        t.inc();
        t.add(25);
        assert_eq!(t.count(), 26);
        t.finish();
    }

    #[test]
    fn test_zero_interval() {
        let mut t = ProgressTracker::new("Items").with_interval(0);
        t.add(3);
        assert_eq!(t.count(), 3);
    }
}
