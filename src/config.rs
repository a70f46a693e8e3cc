//! Global configuration for KMR runtime behavior.
//!
//! Settings here are written once at startup by the command line layer and
//! read wherever a default is needed, without threading them through every
//! constructor.

use std::sync::atomic::{AtomicU64, Ordering};

/// Default number of items between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

static PROGRESS_INTERVAL: AtomicU64 = AtomicU64::new(DEFAULT_PROGRESS_INTERVAL);

/// Set the number of items between progress log lines.
///
/// Zero is treated as one.
///
/// # Example
///
/// ```
/// use kmr::config;
///
/// config::set_progress_interval(10_000);
/// assert_eq!(config::progress_interval(), 10_000);
/// config::set_progress_interval(config::DEFAULT_PROGRESS_INTERVAL);
/// ```
#[inline]
pub fn set_progress_interval(interval: u64) {
    PROGRESS_INTERVAL.store(interval.max(1), Ordering::Release);
}

/// Number of items between progress log lines.
#[inline]
pub fn progress_interval() -> u64 {
    PROGRESS_INTERVAL.load(Ordering::Acquire)
}
