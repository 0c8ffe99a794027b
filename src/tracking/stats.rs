//! Tracking statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by the tracking decorator.
///
/// All fields are atomic so decorated handles can update them through a
/// shared reference. `Ordering::Relaxed` is enough: counters are
/// independent and only read for diagnostics.
///
/// # Example
/// ```
/// use trackvfs::tracking::TrackingStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = TrackingStats::new();
/// stats.tracked_writes.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().tracked_writes, 1);
/// ```
#[derive(Debug)]
pub struct TrackingStats {
    /// Successful writes recorded in a bitmap.
    pub tracked_writes: AtomicU64,

    /// Successful writes to anonymous files (never tracked).
    pub untracked_writes: AtomicU64,

    /// Successful truncates recorded in a bitmap.
    pub tracked_truncates: AtomicU64,

    /// Times a bitmap had to grow.
    pub bitmap_growths: AtomicU64,

    /// Marks dropped because the bitmap could not grow.
    pub tracking_failures: AtomicU64,

    /// Calls to reset a file's dirty state.
    pub resets: AtomicU64,
}

impl TrackingStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            tracked_writes: AtomicU64::new(0),
            untracked_writes: AtomicU64::new(0),
            tracked_truncates: AtomicU64::new(0),
            bitmap_growths: AtomicU64::new(0),
            tracking_failures: AtomicU64::new(0),
            resets: AtomicU64::new(0),
        }
    }

    /// Get a non-atomic copy for display/logging.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            tracked_writes: self.tracked_writes.load(Ordering::Relaxed),
            untracked_writes: self.untracked_writes.load(Ordering::Relaxed),
            tracked_truncates: self.tracked_truncates.load(Ordering::Relaxed),
            bitmap_growths: self.bitmap_growths.load(Ordering::Relaxed),
            tracking_failures: self.tracking_failures.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.tracked_writes.store(0, Ordering::Relaxed);
        self.untracked_writes.store(0, Ordering::Relaxed);
        self.tracked_truncates.store(0, Ordering::Relaxed);
        self.bitmap_growths.store(0, Ordering::Relaxed);
        self.tracking_failures.store(0, Ordering::Relaxed);
        self.resets.store(0, Ordering::Relaxed);
    }
}

impl Default for TrackingStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of tracking statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub tracked_writes: u64,
    pub untracked_writes: u64,
    pub tracked_truncates: u64,
    pub bitmap_growths: u64,
    pub tracking_failures: u64,
    pub resets: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ writes: {}, untracked: {}, truncates: {}, growths: {}, failures: {}, resets: {} }}",
            self.tracked_writes,
            self.untracked_writes,
            self.tracked_truncates,
            self.bitmap_growths,
            self.tracking_failures,
            self.resets
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = TrackingStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_stats_reset() {
        let stats = TrackingStats::new();
        stats.tracked_writes.fetch_add(100, Ordering::Relaxed);
        stats.tracking_failures.fetch_add(2, Ordering::Relaxed);

        stats.reset();

        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_stats_display() {
        let stats = TrackingStats::new();
        stats.tracked_writes.fetch_add(80, Ordering::Relaxed);
        stats.tracking_failures.fetch_add(1, Ordering::Relaxed);

        let display = format!("{}", stats.snapshot());

        assert!(display.contains("writes: 80"));
        assert!(display.contains("failures: 1"));
    }
}
