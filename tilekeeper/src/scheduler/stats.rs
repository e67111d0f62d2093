//! Prerender scheduler counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Scheduler statistics for monitoring.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    /// Priority snapshots taken.
    pub passes: AtomicU64,
    /// Passes abandoned because new dirty tiles arrived.
    pub restarts: AtomicU64,
    /// Tiles handed to the renderer.
    pub dispatched: AtomicU64,
    /// Renders that completed successfully.
    pub rendered: AtomicU64,
    /// Renders that reported an error.
    pub failed: AtomicU64,
    /// Snapshot entries skipped because the tile was already rendering.
    pub in_flight_skipped: AtomicU64,
}

impl SchedulerStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> SchedulerStatsSnapshot {
        SchedulerStatsSnapshot {
            passes: self.passes.load(Ordering::Relaxed),
            restarts: self.restarts.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            rendered: self.rendered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            in_flight_skipped: self.in_flight_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of scheduler statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStatsSnapshot {
    pub passes: u64,
    pub restarts: u64,
    pub dispatched: u64,
    pub rendered: u64,
    pub failed: u64,
    pub in_flight_skipped: u64,
}
