//! Periodic marker daemon.
//!
//! Runs a [`DirtyMarker`] pass on a fixed interval until cancelled. A failed
//! pass leaves its notifications in place, so the next tick retries it.
//!
//! # Example
//!
//! ```ignore
//! use tilekeeper::marker::MarkerDaemon;
//!
//! let daemon = MarkerDaemon::new(marker).with_interval(Duration::from_secs(30));
//! tokio::spawn(daemon.run(shutdown_token));
//! ```

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::DirtyMarker;

/// Default interval between marker passes (60 seconds).
pub const DEFAULT_MARK_INTERVAL_SECS: u64 = 60;

/// Background daemon that consumes expiry notifications.
pub struct MarkerDaemon {
    marker: DirtyMarker,
    interval: Duration,
}

impl MarkerDaemon {
    pub fn new(marker: DirtyMarker) -> Self {
        Self {
            marker,
            interval: Duration::from_secs(DEFAULT_MARK_INTERVAL_SECS),
        }
    }

    /// Sets a custom pass interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs passes until shutdown is signalled. The first pass runs at once.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Marker daemon starting"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Marker daemon shutting down");
                    break;
                }

                _ = interval.tick() => {
                    if let Err(e) = self.marker.run_pass().await {
                        error!(error = %e, "Marker pass failed, notifications kept for retry");
                    }
                }
            }
        }
    }
}
