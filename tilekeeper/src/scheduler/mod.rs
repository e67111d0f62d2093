//! Prerender scheduler.
//!
//! Continuously re-renders dirty tiles through a bounded set of workers.
//!
//! # Passes
//!
//! Each pass snapshots the [`DirtyRegistry`] and sorts it with
//! [`ZoomPriority`]: configured zooms first, then newest `ts` first. Tiles are
//! dispatched in that order, one per free worker. Before every dispatch the
//! scheduler checks the [`RestartSignal`]; if producers added dirty tiles in
//! the meantime the rest of the snapshot is dropped and a fresh pass begins.
//! Renders already running are never interrupted.
//!
//! When a pass runs out of tiles the scheduler suspends until the next
//! `resume`.
//!
//! # Per-tile state
//!
//! ```text
//! Idle ──dispatch──▶ Dispatched ──render()──▶ Rendering ──done──▶ Idle
//! ```
//!
//! A tile in `Dispatched`/`Rendering` is tracked as in flight and skipped by
//! later snapshots until its render finishes, so a restart never starts a
//! second render of the same tile. If the tile was dirtied again while it
//! rendered, the finished render fires the [`RestartSignal`] itself so the
//! newer record gets a pass of its own.
//!
//! # Failures
//!
//! A render error is logged and the tile stays dirty. It is picked up by the
//! next pass, which starts on the next `resume`; failures alone never start a
//! pass, so a tile that always fails cannot spin the workers. A
//! worker panic or a closed worker pool ends [`PrerenderScheduler::run`] with
//! a [`SchedulerError`], which the caller should treat as fatal.
//!
//! # Fairness
//!
//! A continuous stream of restarts keeps re-sorting the registry, so a stale
//! low-priority tile can wait indefinitely while fresher or higher-priority
//! tiles keep arriving. This is accepted: dispatch order always reflects the
//! latest snapshot.

mod priority;
mod signal;
mod stats;

pub use priority::ZoomPriority;
pub use signal::RestartSignal;
pub use stats::{SchedulerStats, SchedulerStatsSnapshot};

use std::sync::Arc;

use dashmap::DashSet;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coord::TileKey;
use crate::registry::{DirtyRecord, DirtyRegistry};
use crate::render::TileRenderer;

/// Errors that end the scheduling loop.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A render worker panicked.
    #[error("Prerender worker panicked: {0}")]
    WorkerPanicked(String),

    /// The worker pool was closed while the loop was still running.
    #[error("Prerender worker pool closed unexpectedly")]
    PoolClosed,
}

impl From<JoinError> for SchedulerError {
    fn from(err: JoinError) -> Self {
        SchedulerError::WorkerPanicked(err.to_string())
    }
}

/// Prerender scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum concurrent renders.
    pub workers: usize,
    /// Dispatch order of zoom levels.
    pub zoom_priority: ZoomPriority,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            zoom_priority: ZoomPriority::default(),
        }
    }
}

/// Worker count used when none is configured: the available parallelism.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Long-running loop that feeds dirty tiles to the renderer.
pub struct PrerenderScheduler {
    registry: Arc<DirtyRegistry>,
    renderer: Arc<dyn TileRenderer>,
    signal: Arc<RestartSignal>,
    config: SchedulerConfig,
    /// Tiles currently dispatched or rendering.
    in_flight: Arc<DashSet<TileKey>>,
    stats: Arc<SchedulerStats>,
}

impl PrerenderScheduler {
    /// Create a new prerender scheduler.
    ///
    /// # Arguments
    ///
    /// * `registry` - Dirty tiles to render
    /// * `renderer` - Render collaborator shared by all workers
    /// * `signal` - Restart signal fired by dirty-tile producers
    /// * `config` - Worker count and zoom priority
    pub fn new(
        registry: Arc<DirtyRegistry>,
        renderer: Arc<dyn TileRenderer>,
        signal: Arc<RestartSignal>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            registry,
            renderer,
            signal,
            config: SchedulerConfig {
                workers: config.workers.max(1),
                ..config
            },
            in_flight: Arc::new(DashSet::new()),
            stats: Arc::new(SchedulerStats::default()),
        }
    }

    /// Get access to the statistics for monitoring.
    pub fn stats(&self) -> Arc<SchedulerStats> {
        Arc::clone(&self.stats)
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Returns `Ok(())` only after cancellation, once renders in flight have
    /// finished. Any other exit is an error.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), SchedulerError> {
        info!(
            workers = self.config.workers,
            zoom_priority = ?self.config.zoom_priority.order(),
            dirty = self.registry.size(),
            "Prerender scheduler started"
        );

        let pool = Arc::new(Semaphore::new(self.config.workers));
        let mut renders = JoinSet::new();

        'passes: loop {
            // Clear stale requests before snapshotting so later ones still count.
            self.signal.begin_pass();
            let view = self.config.zoom_priority.view(&self.registry);
            SchedulerStats::bump(&self.stats.passes);
            debug!(tiles = view.len(), in_flight = self.in_flight.len(), "Prerender pass");

            for record in view {
                reap_finished(&mut renders)?;

                if self.in_flight.contains(&record.key()) {
                    SchedulerStats::bump(&self.stats.in_flight_skipped);
                    continue;
                }

                let permit = tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => break 'passes,

                    permit = Arc::clone(&pool).acquire_owned() => {
                        permit.map_err(|_| SchedulerError::PoolClosed)?
                    }
                };

                if self.signal.take_restart() {
                    SchedulerStats::bump(&self.stats.restarts);
                    debug!(dirty = self.registry.size(), "Restarting prerender pass");
                    continue 'passes;
                }

                // The snapshot may be stale; dispatch what the registry holds now.
                let Some(current) = self.registry.get(&record.tile()) else {
                    continue;
                };
                self.dispatch(&mut renders, current, permit);
            }

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => break 'passes,

                    _ = self.signal.wait() => continue 'passes,

                    Some(joined) = renders.join_next(), if !renders.is_empty() => joined?,
                }
            }
        }

        info!(in_flight = renders.len(), "Prerender scheduler shutting down");
        while let Some(joined) = renders.join_next().await {
            joined?;
        }

        let stats = self.stats.snapshot();
        info!(
            passes = stats.passes,
            restarts = stats.restarts,
            rendered = stats.rendered,
            failed = stats.failed,
            "Prerender scheduler stopped"
        );
        Ok(())
    }

    fn dispatch(
        &self,
        renders: &mut JoinSet<()>,
        record: DirtyRecord,
        permit: OwnedSemaphorePermit,
    ) {
        let key = record.key();
        self.in_flight.insert(key);
        SchedulerStats::bump(&self.stats.dispatched);

        let renderer = Arc::clone(&self.renderer);
        let registry = Arc::clone(&self.registry);
        let signal = Arc::clone(&self.signal);
        let in_flight = Arc::clone(&self.in_flight);
        let stats = Arc::clone(&self.stats);

        renders.spawn(async move {
            match renderer.render(&record, true).await {
                Ok(()) => SchedulerStats::bump(&stats.rendered),
                Err(e) => {
                    SchedulerStats::bump(&stats.failed);
                    warn!(tile = %record.tile(), error = %e, "Prerender failed");
                }
            }
            in_flight.remove(&key);

            // Passes started while this render ran skipped the tile.
            if registry
                .get(&record.tile())
                .is_some_and(|current| current.ts != record.ts)
            {
                debug!(tile = %record.tile(), "Tile dirtied again while rendering, starting a new pass");
                signal.resume();
            }
            drop(permit);
        });
    }
}

/// Collect renders that already finished, surfacing worker panics.
fn reap_finished(renders: &mut JoinSet<()>) -> Result<(), SchedulerError> {
    while let Some(joined) = renders.try_join_next() {
        joined?;
    }
    Ok(())
}
