//! Startup scan that rebuilds the dirty registry from the tile cache.
//!
//! The registry is in memory only; what survives a restart are the `.dirty`
//! markers and the image files themselves. The scan walks every tile of the
//! configured box and zoom span and classifies it:
//!
//! | image            | marker  | result                         |
//! |------------------|---------|--------------------------------|
//! | missing          | any     | dirty, `ts = 0`                |
//! | older than cutoff| any     | dirty, `ts` = image mtime      |
//! | present          | present | dirty, `ts` = marker mtime     |
//! | present          | missing | fresh, skipped                 |
//!
//! Tiles are checked one at a time.

use std::io;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};

use crate::cache::TileStore;
use crate::coord::{BoundingBox, TileCoord, TileRange};
use crate::registry::{DirtyRecord, DirtyRegistry};

/// Progress is logged every this many tiles.
const PROGRESS_INTERVAL: u64 = 100_000;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to inspect tile {tile}: {source}")]
    Inspect {
        tile: TileCoord,
        #[source]
        source: io::Error,
    },
}

/// Area, zoom span and age cutoff of the startup scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub bbox: BoundingBox,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Images modified before this epoch-ms instant are re-rendered.
    pub rerender_older_than_ms: Option<u64>,
}

/// Outcome of a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Tiles inspected.
    pub visited: u64,
    /// Tiles with no cached image.
    pub missing: u64,
    /// Images older than the cutoff.
    pub stale: u64,
    /// Images carrying a dirty marker.
    pub marked: u64,
}

impl ScanSummary {
    /// Tiles inserted into the registry.
    pub fn dirty(&self) -> u64 {
        self.missing + self.stale + self.marked
    }
}

/// Seeds the dirty registry from files on disk.
pub struct InitialScanner {
    config: ScanConfig,
    store: TileStore,
    registry: Arc<DirtyRegistry>,
}

impl InitialScanner {
    pub fn new(config: ScanConfig, store: TileStore, registry: Arc<DirtyRegistry>) -> Self {
        Self {
            config,
            store,
            registry,
        }
    }

    /// Scan every tile of the configured range.
    pub async fn scan(&self) -> Result<ScanSummary, ScanError> {
        let range = TileRange::new(self.config.bbox, self.config.min_zoom, self.config.max_zoom);
        let started = Instant::now();
        info!(
            tiles = range.tile_count(),
            min_zoom = self.config.min_zoom,
            max_zoom = self.config.max_zoom,
            "Scanning dirty tiles"
        );

        let mut summary = ScanSummary::default();
        for tile in range {
            summary.visited += 1;
            if let Some(ts) = self.classify(&tile, &mut summary).await? {
                self.registry.mark(DirtyRecord::new(tile, ts));
            }
            if summary.visited % PROGRESS_INTERVAL == 0 {
                debug!(
                    visited = summary.visited,
                    dirty = summary.dirty(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Scan progress"
                );
            }
        }

        info!(
            visited = summary.visited,
            missing = summary.missing,
            stale = summary.stale,
            marked = summary.marked,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Dirty tiles scanned"
        );
        Ok(summary)
    }

    /// Dirty timestamp for a tile, or `None` if it is fresh.
    async fn classify(
        &self,
        tile: &TileCoord,
        summary: &mut ScanSummary,
    ) -> Result<Option<u64>, ScanError> {
        let inspect_err = |source: io::Error| ScanError::Inspect {
            tile: *tile,
            source,
        };

        let Some(image_ts) = self.store.image_modified(tile).await.map_err(inspect_err)? else {
            summary.missing += 1;
            return Ok(Some(0));
        };

        if let Some(cutoff) = self.config.rerender_older_than_ms {
            if image_ts < cutoff {
                summary.stale += 1;
                return Ok(Some(image_ts));
            }
        }

        let marker_ts = self.store.marker_modified(tile).await.map_err(inspect_err)?;
        if marker_ts.is_some() {
            summary.marked += 1;
        }
        Ok(marker_ts)
    }
}
