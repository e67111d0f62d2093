//! Dirty marker: turns expired-region notifications into dirty tiles.
//!
//! Notification files live in shard subdirectories of the expires directory,
//! one coarse tile id (`z/x/y`) per line. A pass:
//!
//! 1. collects every notification file
//! 2. reads and dedupes the coarse tiles they name
//! 3. walks each one's zoom pyramid across the global zoom range, lazily
//! 4. for each candidate, purges the cached image when the zoom is outside
//!    the prerender range, otherwise writes a `.dirty` marker and registers
//!    the tile, provided an image exists
//! 5. deletes the notification files
//!
//! Candidates are handled one at a time to keep disk pressure off the render
//! workers. Notifications are only deleted once every candidate has been
//! handled, so a failed pass is redelivered on the next one.

mod daemon;

pub use daemon::{MarkerDaemon, DEFAULT_MARK_INTERVAL_SECS};

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::cache::{remove_if_exists, TileStore};
use crate::coord::{parse_tile, TileCoord, TileParseError, ZoomPyramid};
use crate::registry::{DirtyRecord, DirtyRegistry};
use crate::scheduler::RestartSignal;
use crate::time::now_millis;

/// Errors that abort a marker pass.
///
/// When a pass fails, no notification file is deleted.
#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("Failed to list notifications in {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read notification {path}: {source}")]
    ReadNotification {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid tile in notification {path}: {source}")]
    MalformedTile {
        path: PathBuf,
        #[source]
        source: TileParseError,
    },

    #[error("Failed to mark tile {tile} dirty: {source}")]
    Mark {
        tile: TileCoord,
        #[source]
        source: io::Error,
    },

    #[error("Failed to delete notification {path}: {source}")]
    RemoveNotification {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Zoom ranges and notification location for the marker.
#[derive(Debug, Clone)]
pub struct MarkerConfig {
    /// Directory holding notification shard subdirectories.
    pub expires_dir: PathBuf,
    /// Global zoom range used for pyramid expansion.
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Renderable zoom range; images outside it are purged.
    pub prerender_min_zoom: u8,
    pub prerender_max_zoom: u8,
}

impl MarkerConfig {
    fn is_renderable(&self, zoom: u8) -> bool {
        (self.prerender_min_zoom..=self.prerender_max_zoom).contains(&zoom)
    }
}

/// Outcome of one marker pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkSummary {
    /// Notification files consumed.
    pub notifications: usize,
    /// Distinct coarse tiles named by the notifications.
    pub coarse_tiles: usize,
    /// Pyramid tiles examined, duplicates included.
    pub candidates: usize,
    /// Cached images deleted because their zoom is not rendered.
    pub purged: usize,
    /// Tiles marked dirty.
    pub marked: usize,
}

/// Consumes notification files and marks the affected tiles dirty.
pub struct DirtyMarker {
    config: MarkerConfig,
    store: TileStore,
    registry: Arc<DirtyRegistry>,
    signal: Arc<RestartSignal>,
}

impl DirtyMarker {
    pub fn new(
        config: MarkerConfig,
        store: TileStore,
        registry: Arc<DirtyRegistry>,
        signal: Arc<RestartSignal>,
    ) -> Self {
        Self {
            config,
            store,
            registry,
            signal,
        }
    }

    /// Run one marker pass.
    ///
    /// A missing expires directory means there is nothing to do.
    pub async fn run_pass(&self) -> Result<MarkSummary, MarkerError> {
        let started = Instant::now();
        let mut summary = MarkSummary::default();

        let files = collect_notifications(&self.config.expires_dir).await?;
        debug!(
            files = files.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Listed expiry notifications"
        );
        if files.is_empty() {
            return Ok(summary);
        }
        summary.notifications = files.len();

        let phase = Instant::now();
        let coarse = read_coarse_tiles(&files).await?;
        summary.coarse_tiles = coarse.len();
        debug!(
            tiles = coarse.len(),
            elapsed_ms = phase.elapsed().as_millis() as u64,
            "Read expired tiles"
        );

        let phase = Instant::now();
        for coarse_tile in &coarse {
            let pyramid = ZoomPyramid::new(*coarse_tile, self.config.min_zoom, self.config.max_zoom);
            for tile in pyramid {
                summary.candidates += 1;
                if self.config.is_renderable(tile.zoom) {
                    if self.mark_existing(&tile).await? {
                        summary.marked += 1;
                    }
                } else if self.purge(&tile).await {
                    summary.purged += 1;
                }
            }
        }
        debug!(
            candidates = summary.candidates,
            marked = summary.marked,
            purged = summary.purged,
            elapsed_ms = phase.elapsed().as_millis() as u64,
            "Processed zoom pyramids"
        );

        if summary.marked > 0 {
            self.signal.resume();
        }

        let phase = Instant::now();
        for path in &files {
            remove_if_exists(path)
                .await
                .map_err(|source| MarkerError::RemoveNotification {
                    path: path.clone(),
                    source,
                })?;
        }
        debug!(
            elapsed_ms = phase.elapsed().as_millis() as u64,
            "Deleted expiry notifications"
        );

        info!(
            notifications = summary.notifications,
            coarse_tiles = summary.coarse_tiles,
            candidates = summary.candidates,
            purged = summary.purged,
            marked = summary.marked,
            dirty = self.registry.size(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Marker pass complete"
        );
        Ok(summary)
    }

    /// Mark a tile dirty if it has a cached image. Marker file first, then
    /// registry, so a crash in between only over-reports dirtiness.
    async fn mark_existing(&self, tile: &TileCoord) -> Result<bool, MarkerError> {
        let mark_err = |source: io::Error| MarkerError::Mark {
            tile: *tile,
            source,
        };

        if !self.store.has_image(tile).await.map_err(mark_err)? {
            return Ok(false);
        }
        self.store.touch_dirty_marker(tile).await.map_err(mark_err)?;
        self.registry.mark(DirtyRecord::new(*tile, now_millis()));
        Ok(true)
    }

    /// Best-effort image purge. Returns `true` if a file was deleted.
    async fn purge(&self, tile: &TileCoord) -> bool {
        match self.store.purge_image(tile).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(tile = %tile, error = %e, "Failed to purge unrendered zoom image");
                false
            }
        }
    }
}

/// All files one level below the shard subdirectories of `expires_dir`.
async fn collect_notifications(expires_dir: &Path) -> Result<Vec<PathBuf>, MarkerError> {
    let read_dir_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| MarkerError::ReadDir { path, source }
    };

    let mut shards = match fs::read_dir(expires_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %expires_dir.display(), "Expires directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(read_dir_err(expires_dir)(e)),
    };

    let mut files = Vec::new();
    while let Some(shard) = shards
        .next_entry()
        .await
        .map_err(read_dir_err(expires_dir))?
    {
        let shard_path = shard.path();
        if !shard
            .file_type()
            .await
            .map_err(read_dir_err(&shard_path))?
            .is_dir()
        {
            continue;
        }

        let mut entries = fs::read_dir(&shard_path)
            .await
            .map_err(read_dir_err(&shard_path))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(read_dir_err(&shard_path))?
        {
            if entry
                .file_type()
                .await
                .map_err(read_dir_err(&shard_path))?
                .is_file()
            {
                files.push(entry.path());
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Parse and dedupe the tile ids of every notification file.
async fn read_coarse_tiles(files: &[PathBuf]) -> Result<BTreeSet<TileCoord>, MarkerError> {
    let mut tiles = BTreeSet::new();
    for path in files {
        let contents = fs::read_to_string(path).await.map_err(|source| {
            MarkerError::ReadNotification {
                path: path.clone(),
                source,
            }
        })?;

        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            let tile = parse_tile(line).map_err(|source| MarkerError::MalformedTile {
                path: path.clone(),
                source,
            })?;
            tiles.insert(tile);
        }
    }
    Ok(tiles)
}
