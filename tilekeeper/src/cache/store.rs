//! Filesystem view of the tile cache.
//!
//! Only file existence and modification times matter here; image contents
//! belong to the renderer.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use super::path::{dirty_marker_path, image_path};
use crate::coord::TileCoord;
use crate::registry::{DirtyRecord, DirtyRegistry};
use crate::time::system_time_to_millis;

/// Rendered tiles and their dirty markers under one cache directory.
#[derive(Debug, Clone)]
pub struct TileStore {
    root: PathBuf,
}

impl TileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache directory root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn image_path(&self, tile: &TileCoord) -> PathBuf {
        image_path(&self.root, tile)
    }

    pub fn marker_path(&self, tile: &TileCoord) -> PathBuf {
        dirty_marker_path(&self.root, tile)
    }

    /// Whether a rendered image exists for the tile.
    pub async fn has_image(&self, tile: &TileCoord) -> io::Result<bool> {
        Ok(self.image_modified(tile).await?.is_some())
    }

    /// Modification time of the tile image in epoch milliseconds.
    ///
    /// Returns `None` when no image exists.
    pub async fn image_modified(&self, tile: &TileCoord) -> io::Result<Option<u64>> {
        modified_millis(&self.image_path(tile)).await
    }

    /// Modification time of the tile's dirty marker in epoch milliseconds.
    ///
    /// Returns `None` when the tile has no marker.
    pub async fn marker_modified(&self, tile: &TileCoord) -> io::Result<Option<u64>> {
        modified_millis(&self.marker_path(tile)).await
    }

    /// Create (or truncate) the empty dirty marker for a tile and flush it.
    pub async fn touch_dirty_marker(&self, tile: &TileCoord) -> io::Result<()> {
        let path = self.marker_path(tile);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let file = fs::File::create(&path).await?;
        file.sync_all().await
    }

    /// Delete a tile image. A missing image is not an error.
    ///
    /// Returns `true` if a file was removed.
    pub async fn purge_image(&self, tile: &TileCoord) -> io::Result<bool> {
        remove_if_exists(&self.image_path(tile)).await
    }

    /// Delete a tile's dirty marker. A missing marker is not an error.
    ///
    /// Returns `true` if a file was removed.
    pub async fn clear_dirty_marker(&self, tile: &TileCoord) -> io::Result<bool> {
        remove_if_exists(&self.marker_path(tile)).await
    }

    /// Forget a successfully rendered tile.
    ///
    /// The registry entry is dropped only if it still holds `record`; the
    /// marker is removed only when that happened, so a tile dirtied again
    /// mid-render keeps both. Returns `true` if `record` was cleared.
    pub async fn clear_rendered(
        &self,
        registry: &DirtyRegistry,
        record: &DirtyRecord,
    ) -> io::Result<bool> {
        if !registry.remove_if_unchanged(record) {
            return Ok(false);
        }
        self.clear_marker_unless_dirty(registry, &record.tile()).await?;
        Ok(true)
    }

    /// Delete a tile's marker, then restore it if the tile is back in the
    /// registry.
    ///
    /// A marker pass can write a fresh marker and re-insert the tile between
    /// the registry removal and the delete. Every registry entry must keep its
    /// marker on disk, so the marker is rewritten in that case.
    async fn clear_marker_unless_dirty(
        &self,
        registry: &DirtyRegistry,
        tile: &TileCoord,
    ) -> io::Result<()> {
        self.clear_dirty_marker(tile).await?;
        if registry.contains(tile) {
            debug!(tile = %tile, "Tile dirtied again during clear, restoring marker");
            self.touch_dirty_marker(tile).await?;
        }
        Ok(())
    }
}

/// Modification time of `path` in epoch milliseconds, `None` if absent.
pub async fn modified_millis(path: &Path) -> io::Result<Option<u64>> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(Some(system_time_to_millis(meta.modified()?))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Remove a file, treating "already gone" as success.
///
/// Only `NotFound` is absorbed; permission or device errors still surface.
pub async fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write_image(store: &TileStore, tile: &TileCoord) {
        let path = store.image_path(tile);
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(&path, b"png").await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_files_report_none() {
        let temp = TempDir::new().unwrap();
        let store = TileStore::new(temp.path());
        let tile = TileCoord::new(12, 5, 5);

        assert_eq!(store.image_modified(&tile).await.unwrap(), None);
        assert_eq!(store.marker_modified(&tile).await.unwrap(), None);
        assert!(!store.has_image(&tile).await.unwrap());
    }

    #[tokio::test]
    async fn test_touch_marker_creates_empty_file() {
        let temp = TempDir::new().unwrap();
        let store = TileStore::new(temp.path());
        let tile = TileCoord::new(14, 100, 200);

        store.touch_dirty_marker(&tile).await.unwrap();

        let meta = fs::metadata(store.marker_path(&tile)).await.unwrap();
        assert_eq!(meta.len(), 0);
        assert!(store.marker_modified(&tile).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_ignores_missing_image() {
        let temp = TempDir::new().unwrap();
        let store = TileStore::new(temp.path());
        let tile = TileCoord::new(8, 1, 1);

        assert!(!store.purge_image(&tile).await.unwrap());

        write_image(&store, &tile).await;
        assert!(store.purge_image(&tile).await.unwrap());
        assert!(!store.has_image(&tile).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_if_exists_surfaces_other_errors() {
        let temp = TempDir::new().unwrap();
        // Removing a directory with remove_file fails with something other than NotFound.
        let result = remove_if_exists(temp.path()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_clear_rendered_removes_entry_and_marker() {
        let temp = TempDir::new().unwrap();
        let store = TileStore::new(temp.path());
        let registry = DirtyRegistry::new();
        let tile = TileCoord::new(14, 100, 200);
        let record = DirtyRecord::new(tile, 42);

        store.touch_dirty_marker(&tile).await.unwrap();
        registry.mark(record);

        assert!(store.clear_rendered(&registry, &record).await.unwrap());
        assert!(registry.is_empty());
        assert_eq!(store.marker_modified(&tile).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_rendered_keeps_redirtied_tile() {
        let temp = TempDir::new().unwrap();
        let store = TileStore::new(temp.path());
        let registry = DirtyRegistry::new();
        let tile = TileCoord::new(14, 100, 200);
        let rendered = DirtyRecord::new(tile, 42);

        store.touch_dirty_marker(&tile).await.unwrap();
        registry.mark(DirtyRecord::new(tile, 43));

        assert!(!store.clear_rendered(&registry, &rendered).await.unwrap());
        assert!(registry.contains(&tile));
        assert!(store.marker_modified(&tile).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_marker_restored_when_tile_reappears_during_clear() {
        let temp = TempDir::new().unwrap();
        let store = TileStore::new(temp.path());
        let registry = DirtyRegistry::new();
        let tile = TileCoord::new(14, 100, 200);

        // The rendered record is already gone; a marker pass has since
        // written a fresh marker and re-inserted the tile.
        store.touch_dirty_marker(&tile).await.unwrap();
        registry.mark(DirtyRecord::new(tile, 43));

        store.clear_marker_unless_dirty(&registry, &tile).await.unwrap();

        assert!(registry.contains(&tile));
        assert!(store.marker_modified(&tile).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_marker_cleared_when_tile_stays_clean() {
        let temp = TempDir::new().unwrap();
        let store = TileStore::new(temp.path());
        let registry = DirtyRegistry::new();
        let tile = TileCoord::new(14, 100, 200);

        store.touch_dirty_marker(&tile).await.unwrap();

        store.clear_marker_unless_dirty(&registry, &tile).await.unwrap();

        assert_eq!(store.marker_modified(&tile).await.unwrap(), None);
    }
}
