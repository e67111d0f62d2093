//! Cache path construction.

use crate::coord::TileCoord;
use std::path::{Path, PathBuf};

/// File extension of rendered tile images.
pub const IMAGE_EXTENSION: &str = "png";

/// File extension of dirty marker files.
pub const DIRTY_EXTENSION: &str = "dirty";

/// Construct the full path for a cached tile image.
///
/// ```text
/// <cache_dir>/<zoom>/<x>/<y>.png
/// ```
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use tilekeeper::cache::image_path;
/// use tilekeeper::coord::TileCoord;
///
/// let path = image_path(&PathBuf::from("/tiles"), &TileCoord::new(14, 8800, 5377));
/// assert_eq!(path, PathBuf::from("/tiles/14/8800/5377.png"));
/// ```
pub fn image_path(cache_dir: &Path, tile: &TileCoord) -> PathBuf {
    tile_file(cache_dir, tile, IMAGE_EXTENSION)
}

/// Construct the path of the zero-byte dirty marker next to a tile image.
///
/// ```text
/// <cache_dir>/<zoom>/<x>/<y>.dirty
/// ```
pub fn dirty_marker_path(cache_dir: &Path, tile: &TileCoord) -> PathBuf {
    tile_file(cache_dir, tile, DIRTY_EXTENSION)
}

/// Get the directory holding all tiles of one column.
pub fn column_directory(cache_dir: &Path, tile: &TileCoord) -> PathBuf {
    cache_dir.join(tile.zoom.to_string()).join(tile.x.to_string())
}

fn tile_file(cache_dir: &Path, tile: &TileCoord, extension: &str) -> PathBuf {
    column_directory(cache_dir, tile).join(format!("{}.{}", tile.y, extension))
}
