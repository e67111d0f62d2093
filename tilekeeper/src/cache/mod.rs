//! On-disk tile cache layout.
//!
//! Rendered tiles live at `<cache_dir>/<zoom>/<x>/<y>.png`; a tile that must
//! be re-rendered carries a zero-byte sibling `<y>.dirty`. The marker is what
//! makes dirtiness survive a restart.

mod path;
mod store;

pub use path::{column_directory, dirty_marker_path, image_path, DIRTY_EXTENSION, IMAGE_EXTENSION};
pub use store::{modified_millis, remove_if_exists, TileStore};
