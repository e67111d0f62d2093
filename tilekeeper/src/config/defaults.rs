//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::coord::{MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

// =============================================================================
// Zoom
// =============================================================================

/// Default lowest zoom served (pyramid expansion floor).
pub const DEFAULT_MIN_ZOOM: u8 = 0;

/// Default highest zoom served (pyramid expansion ceiling).
pub const DEFAULT_MAX_ZOOM: u8 = 19;

/// Default lowest prerendered zoom.
pub const DEFAULT_PRERENDER_MIN_ZOOM: u8 = 0;

/// Default highest prerendered zoom. Deeper zooms are purged on expiry and
/// rendered on demand.
pub const DEFAULT_PRERENDER_MAX_ZOOM: u8 = 12;

// =============================================================================
// Directories and files
// =============================================================================

/// Default tile cache directory name under the config directory.
pub const DEFAULT_TILES_DIR_NAME: &str = "tiles";

/// Default expiry notification directory name under the config directory.
pub const DEFAULT_EXPIRES_DIR_NAME: &str = "expires";

/// Default log file name under the config directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "tilekeeper.log";

// =============================================================================
// Timing
// =============================================================================

/// Default interval between marker passes (seconds).
pub const DEFAULT_EXPIRES_INTERVAL_SECS: u64 = 60;

impl Default for ConfigFile {
    fn default() -> Self {
        let base = config_directory();
        Self {
            zoom: ZoomSettings {
                min: DEFAULT_MIN_ZOOM,
                max: DEFAULT_MAX_ZOOM,
            },
            dirs: DirsSettings {
                tiles: base.join(DEFAULT_TILES_DIR_NAME),
                expires: base.join(DEFAULT_EXPIRES_DIR_NAME),
            },
            prerender: PrerenderSettings {
                min_zoom: DEFAULT_PRERENDER_MIN_ZOOM,
                max_zoom: DEFAULT_PRERENDER_MAX_ZOOM,
                zoom_prio: Vec::new(),
                workers: None,
                min_lon: MIN_LON,
                max_lon: MAX_LON,
                min_lat: MIN_LAT,
                max_lat: MAX_LAT,
            },
            render: RenderSettings {
                rerender_older_than_ms: None,
                command: None,
            },
            expires: ExpiresSettings {
                interval_secs: DEFAULT_EXPIRES_INTERVAL_SECS,
            },
            logging: LoggingSettings {
                file: default_log_file(),
            },
        }
    }
}

/// Default log file path (~/.tilekeeper/tilekeeper.log).
pub fn default_log_file() -> PathBuf {
    config_directory().join(DEFAULT_LOG_FILE_NAME)
}
