//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Zoom range served by the tile server
    pub zoom: ZoomSettings,
    /// Tile cache and notification directories
    pub dirs: DirsSettings,
    /// Prerender scheduling and startup scan settings
    pub prerender: PrerenderSettings,
    /// Render collaborator settings
    pub render: RenderSettings,
    /// Expiry notification polling
    pub expires: ExpiresSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Global zoom range. Expired tiles are expanded across all of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoomSettings {
    pub min: u8,
    pub max: u8,
}

/// Filesystem locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirsSettings {
    /// Tile cache root (`<tiles>/<z>/<x>/<y>.png`)
    pub tiles: PathBuf,
    /// Expiry notification root, one subdirectory per shard
    pub expires: PathBuf,
}

/// Prerender settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PrerenderSettings {
    /// Lowest zoom kept rendered
    pub min_zoom: u8,
    /// Highest zoom kept rendered
    pub max_zoom: u8,
    /// Zoom levels in dispatch order
    pub zoom_prio: Vec<u8>,
    /// Concurrent renders (None = available parallelism)
    pub workers: Option<usize>,
    /// Startup scan bounding box
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

/// Render collaborator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    /// Images last modified before this epoch-ms instant are re-rendered
    pub rerender_older_than_ms: Option<u64>,
    /// External renderer command line with `{zoom}`, `{x}`, `{y}`, `{path}`
    pub command: Option<String>,
}

/// Expiry notification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiresSettings {
    /// Seconds between marker passes
    pub interval_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
