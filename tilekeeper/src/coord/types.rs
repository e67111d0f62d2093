//! Coordinate type definitions

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Deepest zoom level a [`TileKey`] can address.
///
/// Keys pack zoom into 6 bits and each axis into 29 bits.
pub const MAX_ZOOM: u8 = 29;

/// Tile coordinates in the XYZ (slippy map) scheme.
///
/// `x` grows eastwards and `y` grows southwards, both starting at 0 in the
/// north-west corner of the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Zoom level
    pub zoom: u8,
    /// Column (east-west)
    pub x: u32,
    /// Row (north-south), 0 at north
    pub y: u32,
}

impl TileCoord {
    /// Creates a tile coordinate without range validation.
    #[inline]
    pub const fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Returns the registry key for this tile.
    #[inline]
    pub fn key(&self) -> TileKey {
        TileKey::from(*self)
    }

    /// Returns the tile covering this one at a coarser `zoom`.
    ///
    /// Returns `None` if `zoom` is finer than this tile's zoom.
    #[inline]
    pub fn ancestor_at(&self, zoom: u8) -> Option<TileCoord> {
        let shift = self.zoom.checked_sub(zoom)?;
        Some(TileCoord {
            zoom,
            x: self.x >> shift,
            y: self.y >> shift,
        })
    }

    /// Returns the four tiles covering this one at the next zoom level.
    #[inline]
    pub fn children(&self) -> [TileCoord; 4] {
        let zoom = self.zoom + 1;
        let (x, y) = (self.x << 1, self.y << 1);
        [
            TileCoord::new(zoom, x, y),
            TileCoord::new(zoom, x + 1, y),
            TileCoord::new(zoom, x, y + 1),
            TileCoord::new(zoom, x + 1, y + 1),
        ]
    }

    /// Number of tiles per axis at this tile's zoom level.
    #[inline]
    pub fn axis_len(&self) -> u64 {
        1u64 << self.zoom
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

impl FromStr for TileCoord {
    type Err = TileParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::parse_tile(s)
    }
}

/// Registry key derived from a tile's zoom, column and row.
///
/// Two tiles produce the same key exactly when all three components match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey(u64);

impl TileKey {
    /// Raw packed value.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<TileCoord> for TileKey {
    #[inline]
    fn from(tile: TileCoord) -> Self {
        const AXIS_MASK: u64 = (1 << 29) - 1;
        TileKey(
            (u64::from(tile.zoom) << 58)
                | ((u64::from(tile.x) & AXIS_MASK) << 29)
                | (u64::from(tile.y) & AXIS_MASK),
        )
    }
}

impl From<TileKey> for TileCoord {
    #[inline]
    fn from(key: TileKey) -> Self {
        const AXIS_MASK: u64 = (1 << 29) - 1;
        TileCoord {
            zoom: (key.0 >> 58) as u8,
            x: ((key.0 >> 29) & AXIS_MASK) as u32,
            y: (key.0 & AXIS_MASK) as u32,
        }
    }
}

/// Geographic bounding box in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        }
    }

    /// The whole Web Mercator world.
    pub fn world() -> Self {
        Self::new(MIN_LON, MAX_LON, MIN_LAT, MAX_LAT)
    }
}

/// Errors raised while reading a tile identifier such as `"14/8800/5377"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileParseError {
    /// The identifier is not three `/`-separated non-negative integers.
    #[error("Malformed tile id '{0}' (expected zoom/x/y)")]
    Malformed(String),

    /// The zoom is deeper than a tile key can address.
    #[error("Tile id '{id}' has zoom {zoom} (must be at most {MAX_ZOOM})")]
    ZoomOutOfRange { id: String, zoom: u32 },

    /// Column or row does not exist at the tile's zoom.
    #[error("Tile id '{0}' lies outside the tile grid of its zoom level")]
    OutOfGrid(String),
}
