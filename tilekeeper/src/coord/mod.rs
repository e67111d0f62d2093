//! Tile coordinate model.
//!
//! Pure functions over XYZ tile identifiers:
//!
//! - parsing `"zoom/x/y"` identifiers as they appear in expiry notifications
//! - zoom pyramid expansion (a change at one zoom invalidates the same
//!   geography at every other cached zoom)
//! - enumerating the tiles covering a bounding box over a zoom span

mod types;


pub use types::{
    BoundingBox, TileCoord, TileKey, TileParseError, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
};

use std::f64::consts::PI;
use std::ops::RangeInclusive;

/// Parses a `"zoom/x/y"` tile identifier.
///
/// Surrounding whitespace is ignored. Column and row must exist in the tile
/// grid of the given zoom.
pub fn parse_tile(id: &str) -> Result<TileCoord, TileParseError> {
    let trimmed = id.trim();
    let mut parts = trimmed.split('/');

    let (Some(zoom), Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TileParseError::Malformed(trimmed.to_string()));
    };

    let parse = |s: &str| {
        s.parse::<u32>()
            .map_err(|_| TileParseError::Malformed(trimmed.to_string()))
    };
    let (zoom, x, y) = (parse(zoom)?, parse(x)?, parse(y)?);

    if zoom > u32::from(MAX_ZOOM) {
        return Err(TileParseError::ZoomOutOfRange {
            id: trimmed.to_string(),
            zoom,
        });
    }

    let tile = TileCoord::new(zoom as u8, x, y);
    if u64::from(x) >= tile.axis_len() || u64::from(y) >= tile.axis_len() {
        return Err(TileParseError::OutOfGrid(trimmed.to_string()));
    }

    Ok(tile)
}

/// Returns the registry key of a tile.
#[inline]
pub fn tile_key(tile: &TileCoord) -> TileKey {
    tile.key()
}

/// Lazily walks the zoom pyramid of one tile.
///
/// For every zoom in `min_zoom..=max_zoom` this yields the tiles covering the
/// same area as the source tile: the single ancestor for coarser zooms, the
/// tile itself, and all descendants for finer zooms. Zooms outside the range
/// contribute nothing, so a tile whose own zoom is out of range still yields
/// its in-range relatives.
///
/// Nothing is buffered; a low-zoom tile over a deep range yields billions of
/// tiles without allocating.
#[derive(Debug, Clone)]
pub struct ZoomPyramid {
    tile: TileCoord,
    zooms: RangeInclusive<u8>,
    block: Option<DescendantBlock>,
}

/// Square block of descendants at one zoom, walked column by column.
#[derive(Debug, Clone)]
struct DescendantBlock {
    zoom: u8,
    x0: u32,
    y0: u32,
    span: u32,
    dx: u32,
    dy: u32,
}

impl Iterator for DescendantBlock {
    type Item = TileCoord;

    fn next(&mut self) -> Option<TileCoord> {
        if self.dx >= self.span {
            return None;
        }
        let tile = TileCoord::new(self.zoom, self.x0 + self.dx, self.y0 + self.dy);
        self.dy += 1;
        if self.dy == self.span {
            self.dy = 0;
            self.dx += 1;
        }
        Some(tile)
    }
}

impl ZoomPyramid {
    pub fn new(tile: TileCoord, min_zoom: u8, max_zoom: u8) -> Self {
        Self {
            tile,
            zooms: min_zoom..=max_zoom.min(MAX_ZOOM),
            block: None,
        }
    }

    /// Number of tiles the full walk yields.
    pub fn tile_count(tile: &TileCoord, min_zoom: u8, max_zoom: u8) -> u64 {
        (min_zoom..=max_zoom.min(MAX_ZOOM))
            .map(|zoom| match zoom.checked_sub(tile.zoom) {
                None | Some(0) => 1,
                Some(shift) => 1u64 << (2 * u32::from(shift)),
            })
            .sum()
    }
}

impl Iterator for ZoomPyramid {
    type Item = TileCoord;

    fn next(&mut self) -> Option<TileCoord> {
        loop {
            if let Some(tile) = self.block.as_mut().and_then(Iterator::next) {
                return Some(tile);
            }
            let zoom = self.zooms.next()?;
            if let Some(ancestor) = self.tile.ancestor_at(zoom) {
                self.block = None;
                return Some(ancestor);
            }
            let shift = zoom - self.tile.zoom;
            self.block = Some(DescendantBlock {
                zoom,
                x0: self.tile.x << shift,
                y0: self.tile.y << shift,
                span: 1u32 << shift,
                dx: 0,
                dy: 0,
            });
        }
    }
}

/// Appends the zoom pyramid of `tile` to `out`. See [`ZoomPyramid`].
///
/// Output order is not meaningful and duplicates across calls are expected.
pub fn extend_zoomed_tiles(out: &mut Vec<TileCoord>, tile: TileCoord, min_zoom: u8, max_zoom: u8) {
    out.extend(ZoomPyramid::new(tile, min_zoom, max_zoom));
}

/// Convenience wrapper around [`extend_zoomed_tiles`] for a single tile.
pub fn zoomed_tiles(tile: TileCoord, min_zoom: u8, max_zoom: u8) -> Vec<TileCoord> {
    let mut out = Vec::new();
    extend_zoomed_tiles(&mut out, tile, min_zoom, max_zoom);
    out
}

/// Column index of the tile containing `lon` at `zoom`, clamped to the grid.
#[inline]
pub fn lon_to_tile_x(lon: f64, zoom: u8) -> u32 {
    let n = 2.0_f64.powi(zoom as i32);
    lon_fraction(lon, n).floor().clamp(0.0, n - 1.0) as u32
}

/// Row index of the tile containing `lat` at `zoom`, clamped to the grid.
#[inline]
pub fn lat_to_tile_y(lat: f64, zoom: u8) -> u32 {
    let n = 2.0_f64.powi(zoom as i32);
    lat_fraction(lat, n).floor().clamp(0.0, n - 1.0) as u32
}

/// Fractional column of `lon` in a grid `n` tiles wide.
fn lon_fraction(lon: f64, n: f64) -> f64 {
    (lon.clamp(MIN_LON, MAX_LON) + 180.0) / 360.0 * n
}

/// Fractional row of `lat` in a grid `n` tiles high.
fn lat_fraction(lat: f64, n: f64) -> f64 {
    let lat_rad = lat.clamp(MIN_LAT, MAX_LAT).to_radians();
    (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n
}

/// Last tile index reached by a box whose far edge sits at `edge`.
///
/// An edge exactly on a tile boundary only touches the next tile, so that
/// tile is excluded.
fn last_index_before(edge: f64, n: f64) -> u32 {
    let floor = edge.floor();
    let index = if edge == floor && edge > 0.0 {
        floor - 1.0
    } else {
        floor
    };
    index.clamp(0.0, n - 1.0) as u32
}

/// Returns the latitude/longitude of a tile's north-west corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);
    let lon = tile.x as f64 / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * tile.y as f64 / n)).sinh().atan().to_degrees();
    (lat, lon)
}

/// Lazily enumerates every tile intersecting a bounding box, zoom by zoom.
///
/// The iterator is finite and `Clone`, so a fresh copy restarts the walk.
/// Within one zoom tiles are yielded column by column, north to south.
/// A tile that only shares an edge with the box's east or south side is not
/// part of the range.
#[derive(Debug, Clone)]
pub struct TileRange {
    bbox: BoundingBox,
    min_zoom: u8,
    max_zoom: u8,
    zooms: RangeInclusive<u8>,
    current: Option<ZoomCursor>,
}

#[derive(Debug, Clone)]
struct ZoomCursor {
    zoom: u8,
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
    x: u32,
    y: u32,
}

impl ZoomCursor {
    fn new(bbox: &BoundingBox, zoom: u8) -> Self {
        let n = 2.0_f64.powi(zoom as i32);
        let min_x = lon_to_tile_x(bbox.min_lon, zoom);
        // Rows grow southwards, so the northern edge gives the smaller row.
        let min_y = lat_to_tile_y(bbox.max_lat, zoom);
        // Far edges are exclusive for boxes with extent; a degenerate box
        // still covers the tile containing it.
        let max_x = if bbox.max_lon > bbox.min_lon {
            last_index_before(lon_fraction(bbox.max_lon, n), n)
        } else {
            lon_to_tile_x(bbox.max_lon, zoom)
        };
        let max_y = if bbox.min_lat < bbox.max_lat {
            last_index_before(lat_fraction(bbox.min_lat, n), n)
        } else {
            lat_to_tile_y(bbox.min_lat, zoom)
        };
        Self {
            zoom,
            min_x,
            max_x,
            min_y,
            max_y,
            x: min_x,
            y: min_y,
        }
    }

    fn len(&self) -> u64 {
        if self.min_x > self.max_x || self.min_y > self.max_y {
            return 0;
        }
        u64::from(self.max_x - self.min_x + 1) * u64::from(self.max_y - self.min_y + 1)
    }

    fn next(&mut self) -> Option<TileCoord> {
        if self.x > self.max_x || self.min_y > self.max_y {
            return None;
        }
        let tile = TileCoord::new(self.zoom, self.x, self.y);
        if self.y < self.max_y {
            self.y += 1;
        } else {
            self.y = self.min_y;
            self.x += 1;
        }
        Some(tile)
    }
}

impl TileRange {
    /// Creates a range over `bbox` for every zoom in `min_zoom..=max_zoom`.
    pub fn new(bbox: BoundingBox, min_zoom: u8, max_zoom: u8) -> Self {
        let max_zoom = max_zoom.min(MAX_ZOOM);
        Self {
            bbox,
            min_zoom,
            max_zoom,
            zooms: min_zoom..=max_zoom,
            current: None,
        }
    }

    /// Total number of tiles the range yields, across all zooms.
    pub fn tile_count(&self) -> u64 {
        (self.min_zoom..=self.max_zoom).map(|z| ZoomCursor::new(&self.bbox, z).len()).sum()
    }
}

impl Iterator for TileRange {
    type Item = TileCoord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(cursor) = self.current.as_mut() {
                if let Some(tile) = cursor.next() {
                    return Some(tile);
                }
            }
            let zoom = self.zooms.next()?;
            self.current = Some(ZoomCursor::new(&self.bbox, zoom));
        }
    }
}

/// Enumerates the tiles intersecting a bounding box for every zoom in range.
pub fn tile_range(
    min_lon: f64,
    max_lon: f64,
    min_lat: f64,
    max_lat: f64,
    min_zoom: u8,
    max_zoom: u8,
) -> TileRange {
    TileRange::new(
        BoundingBox::new(min_lon, max_lon, min_lat, max_lat),
        min_zoom,
        max_zoom,
    )
}
