//! Spherical Web-Mercator projection math.
//!
//! Converts between geographic coordinates, fractional tile-grid coordinates
//! and world-pixel coordinates at an integer zoom level, following the
//! standard slippy-map tiling scheme
//! (<https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames>).
//!
//! Everything in this module is pure math: no state, no I/O. The forward and
//! inverse projections are total for latitudes strictly inside (-90, 90);
//! the poles map to ±infinity under Mercator and must not be passed in.
//! This is a documented precondition, not a runtime check.

/// Tile edge length in pixels, fixed by the tile-provider protocol.
pub const TILE_SIZE: u32 = 256;

/// Highest zoom level considered by the zoom selector.
pub const MAX_ZOOM: u8 = 18;

/// Lowest zoom level; the selector never goes below this floor.
pub const MIN_ZOOM: u8 = 1;

// =============================================================================
// Coordinate Types
// =============================================================================

/// A geographic coordinate in degrees.
///
/// Longitude in [-180, 180], latitude strictly inside (-90, 90).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Longitude in degrees
    pub lon: f64,
    /// Latitude in degrees
    pub lat: f64,
}

impl GeoPoint {
    /// Create a point from longitude and latitude in degrees.
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Fractional tile-grid coordinates at a zoom level.
///
/// `floor(x)` / `floor(y)` give the integer tile index. For in-range
/// geographic input the invariant `0 <= x, y < 2^zoom` holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileCoord {
    /// Zoom level the coordinates are expressed at
    pub zoom: u8,
    /// Fractional tile column (west -> east)
    pub x: f64,
    /// Fractional tile row (north -> south)
    pub y: f64,
}

impl TileCoord {
    /// World-pixel coordinates of this point (`tile * 256`).
    pub fn pixel(&self) -> PixelCoord {
        PixelCoord {
            x: self.x * TILE_SIZE as f64,
            y: self.y * TILE_SIZE as f64,
        }
    }

    /// Integer tile index containing this point.
    pub fn tile_index(&self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }
}

/// A point in world-pixel space at a zoom level (`pixel = tile * 256`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelCoord {
    pub x: f64,
    pub y: f64,
}

impl PixelCoord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert back to fractional tile-grid coordinates at `zoom`.
    pub fn tile(&self, zoom: u8) -> TileCoord {
        TileCoord {
            zoom,
            x: self.x / TILE_SIZE as f64,
            y: self.y / TILE_SIZE as f64,
        }
    }
}

// =============================================================================
// Projection
// =============================================================================

/// Forward Web-Mercator projection: geographic -> fractional tile grid.
///
/// `n = 2^zoom`; `x = (lon + 180) / 360 * n`;
/// `y = (1 - asinh(tan(lat)) / pi) / 2 * n`.
///
/// Latitude must be strictly inside (-90, 90); the poles are undefined
/// under Mercator.
pub fn project(point: GeoPoint, zoom: u8) -> TileCoord {
    let n = f64::powi(2.0, zoom as i32);
    let lat_rad = point.lat.to_radians();

    let x = (point.lon + 180.0) / 360.0 * n;
    let y = (1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * n;

    TileCoord { zoom, x, y }
}

/// Inverse Web-Mercator projection: fractional tile grid -> geographic.
///
/// `lon = x / n * 360 - 180`; `lat = atan(sinh(pi * (1 - 2 * y / n)))`.
pub fn unproject(tile: TileCoord) -> GeoPoint {
    let n = f64::powi(2.0, tile.zoom as i32);

    let lon = tile.x / n * 360.0 - 180.0;
    let lat_rad = (std::f64::consts::PI * (1.0 - 2.0 * tile.y / n)).sinh().atan();

    GeoPoint {
        lon,
        lat: lat_rad.to_degrees(),
    }
}

// =============================================================================
// Bounding Box
// =============================================================================

/// Minimal axis-aligned rectangle enclosing a coordinate set.
///
/// Stored as its northwest and southeast corners; `northwest.lat >=
/// southeast.lat` by construction. Built once per render from the raw
/// geometry's extrema and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub northwest: GeoPoint,
    pub southeast: GeoPoint,
}

impl BoundingBox {
    /// Build a box from explicit extrema.
    pub fn new(min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> Self {
        Self {
            northwest: GeoPoint::new(min_lon, max_lat),
            southeast: GeoPoint::new(max_lon, min_lat),
        }
    }

    /// Minimal box enclosing all points, or `None` for an empty iterator.
    ///
    /// A single point yields a degenerate box with zero width and height;
    /// that is a valid input for zoom selection and viewport planning.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;

        let mut min_lon = first.lon;
        let mut max_lon = first.lon;
        let mut min_lat = first.lat;
        let mut max_lat = first.lat;

        for p in iter {
            min_lon = min_lon.min(p.lon);
            max_lon = max_lon.max(p.lon);
            min_lat = min_lat.min(p.lat);
            max_lat = max_lat.max(p.lat);
        }

        Some(Self::new(min_lon, max_lon, min_lat, max_lat))
    }

    /// Geographic midpoint of the box (arithmetic mean of the corners).
    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lon: (self.northwest.lon + self.southeast.lon) / 2.0,
            lat: (self.northwest.lat + self.southeast.lat) / 2.0,
        }
    }

    /// Northeast corner (max lon, max lat).
    pub fn northeast(&self) -> GeoPoint {
        GeoPoint::new(self.southeast.lon, self.northwest.lat)
    }

    /// Southwest corner (min lon, min lat).
    pub fn southwest(&self) -> GeoPoint {
        GeoPoint::new(self.northwest.lon, self.southeast.lat)
    }
}

// =============================================================================
// Tests
// =============================================================================
