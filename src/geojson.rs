//! GeoJSON geometry parsing.
//!
//! Accepts a single `LineString` (one open path) or `MultiPolygon` (one or
//! more polygons, each with an outer ring and optional holes). Positions are
//! `[lon, lat]` or `[lon, lat, elevation]`; elevation is ignored.
//!
//! Malformed documents are rejected here, before any projection or network
//! work happens.

use serde::Deserialize;

use crate::error::GeometryError;
use crate::mercator::{BoundingBox, GeoPoint};

/// A ring of coordinates together with its drawing mode.
#[derive(Debug, Clone, Copy)]
pub struct Ring<'a> {
    /// Ordered coordinates of the ring
    pub points: &'a [GeoPoint],
    /// Whether the stroke should connect the last point back to the first
    pub closed: bool,
}

/// A parsed input geometry.
///
/// `LineString` is a single open track; `MultiPolygon` holds polygons as
/// lists of rings (outer ring first, then holes), all drawn as closed
/// strokes with transparent fill.
#[derive(Debug, Clone)]
pub enum Geometry {
    LineString(Vec<GeoPoint>),
    MultiPolygon(Vec<Vec<Vec<GeoPoint>>>),
}

/// Raw document shape for serde; coordinates are validated in a second pass
/// because their nesting depth depends on the geometry type.
#[derive(Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: serde_json::Value,
}

impl Geometry {
    /// Parse a GeoJSON document.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the document is not valid JSON, the
    /// geometry type is unsupported, the coordinate arrays are malformed,
    /// or the geometry is empty.
    pub fn from_geojson(document: &str) -> Result<Self, GeometryError> {
        let raw: RawGeometry = serde_json::from_str(document)
            .map_err(|e| GeometryError::InvalidJson(e.to_string()))?;

        let geometry = match raw.kind.as_str() {
            "LineString" => {
                let ring = parse_ring(&raw.coordinates)?;
                Geometry::LineString(ring)
            }
            "MultiPolygon" => {
                let polygons = raw
                    .coordinates
                    .as_array()
                    .ok_or_else(|| malformed("MultiPolygon coordinates must be an array"))?
                    .iter()
                    .map(|polygon| {
                        polygon
                            .as_array()
                            .ok_or_else(|| malformed("polygon must be an array of rings"))?
                            .iter()
                            .map(parse_ring)
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Geometry::MultiPolygon(polygons)
            }
            other => return Err(GeometryError::UnsupportedType(other.to_string())),
        };

        if geometry.is_empty() {
            return Err(GeometryError::Empty);
        }
        Ok(geometry)
    }

    /// Whether the geometry carries no coordinates at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::LineString(ring) => ring.is_empty(),
            Geometry::MultiPolygon(polygons) => polygons
                .iter()
                .all(|polygon| polygon.iter().all(|ring| ring.is_empty())),
        }
    }

    /// Total number of coordinates across all rings.
    pub fn point_count(&self) -> usize {
        self.rings().map(|r| r.points.len()).sum()
    }

    /// Iterate over all rings in drawing order.
    ///
    /// A line track yields one open ring; polygons yield each of their
    /// rings (outer and holes) as closed.
    pub fn rings(&self) -> Box<dyn Iterator<Item = Ring<'_>> + '_> {
        match self {
            Geometry::LineString(ring) => Box::new(std::iter::once(Ring {
                points: ring,
                closed: false,
            })),
            Geometry::MultiPolygon(polygons) => {
                Box::new(polygons.iter().flatten().map(|ring| Ring {
                    points: ring,
                    closed: true,
                }))
            }
        }
    }

    /// Minimal bounding box over every coordinate of every ring.
    pub fn bounding_box(&self) -> Result<BoundingBox, GeometryError> {
        BoundingBox::from_points(self.rings().flat_map(|r| r.points.iter().copied()))
            .ok_or(GeometryError::Empty)
    }
}

fn malformed(message: &str) -> GeometryError {
    GeometryError::MalformedCoordinates(message.to_string())
}

/// Parse one coordinate ring: an array of `[lon, lat]` / `[lon, lat, ele]`.
fn parse_ring(value: &serde_json::Value) -> Result<Vec<GeoPoint>, GeometryError> {
    value
        .as_array()
        .ok_or_else(|| malformed("ring must be an array of positions"))?
        .iter()
        .map(parse_position)
        .collect()
}

fn parse_position(value: &serde_json::Value) -> Result<GeoPoint, GeometryError> {
    let parts = value
        .as_array()
        .ok_or_else(|| malformed("position must be an array"))?;

    if parts.len() < 2 {
        return Err(malformed("position needs at least lon and lat"));
    }

    let lon = parts[0]
        .as_f64()
        .ok_or_else(|| malformed("longitude must be a number"))?;
    let lat = parts[1]
        .as_f64()
        .ok_or_else(|| malformed("latitude must be a number"))?;

    Ok(GeoPoint::new(lon, lat))
}

// =============================================================================
// Tests
// =============================================================================
