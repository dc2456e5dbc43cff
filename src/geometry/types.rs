//! Geometry type definitions

use geo_types::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Valid latitude range
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;

/// Valid longitude range
pub const MIN_LNG: f64 = -180.0;
pub const MAX_LNG: f64 = 180.0;

/// Minimum number of points in a closed ring (triangle plus closing point).
pub const MIN_RING_POINTS: usize = 4;

/// A geographic coordinate in degrees.
///
/// Stored in GeoJSON order (longitude first) to match the wire format of
/// region documents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    /// Longitude in degrees, east positive
    pub lng: f64,
    /// Latitude in degrees, north positive
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl fmt::Display for LngLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lng, self.lat)
    }
}

/// One polygon: an outer boundary ring plus zero or more hole rings.
///
/// Invariant (enforced by [`crate::geometry::normalize`]): every ring has at
/// least [`MIN_RING_POINTS`] points and is closed (first point equals last).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingSet {
    /// Outer boundary, wound per the source document
    pub outer: Vec<LngLat>,
    /// Hole rings subtracted from the filled area
    pub holes: Vec<Vec<LngLat>>,
}

impl RingSet {
    pub fn new(outer: Vec<LngLat>, holes: Vec<Vec<LngLat>>) -> Self {
        Self { outer, holes }
    }

    /// Total number of vertices across all rings.
    pub fn vertex_count(&self) -> usize {
        self.outer.len() + self.holes.iter().map(|h| h.len()).sum::<usize>()
    }

    /// Iterator over all rings, outer first.
    pub fn rings(&self) -> impl Iterator<Item = &Vec<LngLat>> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    /// Unweighted average of the outer ring's vertices, excluding the
    /// duplicate closing point.
    pub fn centroid(&self) -> Option<LngLat> {
        let open = open_ring(&self.outer);
        if open.is_empty() {
            return None;
        }
        let n = open.len() as f64;
        let (lng, lat) = open
            .iter()
            .fold((0.0, 0.0), |(lng, lat), p| (lng + p.lng, lat + p.lat));
        Some(LngLat::new(lng / n, lat / n))
    }

    /// Converts to a `geo` polygon for area and clipping algorithms.
    pub fn to_geo(&self) -> Polygon<f64> {
        Polygon::new(
            ring_to_line_string(&self.outer),
            self.holes.iter().map(|h| ring_to_line_string(h)).collect(),
        )
    }

    /// Builds a ring set back from a `geo` polygon, closing rings as needed.
    ///
    /// Returns `None` when the exterior is too short to form a valid ring.
    pub fn from_geo(polygon: &Polygon<f64>) -> Option<Self> {
        let outer = line_string_to_ring(polygon.exterior())?;
        let holes = polygon
            .interiors()
            .iter()
            .filter_map(line_string_to_ring)
            .collect();
        Some(Self { outer, holes })
    }
}

/// Requested rendering style for a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Style {
    /// Triangulated surface draped on the sphere
    Filled,
    /// Closed line loops tracing the boundary rings
    Outline,
    /// Three-part marker at the region centroid
    Pin,
}

impl Style {
    /// Stable lowercase name, used in cache storage paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Filled => "filled",
            Style::Outline => "outline",
            Style::Pin => "pin",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tessellation strategy for filled geometry.
///
/// `Auto` resolves through the area classifier; the other variants force a
/// strategy regardless of area. Forcing exists because some shapes with small
/// area but extreme aspect ratio triangulate pathologically without gridding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TessellationMethod {
    #[default]
    Auto,
    /// Direct ear-clipping triangulation of the full ring set
    Earcut,
    /// Grid decomposition into bounded cells before triangulation
    Grid,
}

impl TessellationMethod {
    /// Stable lowercase name, used in cache storage paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            TessellationMethod::Auto => "auto",
            TessellationMethod::Earcut => "earcut",
            TessellationMethod::Grid => "grid",
        }
    }
}

/// Size tier assigned by the area classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    /// Below 200,000 km²: triangulated directly
    Small,
    /// 200,000 to 1,000,000 km²: gridded with fine cells
    Large,
    /// Above 1,000,000 km²: gridded with coarse cells
    VeryLarge,
}

/// Returns the ring without its duplicate closing point, if present.
pub(crate) fn open_ring(ring: &[LngLat]) -> &[LngLat] {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}

fn ring_to_line_string(ring: &[LngLat]) -> LineString<f64> {
    LineString::from(
        ring.iter()
            .map(|p| Coord { x: p.lng, y: p.lat })
            .collect::<Vec<_>>(),
    )
}

fn line_string_to_ring(line: &LineString<f64>) -> Option<Vec<LngLat>> {
    let mut ring: Vec<LngLat> = line.coords().map(|c| LngLat::new(c.x, c.y)).collect();
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
        if first != last {
            ring.push(first);
        }
    }
    if ring.len() < MIN_RING_POINTS {
        return None;
    }
    Some(ring)
}
