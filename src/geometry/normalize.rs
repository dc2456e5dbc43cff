//! Ring validation and closing.
//!
//! Converts raw document geometry into [`RingSet`]s the rest of the pipeline
//! can trust: every surviving ring is closed and has at least
//! [`MIN_RING_POINTS`] points. Invalid rings and unsupported geometry types
//! are skipped with a diagnostic rather than failing the whole region.

use crate::geojson::{Geometry, RegionDocument};
use crate::geometry::types::{LngLat, RingSet, MIN_RING_POINTS};
use tracing::warn;

/// Normalizes one geometry into ring sets, one per polygon.
///
/// Unsupported geometry types yield an empty result; the caller decides
/// whether any valid geometry remains for the region.
pub fn normalize_geometry(geometry: &Geometry) -> Vec<RingSet> {
    match geometry {
        Geometry::Polygon { coordinates } => normalize_polygon(coordinates).into_iter().collect(),
        Geometry::MultiPolygon { coordinates } => coordinates
            .iter()
            .filter_map(|polygon| normalize_polygon(polygon))
            .collect(),
        Geometry::Unsupported => {
            warn!("unsupported geometry type, expected Polygon or MultiPolygon");
            Vec::new()
        }
    }
}

/// Normalizes every feature of a region document.
pub fn normalize_document(document: &RegionDocument) -> Vec<RingSet> {
    document
        .features
        .iter()
        .flat_map(|feature| normalize_geometry(&feature.geometry))
        .collect()
}

/// Normalizes one polygon's rings. The first ring is the outer boundary,
/// the rest are holes. A polygon without a valid outer ring is dropped.
fn normalize_polygon(rings: &[Vec<[f64; 2]>]) -> Option<RingSet> {
    let mut rings = rings.iter();
    let outer = close_ring(rings.next()?)?;
    let holes = rings.filter_map(|ring| close_ring(ring)).collect();
    Some(RingSet::new(outer, holes))
}

/// Closes a ring by appending its first point when needed.
///
/// Returns `None` for rings with fewer than [`MIN_RING_POINTS`] resulting
/// points; normalizing an already-closed ring yields the same ring.
pub fn close_ring(ring: &[[f64; 2]]) -> Option<Vec<LngLat>> {
    let mut points: Vec<LngLat> = ring.iter().map(|p| LngLat::new(p[0], p[1])).collect();

    if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) {
        if first != last {
            points.push(first);
        }
    }

    if points.len() < MIN_RING_POINTS {
        warn!(
            points = points.len(),
            "discarding ring with fewer than {} points", MIN_RING_POINTS
        );
        return None;
    }

    Some(points)
}
