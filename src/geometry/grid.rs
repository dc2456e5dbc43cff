//! Grid decomposition of large ring sets.
//!
//! Covers the outer ring's bounding box with square cells and clips the ring
//! set against each cell, producing bounded sub-polygons for the
//! triangulator. This keeps ear clipping off country-scale concave
//! boundaries, where it degrades superlinearly, and keeps individual
//! triangles from spanning enough sphere curvature to look flat.

use crate::geometry::types::{LngLat, RingSet};
use geo::{Area, BooleanOps, BoundingRect};
use geo_types::{Coord, Polygon, Rect};
use tracing::debug;

/// Kilometres per degree of latitude.
const KM_PER_DEG_LAT: f64 = 110.574;

/// Kilometres per degree of longitude at the equator.
const KM_PER_DEG_LNG: f64 = 111.320;

/// Planar area (deg²) below which a clipped cell is considered degenerate.
const MIN_CELL_AREA_DEG2: f64 = 1e-10;

/// Decomposes a ring set into sub-ring-sets bounded by grid cells of
/// `cell_side_km` side length.
///
/// Ring sets spanning more than 180° of longitude are unwrapped into a
/// continuous longitude interval before gridding and the output is wrapped
/// back to [-180, 180], so shapes crossing the antimeridian do not produce
/// cells covering the whole globe. Cells are clamped to latitude [-90, 90].
pub fn grid_tessellate(ring_set: &RingSet, cell_side_km: f64) -> Vec<RingSet> {
    let (subject, unwrapped) = unwrap_if_antimeridian(ring_set);
    let polygon = subject.to_geo();

    let Some(bbox) = polygon.bounding_rect() else {
        return Vec::new();
    };

    let mid_lat = ((bbox.min().y + bbox.max().y) / 2.0).to_radians();
    let lat_step = cell_side_km / KM_PER_DEG_LAT;
    // Longitude degrees shrink with latitude; clamp so cells stay finite
    // toward the poles.
    let lng_step = cell_side_km / (KM_PER_DEG_LNG * mid_lat.cos().max(0.05));

    let mut cells = Vec::new();
    let mut lat = bbox.min().y;
    while lat < bbox.max().y {
        let lat_top = (lat + lat_step).min(90.0);
        let lat_bottom = lat.max(-90.0);
        let mut lng = bbox.min().x;
        while lng < bbox.max().x {
            let cell = Rect::new(
                Coord { x: lng, y: lat_bottom },
                Coord {
                    x: lng + lng_step,
                    y: lat_top,
                },
            )
            .to_polygon();

            for clipped in polygon.intersection(&cell).0 {
                if let Some(sub) = accept_cell(&clipped) {
                    cells.push(if unwrapped { wrap_ring_set(sub) } else { sub });
                }
            }
            lng += lng_step;
        }
        lat += lat_step;
    }

    debug!(
        cells = cells.len(),
        cell_side_km, "grid tessellation complete"
    );
    cells
}

/// Keeps only non-degenerate clipped cells.
fn accept_cell(clipped: &Polygon<f64>) -> Option<RingSet> {
    if clipped.unsigned_area() < MIN_CELL_AREA_DEG2 {
        return None;
    }
    RingSet::from_geo(clipped)
}

/// Detects a ring set whose raw longitude extent exceeds 180° and shifts
/// west-of-zero longitudes by +360° so gridding and area measurement
/// operate on one continuous interval. Returns the (possibly shifted) ring
/// set and whether a shift was applied.
pub(crate) fn unwrap_if_antimeridian(ring_set: &RingSet) -> (RingSet, bool) {
    let (mut min_lng, mut max_lng) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in &ring_set.outer {
        min_lng = min_lng.min(p.lng);
        max_lng = max_lng.max(p.lng);
    }
    if max_lng - min_lng <= 180.0 {
        return (ring_set.clone(), false);
    }

    let shift = |ring: &[LngLat]| {
        ring.iter()
            .map(|p| {
                if p.lng < 0.0 {
                    LngLat::new(p.lng + 360.0, p.lat)
                } else {
                    *p
                }
            })
            .collect::<Vec<_>>()
    };

    (
        RingSet::new(
            shift(&ring_set.outer),
            ring_set.holes.iter().map(|h| shift(h)).collect(),
        ),
        true,
    )
}

/// Wraps unwrapped longitudes back into [-180, 180].
fn wrap_ring_set(ring_set: RingSet) -> RingSet {
    let wrap = |ring: Vec<LngLat>| {
        ring.into_iter()
            .map(|p| {
                if p.lng > 180.0 {
                    LngLat::new(p.lng - 360.0, p.lat)
                } else {
                    p
                }
            })
            .collect::<Vec<_>>()
    };
    RingSet::new(
        wrap(ring_set.outer),
        ring_set.holes.into_iter().map(wrap).collect(),
    )
}
