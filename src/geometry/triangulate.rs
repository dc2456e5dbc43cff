//! Ear-clipping triangulation of ring sets.
//!
//! Flattens a ring set (outer ring plus holes with explicit hole-start
//! offsets) and hands it to `earcutr`. Degenerate inputs are detected and
//! skipped so no invalid index ranges ever reach the projector.

use crate::geometry::types::{open_ring, LngLat, RingSet};
use geo::Area;
use tracing::warn;

/// Planar area (deg²) below which a ring set is considered degenerate.
const MIN_TRIANGULATION_AREA_DEG2: f64 = 1e-12;

/// A triangulated ring set: flat 2D vertices plus triangle indices.
///
/// Every index is in bounds of `vertices` and `indices.len()` is a multiple
/// of three.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangulation {
    /// Vertices in (lng, lat) degrees, outer ring first, then holes
    pub vertices: Vec<LngLat>,
    /// Triangle index triples into `vertices`
    pub indices: Vec<u32>,
}

impl Triangulation {
    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Triangulates one ring set.
///
/// Returns `None` for degenerate inputs (zero-area or collinear-only rings)
/// and for ear-clipping failures, which are logged and skipped.
pub fn triangulate(ring_set: &RingSet) -> Option<Triangulation> {
    if ring_set.to_geo().unsigned_area() < MIN_TRIANGULATION_AREA_DEG2 {
        warn!("skipping zero-area ring set");
        return None;
    }

    // Closing duplicates are dropped before flattening; earcut treats rings
    // as implicitly closed.
    let mut flat = Vec::with_capacity(ring_set.vertex_count() * 2);
    let mut vertices = Vec::with_capacity(ring_set.vertex_count());
    let mut hole_starts = Vec::with_capacity(ring_set.holes.len());

    for (i, ring) in ring_set.rings().enumerate() {
        let open = open_ring(ring);
        if i > 0 {
            hole_starts.push(vertices.len());
        }
        for p in open {
            flat.push(p.lng);
            flat.push(p.lat);
            vertices.push(*p);
        }
    }

    let indices = match earcutr::earcut(&flat, &hole_starts, 2) {
        Ok(indices) => indices,
        Err(err) => {
            warn!(error = %err, "ear clipping failed, skipping ring set");
            return None;
        }
    };
    if indices.is_empty() {
        warn!("ear clipping produced no triangles, skipping ring set");
        return None;
    }

    Some(Triangulation {
        vertices,
        indices: indices.into_iter().map(|i| i as u32).collect(),
    })
}

/// Triangulates a batch of ring sets, dropping the degenerate ones.
pub fn triangulate_all(ring_sets: &[RingSet]) -> Vec<Triangulation> {
    ring_sets.iter().filter_map(triangulate).collect()
}
