//! Sphere projection of (lat, lng) vertices.
//!
//! The mapping fixes the globe's seam at ±180° longitude:
//!
//! ```text
//! φ = (90° − lat) in radians, θ = (180° + lng) in radians
//! x = −r·sin φ·cos θ,  y = r·cos φ,  z = r·sin φ·sin θ
//! ```
//!
//! This convention must be reproduced exactly: precomputed and persisted
//! artifacts were projected with it, and mixing conventions would misplace
//! cached geometry. Vertex order and handedness are stable for the same
//! reason.

use crate::geometry::{LngLat, Triangulation};
use nalgebra::{Point3, Vector3};

/// Projects one geographic coordinate onto a sphere of the given radius.
pub fn project(point: LngLat, radius: f64) -> Point3<f64> {
    let phi = (90.0 - point.lat).to_radians();
    let theta = (180.0 + point.lng).to_radians();
    Point3::new(
        -radius * phi.sin() * theta.cos(),
        radius * phi.cos(),
        radius * phi.sin() * theta.sin(),
    )
}

/// Projects a vertex list into a position buffer.
pub fn project_vertices(vertices: &[LngLat], radius: f64) -> Vec<[f32; 3]> {
    vertices
        .iter()
        .map(|&p| {
            let v = project(p, radius);
            [v.x as f32, v.y as f32, v.z as f32]
        })
        .collect()
}

/// Projects a triangulation and orients every triangle to face outward.
///
/// Grid cells and multi-polygon pieces are triangulated independently; ear
/// clipping does not guarantee one winding across them. Re-orienting here
/// gives the merged mesh a consistent normal field with no inverted faces at
/// cell seams.
pub fn project_triangulation(t: &Triangulation, radius: f64) -> (Vec<[f32; 3]>, Vec<u32>) {
    let positions = project_vertices(&t.vertices, radius);
    let mut indices = t.indices.clone();
    orient_outward(&positions, &mut indices);
    (positions, indices)
}

/// Flips triangles whose face normal points into the sphere.
fn orient_outward(positions: &[[f32; 3]], indices: &mut [u32]) {
    for tri in indices.chunks_mut(3) {
        let a = vector(positions[tri[0] as usize]);
        let b = vector(positions[tri[1] as usize]);
        let c = vector(positions[tri[2] as usize]);
        let normal = (b - a).cross(&(c - a));
        let outward = a + b + c;
        if normal.dot(&outward) < 0.0 {
            tri.swap(1, 2);
        }
    }
}

/// Per-vertex normals averaged from face normals.
///
/// Deliberately not the analytic sphere normal: tessellation seams at grid
/// cell boundaries must shade continuously with their neighbors, which only
/// holds when normals come from the actual triangle topology.
pub fn vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut accumulated = vec![Vector3::zeros(); positions.len()];

    for tri in indices.chunks(3) {
        let a = vector(positions[tri[0] as usize]);
        let b = vector(positions[tri[1] as usize]);
        let c = vector(positions[tri[2] as usize]);
        let cross = (b - a).cross(&(c - a));
        let Some(face_normal) = cross.try_normalize(1e-12) else {
            continue; // degenerate face contributes nothing
        };
        for &i in tri {
            accumulated[i as usize] += face_normal;
        }
    }

    accumulated
        .into_iter()
        .zip(positions)
        .map(|(sum, &p)| {
            let n = sum
                .try_normalize(1e-12)
                // Isolated vertices fall back to the radial direction.
                .unwrap_or_else(|| vector(p).normalize());
            [n.x, n.y, n.z]
        })
        .collect()
}

fn vector(p: [f32; 3]) -> Vector3<f32> {
    Vector3::new(p[0], p[1], p[2])
}
