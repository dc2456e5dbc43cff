//! Assembly of projected geometry into mesh artifacts.

use crate::geometry::{LngLat, RingSet, Triangulation};
use crate::mesh::artifact::{merge_filled, MeshArtifact, PinParts};
use crate::projection::{project, project_triangulation, project_vertices, vertex_normals};
use nalgebra::{UnitQuaternion, Vector3};

/// Builds one combined filled artifact from triangulated sub-polygons.
///
/// Each triangulation is projected and merged into a single artifact with
/// contiguous buffers; normals are computed on the merged topology so grid
/// cell seams shade continuously.
pub fn assemble_filled(triangulations: &[Triangulation], radius: f64) -> Option<MeshArtifact> {
    let pieces: Vec<MeshArtifact> = triangulations
        .iter()
        .map(|t| {
            let (positions, indices) = project_triangulation(t, radius);
            MeshArtifact::Filled {
                normals: Vec::new(), // filled in after the merge
                positions,
                indices,
            }
        })
        .collect();

    let merged = merge_filled(pieces)?;
    let MeshArtifact::Filled {
        positions, indices, ..
    } = merged
    else {
        return None;
    };
    let normals = vertex_normals(&positions, &indices);
    Some(MeshArtifact::Filled {
        positions,
        normals,
        indices,
    })
}

/// Builds one closed outline loop per ring, kept as separate artifacts.
pub fn assemble_outline(ring_sets: &[RingSet], radius: f64) -> Vec<MeshArtifact> {
    ring_sets
        .iter()
        .flat_map(|rs| rs.rings())
        .filter(|ring| !ring.is_empty())
        .map(|ring| MeshArtifact::Outline {
            points: project_vertices(ring, radius),
        })
        .collect()
}

/// Builds a pin marker at the unweighted ring-vertex-average centroid of the
/// region's outer rings, oriented so the marker's +Y axis aligns with the
/// sphere's outward normal at that point.
pub fn assemble_pin(ring_sets: &[RingSet], radius: f64) -> Option<MeshArtifact> {
    let centroid = average_centroid(ring_sets)?;
    let anchor = project(centroid, radius);
    let outward = Vector3::new(anchor.x, anchor.y, anchor.z).normalize();

    // Minimal rotation from the marker's default up vector to the outward
    // normal. Antipodal up (south pole) has no unique minimal rotation; any
    // half-turn through a perpendicular axis works.
    let rotation = UnitQuaternion::rotation_between(&Vector3::y(), &outward)
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI));
    let q = rotation.into_inner().coords;

    Some(MeshArtifact::Pin {
        position: [anchor.x as f32, anchor.y as f32, anchor.z as f32],
        rotation: [q.x as f32, q.y as f32, q.z as f32, q.w as f32],
        parts: PinParts::default(),
    })
}

/// Unweighted average of all outer-ring vertices across the region's
/// polygons.
fn average_centroid(ring_sets: &[RingSet]) -> Option<LngLat> {
    let centroids: Vec<LngLat> = ring_sets.iter().filter_map(|rs| rs.centroid()).collect();
    if centroids.is_empty() {
        return None;
    }
    let n = centroids.len() as f64;
    let (lng, lat) = centroids
        .iter()
        .fold((0.0, 0.0), |(lng, lat), c| (lng + c.lng, lat + c.lat));
    Some(LngLat::new(lng / n, lat / n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::triangulate;
    use approx::assert_relative_eq;

    fn square(min_lng: f64, min_lat: f64) -> RingSet {
        RingSet::new(
            vec![
                LngLat::new(min_lng, min_lat),
                LngLat::new(min_lng + 1.0, min_lat),
                LngLat::new(min_lng + 1.0, min_lat + 1.0),
                LngLat::new(min_lng, min_lat + 1.0),
                LngLat::new(min_lng, min_lat),
            ],
            vec![],
        )
    }

    #[test]
    fn test_assemble_filled_merges_pieces() {
        let a = triangulate(&square(0.0, 0.0)).unwrap();
        let b = triangulate(&square(2.0, 0.0)).unwrap();
        let artifact = assemble_filled(&[a, b], 100.0).unwrap();

        let MeshArtifact::Filled {
            positions,
            normals,
            indices,
        } = artifact
        else {
            panic!("expected filled artifact");
        };
        assert_eq!(positions.len(), 8);
        assert_eq!(normals.len(), 8);
        assert_eq!(indices.len(), 12);
        assert!(indices.iter().all(|&i| (i as usize) < positions.len()));
    }

    #[test]
    fn test_assemble_filled_empty_input() {
        assert!(assemble_filled(&[], 100.0).is_none());
    }

    #[test]
    fn test_assemble_outline_one_loop_per_ring() {
        let with_hole = RingSet::new(square(0.0, 0.0).outer, vec![square(0.25, 0.25).outer]);
        let artifacts = assemble_outline(&[with_hole, square(3.0, 3.0)], 100.0);
        assert_eq!(artifacts.len(), 3);
        for artifact in &artifacts {
            let MeshArtifact::Outline { points } = artifact else {
                panic!("expected outline artifact");
            };
            assert_eq!(points.first(), points.last(), "loop not closed");
        }
    }

    #[test]
    fn test_assemble_pin_sits_on_sphere() {
        let artifact = assemble_pin(&[square(10.0, 40.0)], 100.0).unwrap();
        let MeshArtifact::Pin { position, .. } = artifact else {
            panic!("expected pin artifact");
        };
        let distance =
            (position[0] as f64).hypot(position[1] as f64).hypot(position[2] as f64);
        assert_relative_eq!(distance, 100.0, epsilon = 1e-4);
    }

    #[test]
    fn test_assemble_pin_rotation_aligns_up_with_normal() {
        let artifact = assemble_pin(&[square(13.0, 52.0)], 100.0).unwrap();
        let MeshArtifact::Pin {
            position, rotation, ..
        } = artifact
        else {
            panic!("expected pin artifact");
        };
        let q = UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(
            rotation[3] as f64,
            rotation[0] as f64,
            rotation[1] as f64,
            rotation[2] as f64,
        ));
        let up = q * Vector3::y();
        let outward = Vector3::new(position[0] as f64, position[1] as f64, position[2] as f64)
            .normalize();
        assert_relative_eq!(up.dot(&outward), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_assemble_pin_handles_south_pole() {
        let south = RingSet::new(
            vec![
                LngLat::new(-1.0, -89.9),
                LngLat::new(1.0, -89.9),
                LngLat::new(1.0, -89.8),
                LngLat::new(-1.0, -89.8),
                LngLat::new(-1.0, -89.9),
            ],
            vec![],
        );
        // Near-antipodal up vector must still produce a unit rotation.
        let artifact = assemble_pin(&[south], 100.0).unwrap();
        assert!(matches!(artifact, MeshArtifact::Pin { .. }));
    }

    #[test]
    fn test_assemble_pin_no_geometry() {
        assert!(assemble_pin(&[], 100.0).is_none());
    }
}
