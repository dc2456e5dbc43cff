//! Renderable mesh artifacts.
//!
//! A [`MeshArtifact`] is the immutable output of one conversion: vertex and
//! index buffers for filled geometry, a projected point loop for outlines, or
//! a parametric marker for pins. Artifacts are never mutated after
//! production; re-scaling for a different radius means re-projection, not
//! mutation, so cached artifacts stay correct.

use crate::geometry::Style;
use serde::{Deserialize, Serialize};

/// One renderable artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeshArtifact {
    /// Triangulated surface
    Filled {
        positions: Vec<[f32; 3]>,
        normals: Vec<[f32; 3]>,
        indices: Vec<u32>,
    },
    /// One closed boundary loop
    Outline { points: Vec<[f32; 3]> },
    /// Three-part marker (stick + ball + base) at a world transform.
    ///
    /// The rendering collaborator generates the primitive geometry from the
    /// part dimensions; the artifact stays compact and cacheable.
    Pin {
        /// Marker anchor on the sphere surface
        position: [f32; 3],
        /// Rotation quaternion (x, y, z, w) aligning the marker's +Y axis
        /// with the sphere's outward normal at `position`
        rotation: [f32; 4],
        parts: PinParts,
    },
}

impl MeshArtifact {
    /// Approximate in-memory size in bytes, for cache accounting.
    pub fn byte_size(&self) -> usize {
        match self {
            MeshArtifact::Filled {
                positions,
                normals,
                indices,
            } => positions.len() * 12 + normals.len() * 12 + indices.len() * 4,
            MeshArtifact::Outline { points } => points.len() * 12,
            MeshArtifact::Pin { .. } => 48,
        }
    }

    /// Number of vertices referenced by this artifact.
    pub fn vertex_count(&self) -> usize {
        match self {
            MeshArtifact::Filled { positions, .. } => positions.len(),
            MeshArtifact::Outline { points } => points.len(),
            MeshArtifact::Pin { .. } => 1,
        }
    }
}

/// Dimensions of the three pin marker parts, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinParts {
    pub stick_height: f32,
    pub stick_radius: f32,
    pub ball_radius: f32,
    pub base_radius: f32,
}

impl Default for PinParts {
    fn default() -> Self {
        Self {
            stick_height: 4.0,
            stick_radius: 0.12,
            ball_radius: 0.8,
            base_radius: 0.5,
        }
    }
}

/// The complete artifact collection for one region and style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshArtifactSet {
    /// Region identifier, case-normalized
    pub code: String,
    pub style: Style,
    /// Sphere radius the artifacts were projected at
    pub radius: f64,
    pub artifacts: Vec<MeshArtifact>,
}

impl MeshArtifactSet {
    pub fn new(code: impl Into<String>, style: Style, radius: f64, artifacts: Vec<MeshArtifact>) -> Self {
        Self {
            code: code.into(),
            style,
            radius,
            artifacts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Approximate in-memory size in bytes across all artifacts.
    pub fn byte_size(&self) -> usize {
        self.artifacts.iter().map(MeshArtifact::byte_size).sum()
    }

    /// Total vertex count across all artifacts.
    pub fn vertex_count(&self) -> usize {
        self.artifacts.iter().map(MeshArtifact::vertex_count).sum()
    }
}

/// Merges filled artifacts into one combined artifact with contiguous
/// vertex/index buffers. Non-filled inputs are rejected by construction:
/// only the assembler calls this, with filled pieces.
pub fn merge_filled(pieces: Vec<MeshArtifact>) -> Option<MeshArtifact> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut indices = Vec::new();

    for piece in pieces {
        let MeshArtifact::Filled {
            positions: p,
            normals: n,
            indices: i,
        } = piece
        else {
            continue;
        };
        let base = positions.len() as u32;
        positions.extend(p);
        normals.extend(n);
        indices.extend(i.into_iter().map(|idx| idx + base));
    }

    if positions.is_empty() {
        return None;
    }
    Some(MeshArtifact::Filled {
        positions,
        normals,
        indices,
    })
}
