//! Mesh artifacts and their assembly from projected geometry.

pub mod artifact;
pub mod assembler;

pub use artifact::{merge_filled, MeshArtifact, MeshArtifactSet, PinParts};
pub use assembler::{assemble_filled, assemble_outline, assemble_pin};
