//! Polygon geometry: normalization, area classification, grid decomposition
//! and triangulation.
//!
//! The pipeline runs these stages in order: [`normalize`] cleans document
//! rings into [`RingSet`]s, [`area`] picks a tessellation strategy, [`grid`]
//! bounds large shapes into cells, and [`triangulate`] turns each piece into
//! vertex/index buffers for the sphere projector.

pub mod area;
pub mod grid;
pub mod normalize;
pub mod triangulate;
pub mod types;

pub use area::{classify_area, outer_ring_area_km2, resolve_method};
pub use grid::grid_tessellate;
pub use normalize::{normalize_document, normalize_geometry};
pub use triangulate::{triangulate, triangulate_all, Triangulation};
pub use types::{LngLat, RingSet, SizeClass, Style, TessellationMethod};
