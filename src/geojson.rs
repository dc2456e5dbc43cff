//! Region document model.
//!
//! Per-region boundary data arrives as a GeoJSON-style feature collection:
//!
//! ```json
//! {
//!   "features": [
//!     { "geometry": { "type": "Polygon", "coordinates": [[[lng, lat], ...]] } }
//!   ],
//!   "name": "Germany",
//!   "meshMethod": "earcut"
//! }
//! ```
//!
//! Only `Polygon` and `MultiPolygon` geometries are supported; other types are
//! carried through as [`Geometry::Unsupported`] so the normalizer can report
//! them without aborting the document.

use crate::geometry::TessellationMethod;
use serde::Deserialize;

/// A per-region boundary document.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionDocument {
    /// Boundary features, each holding one polygon or multi-polygon
    pub features: Vec<Feature>,
    /// Human-readable region name
    #[serde(default)]
    pub name: Option<String>,
    /// Optional tessellation override declared by the document author
    #[serde(default, rename = "meshMethod")]
    pub mesh_method: Option<MeshMethod>,
}

impl RegionDocument {
    /// Parses a document from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parses a document from raw fetched bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// The tessellation method requested by the document, if any.
    pub fn tessellation_override(&self) -> Option<TessellationMethod> {
        self.mesh_method.map(MeshMethod::into_tessellation)
    }
}

/// One feature within a region document.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Option<serde_json::Value>,
}

/// Supported geometry payloads.
///
/// Coordinates follow GeoJSON nesting: a polygon is a list of rings, a ring a
/// list of `[lng, lat]` positions.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
    #[serde(other)]
    Unsupported,
}

/// Tessellation method names as they appear on the wire.
///
/// `turf` is the historical name for grid decomposition and maps to
/// [`TessellationMethod::Grid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshMethod {
    Earcut,
    Turf,
}

impl MeshMethod {
    pub fn into_tessellation(self) -> TessellationMethod {
        match self {
            MeshMethod::Earcut => TessellationMethod::Earcut,
            MeshMethod::Turf => TessellationMethod::Grid,
        }
    }
}
