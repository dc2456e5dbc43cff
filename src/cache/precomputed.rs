//! Precomputed external asset tier.
//!
//! Some regions (large countries) are expensive enough to tessellate that
//! their meshes are authored offline and shipped as binary model blobs. For
//! codes on the allow-list, the blob is fetched by convention-based path and
//! decoded directly into artifacts, bypassing triangulation entirely.
//!
//! The allow-list is external configuration data, not inline literals, so it
//! can be validated and tested independently of the pipeline logic.

use crate::cache::stats::CacheStats;
use crate::cache::types::{CacheError, CacheKey};
use crate::mesh::{MeshArtifact, MeshArtifactSet};
use crate::projection::vertex_normals;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;

/// A binary model blob's decoded form: mesh primitives with geometry,
/// material and transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecomputedModel {
    pub primitives: Vec<ModelPrimitive>,
}

/// One mesh primitive within a precomputed model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPrimitive {
    pub positions: Vec<[f32; 3]>,
    /// Empty when the authoring tool left normals to be derived from
    /// topology
    #[serde(default)]
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    /// Row-major 4x4 transform applied to positions on decode
    #[serde(default = "identity_transform")]
    pub transform: [f32; 16],
    #[serde(default)]
    pub material: MaterialDesc,
}

/// Material description carried by authored models.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialDesc {
    pub base_color: Option<[f32; 4]>,
}

fn identity_transform() -> [f32; 16] {
    let mut m = [0.0; 16];
    m[0] = 1.0;
    m[5] = 1.0;
    m[10] = 1.0;
    m[15] = 1.0;
    m
}

impl PrecomputedModel {
    /// Encodes a model to its binary wire form. Used by asset authoring and
    /// tests.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CacheError> {
        bincode::serialize(self).map_err(|e| CacheError::Encoding(e.to_string()))
    }

    /// Decodes a model from its binary wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CacheError> {
        bincode::deserialize(bytes).map_err(|e| CacheError::AssetDecode(e.to_string()))
    }
}

/// Allow-list gate and decoder for the precomputed tier.
pub struct PrecomputedAssets {
    codes: HashSet<String>,
    stats: Mutex<CacheStats>,
}

impl PrecomputedAssets {
    /// Build from the externally configured code list.
    pub fn new(codes: &[String]) -> Self {
        Self {
            codes: codes.iter().map(|c| c.to_ascii_uppercase()).collect(),
            stats: Mutex::new(CacheStats::new()),
        }
    }

    /// Whether the region has a precomputed asset. Only `Filled` requests
    /// qualify: authored models are surface meshes.
    pub fn applies_to(&self, key: &CacheKey) -> bool {
        matches!(key.style, crate::geometry::Style::Filled) && self.codes.contains(&key.code)
    }

    /// Whether the code is on the allow-list at all (used by the persist
    /// policy, independent of style).
    pub fn is_listed(&self, code: &str) -> bool {
        self.codes.contains(&code.to_ascii_uppercase())
    }

    /// Decode a fetched blob into the artifact set for `key`.
    ///
    /// Primitive transforms are applied to positions; missing normals are
    /// derived from the transformed topology.
    pub fn decode(&self, key: &CacheKey, bytes: &[u8]) -> Result<MeshArtifactSet, CacheError> {
        let model = match PrecomputedModel::from_bytes(bytes) {
            Ok(model) => {
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_precomputed_hit();
                }
                model
            }
            Err(err) => {
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_precomputed_miss();
                }
                return Err(err);
            }
        };

        let artifacts = model
            .primitives
            .into_iter()
            .filter(|p| !p.positions.is_empty() && !p.indices.is_empty())
            .map(|p| {
                let positions: Vec<[f32; 3]> = p
                    .positions
                    .iter()
                    .map(|&v| apply_transform(&p.transform, v))
                    .collect();
                let normals = if p.normals.len() == positions.len() {
                    p.normals
                } else {
                    vertex_normals(&positions, &p.indices)
                };
                MeshArtifact::Filled {
                    positions,
                    normals,
                    indices: p.indices,
                }
            })
            .collect::<Vec<_>>();

        if artifacts.is_empty() {
            return Err(CacheError::AssetDecode(
                "model contains no usable primitives".into(),
            ));
        }

        Ok(MeshArtifactSet::new(
            key.code.clone(),
            key.style,
            key.radius(),
            artifacts,
        ))
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

/// Row-major 4x4 point transform.
fn apply_transform(m: &[f32; 16], p: [f32; 3]) -> [f32; 3] {
    [
        m[0] * p[0] + m[1] * p[1] + m[2] * p[2] + m[3],
        m[4] * p[0] + m[5] * p[1] + m[6] * p[2] + m[7],
        m[8] * p[0] + m[9] * p[1] + m[10] * p[2] + m[11],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Style, TessellationMethod};

    fn filled_key(code: &str) -> CacheKey {
        CacheKey::new(code, Style::Filled, 100.0, TessellationMethod::Auto)
    }

    fn test_model() -> PrecomputedModel {
        PrecomputedModel {
            primitives: vec![ModelPrimitive {
                positions: vec![[100.0, 0.0, 0.0], [0.0, 100.0, 0.0], [0.0, 0.0, 100.0]],
                normals: vec![],
                indices: vec![0, 1, 2],
                transform: identity_transform(),
                material: MaterialDesc {
                    base_color: Some([1.0, 0.5, 0.0, 1.0]),
                },
            }],
        }
    }

    #[test]
    fn test_allow_list_is_case_normalized() {
        let assets = PrecomputedAssets::new(&["rus".into(), "CAN".into()]);
        assert!(assets.is_listed("RUS"));
        assert!(assets.is_listed("can"));
        assert!(!assets.is_listed("DEU"));
    }

    #[test]
    fn test_applies_only_to_filled_style() {
        let assets = PrecomputedAssets::new(&["RUS".into()]);
        assert!(assets.applies_to(&filled_key("RUS")));
        assert!(!assets.applies_to(&CacheKey::new(
            "RUS",
            Style::Outline,
            100.0,
            TessellationMethod::Auto
        )));
        assert!(!assets.applies_to(&filled_key("DEU")));
    }

    #[test]
    fn test_model_round_trip() {
        let bytes = test_model().to_bytes().unwrap();
        let decoded = PrecomputedModel::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.primitives.len(), 1);
        assert_eq!(decoded.primitives[0].positions.len(), 3);
    }

    #[test]
    fn test_decode_produces_artifact_set() {
        let assets = PrecomputedAssets::new(&["RUS".into()]);
        let bytes = test_model().to_bytes().unwrap();
        let set = assets.decode(&filled_key("RUS"), &bytes).unwrap();

        assert_eq!(set.code, "RUS");
        assert_eq!(set.style, Style::Filled);
        assert_eq!(set.radius, 100.0);
        assert_eq!(set.artifacts.len(), 1);
        // Normals were absent and must be derived.
        let MeshArtifact::Filled { normals, .. } = &set.artifacts[0] else {
            panic!("expected filled artifact");
        };
        assert_eq!(normals.len(), 3);
    }

    #[test]
    fn test_decode_applies_transform() {
        let mut model = test_model();
        // Translate +10 on x.
        model.primitives[0].transform[3] = 10.0;
        let assets = PrecomputedAssets::new(&["RUS".into()]);
        let set = assets
            .decode(&filled_key("RUS"), &model.to_bytes().unwrap())
            .unwrap();
        let MeshArtifact::Filled { positions, .. } = &set.artifacts[0] else {
            panic!("expected filled artifact");
        };
        assert_eq!(positions[0], [110.0, 0.0, 0.0]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let assets = PrecomputedAssets::new(&["RUS".into()]);
        assert!(assets.decode(&filled_key("RUS"), b"not a model").is_err());
        assert_eq!(assets.stats().precomputed_misses, 1);
    }

    #[test]
    fn test_decode_rejects_empty_model() {
        let assets = PrecomputedAssets::new(&["RUS".into()]);
        let empty = PrecomputedModel { primitives: vec![] };
        assert!(assets
            .decode(&filled_key("RUS"), &empty.to_bytes().unwrap())
            .is_err());
    }
}
