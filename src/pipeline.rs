//! Region-to-mesh conversion pipeline.
//!
//! Turns a boundary document into the artifact set for one (region, style)
//! pair: normalize rings, classify by area, grid-decompose large polygons,
//! triangulate, project onto the sphere, assemble. The pipeline is pure
//! computation; fetching and caching live in [`crate::source`] and
//! [`crate::cache`].

use crate::cache::CacheError;
use crate::config::GlobeConfig;
use crate::geojson::RegionDocument;
use crate::geometry::{
    grid_tessellate, normalize_document, resolve_method, triangulate_all, RingSet, SizeClass,
    Style, TessellationMethod,
};
use crate::mesh::{assemble_filled, assemble_outline, assemble_pin, MeshArtifactSet};
use crate::source::SourceError;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from converting a region.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Every feature and ring in the document was degenerate or unsupported
    #[error("no valid geometry for region {0}")]
    NoValidGeometry(String),

    /// The center table has no entry for the region
    #[error("no center coordinate for region {0}")]
    MissingCenter(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// The conversion pipeline for one globe instance.
#[derive(Debug, Clone)]
pub struct MeshPipeline {
    radius: f64,
    large_cell_km: f64,
    very_large_cell_km: f64,
}

impl MeshPipeline {
    pub fn new(config: &GlobeConfig) -> Self {
        Self {
            radius: config.radius,
            large_cell_km: config.large_cell_km,
            very_large_cell_km: config.very_large_cell_km,
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// The tessellation method to use for a request: an explicit caller
    /// override wins, then the document's declared method, then automatic
    /// area-based selection.
    pub fn effective_method(
        &self,
        requested: TessellationMethod,
        document: &RegionDocument,
    ) -> TessellationMethod {
        match requested {
            TessellationMethod::Auto => document
                .tessellation_override()
                .unwrap_or(TessellationMethod::Auto),
            forced => forced,
        }
    }

    /// Convert a boundary document into the artifact set for one style.
    pub fn build_artifacts(
        &self,
        code: &str,
        document: &RegionDocument,
        style: Style,
        requested: TessellationMethod,
    ) -> Result<MeshArtifactSet, PipelineError> {
        let ring_sets = normalize_document(document);
        if ring_sets.is_empty() {
            warn!(code, "document contained no valid geometry");
            return Err(PipelineError::NoValidGeometry(code.to_string()));
        }

        let method = self.effective_method(requested, document);
        let artifacts = match style {
            Style::Filled => self.build_filled(code, &ring_sets, method),
            // Outlines and pins trace the original boundary; grid
            // decomposition would add seams that are not part of it.
            Style::Outline => assemble_outline(&ring_sets, self.radius),
            Style::Pin => assemble_pin(&ring_sets, self.radius).into_iter().collect(),
        };

        if artifacts.is_empty() {
            warn!(code, style = style.as_str(), "conversion produced no artifacts");
            return Err(PipelineError::NoValidGeometry(code.to_string()));
        }

        Ok(MeshArtifactSet::new(code, style, self.radius, artifacts))
    }

    fn build_filled(
        &self,
        code: &str,
        ring_sets: &[RingSet],
        method: TessellationMethod,
    ) -> Vec<crate::mesh::MeshArtifact> {
        let mut pieces: Vec<RingSet> = Vec::new();
        for ring_set in ring_sets {
            let (resolved, class) = resolve_method(ring_set, method);
            match resolved {
                TessellationMethod::Grid => {
                    let cell_km = self.cell_side_km(class);
                    let cells = grid_tessellate(ring_set, cell_km);
                    debug!(
                        code,
                        class = ?class,
                        cell_km,
                        cells = cells.len(),
                        "grid decomposition"
                    );
                    pieces.extend(cells);
                }
                _ => pieces.push(ring_set.clone()),
            }
        }

        let triangulations = triangulate_all(&pieces);
        debug!(
            code,
            pieces = pieces.len(),
            triangulations = triangulations.len(),
            "triangulation"
        );
        assemble_filled(&triangulations, self.radius)
            .into_iter()
            .collect()
    }

    fn cell_side_km(&self, class: SizeClass) -> f64 {
        match class {
            // A small region only reaches the grid by explicit override.
            SizeClass::Small | SizeClass::Large => self.large_cell_km,
            SizeClass::VeryLarge => self.very_large_cell_km,
        }
    }
}
