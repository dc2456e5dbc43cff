//! Globe pipeline configuration.

use crate::cache::CacheConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Default sphere radius in world units.
pub const DEFAULT_RADIUS: f64 = 100.0;

/// Grid cell side for large regions, in kilometers.
pub const DEFAULT_LARGE_CELL_KM: f64 = 25.0;

/// Grid cell side for very large regions, in kilometers.
pub const DEFAULT_VERY_LARGE_CELL_KM: f64 = 90.0;

/// Default rotation animation duration.
pub const DEFAULT_ROTATION_DURATION: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration for a globe instance.
///
/// Constructed per globe instance and owned by the session; nothing here is
/// ambient process state.
#[derive(Debug, Clone)]
pub struct GlobeConfig {
    /// Sphere radius the meshes are projected onto
    pub radius: f64,
    /// Grid cell side length for large regions (km)
    pub large_cell_km: f64,
    /// Grid cell side length for very large regions (km)
    pub very_large_cell_km: f64,
    /// Rotation animation duration
    pub rotation_duration: Duration,
    pub cache: CacheConfig,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            large_cell_km: DEFAULT_LARGE_CELL_KM,
            very_large_cell_km: DEFAULT_VERY_LARGE_CELL_KM,
            rotation_duration: DEFAULT_ROTATION_DURATION,
            cache: CacheConfig::default(),
        }
    }
}

/// Shape of the external region list file: `{"precomputed": ["RUS", ...]}`.
#[derive(Deserialize)]
struct RegionListFile {
    precomputed: Vec<String>,
}

impl GlobeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_cell_sides(mut self, large_km: f64, very_large_km: f64) -> Self {
        self.large_cell_km = large_km;
        self.very_large_cell_km = very_large_km;
        self
    }

    pub fn with_rotation_duration(mut self, duration: Duration) -> Self {
        self.rotation_duration = duration;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Load the precomputed-region allow-list from an external JSON file.
    pub async fn with_region_list_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        let bytes = tokio::fs::read(path).await?;
        let list: RegionListFile = serde_json::from_slice(&bytes)?;
        info!(
            precomputed = list.precomputed.len(),
            path = %path.display(),
            "region list loaded"
        );
        self.cache = self.cache.with_precomputed_codes(list.precomputed);
        Ok(self)
    }

    /// Check invariants before the configuration is used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "radius must be positive, got {}",
                self.radius
            )));
        }
        if self.large_cell_km <= 0.0 || self.very_large_cell_km <= 0.0 {
            return Err(ConfigError::Invalid(
                "grid cell sides must be positive".into(),
            ));
        }
        if self.large_cell_km > self.very_large_cell_km {
            return Err(ConfigError::Invalid(
                "large-region cells must not exceed very-large-region cells".into(),
            ));
        }
        Ok(())
    }
}
