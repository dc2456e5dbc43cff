//! Core types for the mesh cache system.

use crate::geometry::{Style, TessellationMethod};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Cache key uniquely identifying a cached artifact set.
///
/// Includes every dimension the artifact depends on: region code, style,
/// projection radius and tessellation method. Keying on the code alone would
/// let a `Filled` artifact answer an `Outline` request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Region code, normalized to uppercase
    pub code: String,
    pub style: Style,
    /// Radius quantized to thousandths of a world unit, so floating-point
    /// noise cannot split the key space
    pub radius_milli: u64,
    pub method: TessellationMethod,
}

impl CacheKey {
    /// Create a new cache key; the code is case-normalized here.
    pub fn new(code: &str, style: Style, radius: f64, method: TessellationMethod) -> Self {
        Self {
            code: code.to_ascii_uppercase(),
            style,
            radius_milli: (radius * 1000.0).round() as u64,
            method,
        }
    }

    /// Radius in world units.
    pub fn radius(&self) -> f64 {
        self.radius_milli as f64 / 1000.0
    }

    /// Stable filesystem-safe name embedding the full key.
    pub fn storage_name(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.code,
            self.style.as_str(),
            self.radius_milli,
            self.method.as_str()
        )
    }
}

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache operations
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization of a stored record failed
    #[error("cache record encoding error: {0}")]
    Encoding(String),

    /// Precomputed asset blob could not be decoded
    #[error("precomputed asset decode error: {0}")]
    AssetDecode(String),

    /// Invalid cache configuration
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),

    /// The computation backing a full miss failed
    #[error("mesh computation failed: {0}")]
    Compute(String),
}

/// The tier an artifact set was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierOrigin {
    /// Transient memory tier
    Memory,
    /// Persistent structured store
    Persistent,
    /// Precomputed external asset
    Precomputed,
    /// Freshly computed on a full miss (or received from an in-flight
    /// computation for the same key)
    Computed,
}

/// Memory tier configuration.
#[derive(Debug, Clone)]
pub struct MemoryCacheConfig {
    /// Maximum memory size in bytes (default: 64 MB)
    pub max_size_bytes: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Persistent tier configuration.
#[derive(Debug, Clone)]
pub struct PersistentCacheConfig {
    /// Store directory root
    pub store_dir: PathBuf,
    /// Minimum compute duration before a freshly computed artifact is worth
    /// persisting (default: 250 ms)
    pub persist_min_compute: std::time::Duration,
    /// Minimum serialized size before persisting (default: 256 KiB)
    pub persist_min_bytes: usize,
}

impl Default for PersistentCacheConfig {
    fn default() -> Self {
        let store_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("globemesh");

        Self {
            store_dir,
            persist_min_compute: std::time::Duration::from_millis(250),
            persist_min_bytes: 256 * 1024,
        }
    }
}

/// Complete cache system configuration.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    pub memory: MemoryCacheConfig,
    /// `None` disables the persistent tier entirely
    pub persistent: Option<PersistentCacheConfig>,
    /// Region codes with precomputed assets; doubles as the always-persist
    /// list
    pub precomputed_codes: Vec<String>,
}

impl CacheConfig {
    /// Set the memory tier size in bytes.
    pub fn with_memory_size(mut self, size: usize) -> Self {
        self.memory.max_size_bytes = size;
        self
    }

    /// Enable the persistent tier rooted at the given directory.
    pub fn with_store_dir(mut self, dir: PathBuf) -> Self {
        let mut persistent = self.persistent.unwrap_or_default();
        persistent.store_dir = dir;
        self.persistent = Some(persistent);
        self
    }

    /// Set the precomputed-asset allow-list.
    pub fn with_precomputed_codes(mut self, codes: Vec<String>) -> Self {
        self.precomputed_codes = codes.into_iter().map(|c| c.to_ascii_uppercase()).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_normalizes_case() {
        let key = CacheKey::new("deu", Style::Filled, 100.0, TessellationMethod::Auto);
        assert_eq!(key.code, "DEU");
    }

    #[test]
    fn test_cache_key_equality_same_dimensions() {
        let a = CacheKey::new("DEU", Style::Filled, 100.0, TessellationMethod::Auto);
        let b = CacheKey::new("deu", Style::Filled, 100.0, TessellationMethod::Auto);
        assert_eq!(a, b);
    }

    #[test]
    fn test_cache_key_distinguishes_style() {
        let filled = CacheKey::new("DEU", Style::Filled, 100.0, TessellationMethod::Auto);
        let outline = CacheKey::new("DEU", Style::Outline, 100.0, TessellationMethod::Auto);
        assert_ne!(filled, outline);
    }

    #[test]
    fn test_cache_key_distinguishes_radius() {
        let a = CacheKey::new("DEU", Style::Filled, 100.0, TessellationMethod::Auto);
        let b = CacheKey::new("DEU", Style::Filled, 101.0, TessellationMethod::Auto);
        assert_ne!(a, b);
    }

    #[test]
    fn test_cache_key_distinguishes_method() {
        let a = CacheKey::new("DEU", Style::Filled, 100.0, TessellationMethod::Earcut);
        let b = CacheKey::new("DEU", Style::Filled, 100.0, TessellationMethod::Grid);
        assert_ne!(a, b);
    }

    #[test]
    fn test_cache_key_radius_quantization() {
        // Sub-millimeter noise collapses onto one key.
        let a = CacheKey::new("DEU", Style::Filled, 100.0000001, TessellationMethod::Auto);
        let b = CacheKey::new("DEU", Style::Filled, 100.0, TessellationMethod::Auto);
        assert_eq!(a, b);
        assert_eq!(a.radius(), 100.0);
    }

    #[test]
    fn test_storage_name_embeds_full_key() {
        let key = CacheKey::new("fra", Style::Outline, 100.0, TessellationMethod::Grid);
        assert_eq!(key.storage_name(), "FRA-outline-100000-grid");
    }

    #[test]
    fn test_memory_config_default() {
        assert_eq!(
            MemoryCacheConfig::default().max_size_bytes,
            64 * 1024 * 1024
        );
    }

    #[test]
    fn test_persistent_config_default() {
        let config = PersistentCacheConfig::default();
        assert!(config.store_dir.ends_with("globemesh"));
        assert_eq!(config.persist_min_bytes, 256 * 1024);
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::default()
            .with_memory_size(1_000_000)
            .with_store_dir(PathBuf::from("/tmp/meshcache"))
            .with_precomputed_codes(vec!["rus".into(), "can".into()]);

        assert_eq!(config.memory.max_size_bytes, 1_000_000);
        assert_eq!(
            config.persistent.as_ref().unwrap().store_dir,
            PathBuf::from("/tmp/meshcache")
        );
        assert_eq!(config.precomputed_codes, vec!["RUS", "CAN"]);
    }
}
