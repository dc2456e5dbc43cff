//! Persistent structured store for mesh records.
//!
//! A directory-backed key-value store surviving across sessions. Records are
//! bincode-serialized [`MeshRecord`]s under a generation directory named for
//! the schema version; opening the store upgrades it by clearing incompatible
//! generations, so a format change never deserializes garbage.

use crate::cache::stats::CacheStats;
use crate::cache::types::{CacheError, CacheKey, PersistentCacheConfig};
use crate::mesh::MeshArtifactSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Bump when the serialized record layout changes.
pub const SCHEMA_VERSION: u32 = 1;

const RECORD_EXTENSION: &str = "mesh";

/// One serialized store record: the key it was stored under plus the
/// artifact set. Carrying the key lets a scan rebuild the index without
/// parsing file names.
#[derive(Debug, Serialize, Deserialize)]
struct MeshRecord {
    key: CacheKey,
    set: MeshArtifactSet,
}

/// Directory-backed persistent mesh store.
pub struct PersistentStore {
    generation_dir: PathBuf,
    index: Mutex<HashMap<CacheKey, PathBuf>>,
    stats: Mutex<CacheStats>,
}

impl PersistentStore {
    /// Open (and if necessary create or upgrade) the store.
    pub fn open(config: &PersistentCacheConfig) -> Result<Self, CacheError> {
        let generation_dir = config
            .store_dir
            .join(format!("v{SCHEMA_VERSION}"));

        Self::remove_stale_generations(&config.store_dir)?;
        fs::create_dir_all(&generation_dir)?;

        let store = Self {
            generation_dir,
            index: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::new()),
        };
        let scanned = store.scan()?;
        info!(records = scanned, "persistent mesh store opened");
        Ok(store)
    }

    /// Load an artifact set by key.
    ///
    /// Unreadable or corrupt records are treated as misses and dropped from
    /// the index; the caller falls through to recomputation.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<MeshArtifactSet>> {
        let path = {
            let index = self.index.lock().unwrap_or_else(|e| e.into_inner());
            index.get(key).cloned()
        };

        let Some(path) = path else {
            if let Ok(mut stats) = self.stats.lock() {
                stats.record_persistent_miss();
            }
            return None;
        };

        match fs::read(&path).map_err(CacheError::from).and_then(|bytes| {
            bincode::deserialize::<MeshRecord>(&bytes)
                .map_err(|e| CacheError::Encoding(e.to_string()))
        }) {
            Ok(record) => {
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_persistent_hit();
                }
                Some(Arc::new(record.set))
            }
            Err(err) => {
                warn!(key = %key.storage_name(), error = %err, "dropping unreadable store record");
                let mut index = self.index.lock().unwrap_or_else(|e| e.into_inner());
                index.remove(key);
                let _ = fs::remove_file(&path);
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_persistent_miss();
                }
                None
            }
        }
    }

    /// Store an artifact set under its key. Each write is its own
    /// transaction scope; there is no cross-key locking.
    pub fn put(&self, key: CacheKey, set: &MeshArtifactSet) -> Result<(), CacheError> {
        let record = MeshRecord {
            key: key.clone(),
            set: set.clone(),
        };
        let bytes =
            bincode::serialize(&record).map_err(|e| CacheError::Encoding(e.to_string()))?;

        let path = self.record_path(&key);
        fs::write(&path, &bytes)?;

        let mut index = self.index.lock().unwrap_or_else(|e| e.into_inner());
        index.insert(key, path);
        if let Ok(mut stats) = self.stats.lock() {
            stats.record_persistent_write();
        }
        Ok(())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    pub fn entry_count(&self) -> usize {
        self.index.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Remove all records.
    pub fn clear(&self) -> Result<(), CacheError> {
        let mut index = self.index.lock().unwrap_or_else(|e| e.into_inner());
        for path in index.values() {
            let _ = fs::remove_file(path);
        }
        index.clear();
        Ok(())
    }

    fn record_path(&self, key: &CacheKey) -> PathBuf {
        self.generation_dir
            .join(key.storage_name())
            .with_extension(RECORD_EXTENSION)
    }

    /// Delete generation directories from other schema versions.
    fn remove_stale_generations(store_dir: &Path) -> Result<(), CacheError> {
        if !store_dir.exists() {
            return Ok(());
        }
        let current = format!("v{SCHEMA_VERSION}");
        for entry in fs::read_dir(store_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if entry.path().is_dir() && name.starts_with('v') && name != current {
                info!(generation = %name, "removing stale store generation");
                let _ = fs::remove_dir_all(entry.path());
            }
        }
        Ok(())
    }

    /// Build the index from records already on disk.
    fn scan(&self) -> Result<usize, CacheError> {
        let mut index = self.index.lock().unwrap_or_else(|e| e.into_inner());
        for entry in fs::read_dir(&self.generation_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            match fs::read(&path).ok().and_then(|bytes| {
                bincode::deserialize::<MeshRecord>(&bytes).ok()
            }) {
                Some(record) => {
                    index.insert(record.key, path);
                }
                None => {
                    debug!(path = %path.display(), "removing unreadable record during scan");
                    let _ = fs::remove_file(&path);
                }
            }
        }
        Ok(index.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Style, TessellationMethod};
    use crate::mesh::MeshArtifact;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> PersistentCacheConfig {
        PersistentCacheConfig {
            store_dir: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    fn test_key(code: &str) -> CacheKey {
        CacheKey::new(code, Style::Filled, 100.0, TessellationMethod::Auto)
    }

    fn test_set(code: &str) -> MeshArtifactSet {
        MeshArtifactSet::new(
            code,
            Style::Filled,
            100.0,
            vec![MeshArtifact::Filled {
                positions: vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]],
                normals: vec![[0.0, 1.0, 0.0]; 3],
                indices: vec![0, 1, 2],
            }],
        )
    }

    #[test]
    fn test_round_trip_preserves_buffers() {
        let dir = TempDir::new().unwrap();
        let store = PersistentStore::open(&test_config(&dir)).unwrap();

        let set = test_set("DEU");
        store.put(test_key("DEU"), &set).unwrap();

        let loaded = store.get(&test_key("DEU")).unwrap();
        assert_eq!(loaded.vertex_count(), set.vertex_count());
        assert_eq!(*loaded, set);
    }

    #[test]
    fn test_miss_for_unknown_key() {
        let dir = TempDir::new().unwrap();
        let store = PersistentStore::open(&test_config(&dir)).unwrap();
        assert!(store.get(&test_key("XXX")).is_none());
        assert_eq!(store.stats().persistent_misses, 1);
    }

    #[test]
    fn test_reopen_rebuilds_index() {
        let dir = TempDir::new().unwrap();
        {
            let store = PersistentStore::open(&test_config(&dir)).unwrap();
            store.put(test_key("DEU"), &test_set("DEU")).unwrap();
            store.put(test_key("FRA"), &test_set("FRA")).unwrap();
        }

        let reopened = PersistentStore::open(&test_config(&dir)).unwrap();
        assert_eq!(reopened.entry_count(), 2);
        assert!(reopened.get(&test_key("DEU")).is_some());
    }

    #[test]
    fn test_schema_upgrade_clears_old_generation() {
        let dir = TempDir::new().unwrap();
        let old_gen = dir.path().join("v0");
        fs::create_dir_all(&old_gen).unwrap();
        fs::write(old_gen.join("ITA-filled-100000-auto.mesh"), b"old format").unwrap();

        let store = PersistentStore::open(&test_config(&dir)).unwrap();
        assert!(!old_gen.exists(), "stale generation should be removed");
        assert_eq!(store.entry_count(), 0);
    }

    #[test]
    fn test_corrupt_record_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let store = PersistentStore::open(&test_config(&dir)).unwrap();
        store.put(test_key("DEU"), &test_set("DEU")).unwrap();

        // Corrupt the record on disk behind the index's back.
        let path = dir
            .path()
            .join(format!("v{SCHEMA_VERSION}"))
            .join("DEU-filled-100000-auto.mesh");
        fs::write(&path, b"garbage").unwrap();

        assert!(store.get(&test_key("DEU")).is_none());
        assert!(!store.contains(&test_key("DEU")), "corrupt record should be dropped");
    }

    #[test]
    fn test_keys_with_different_styles_stored_separately() {
        let dir = TempDir::new().unwrap();
        let store = PersistentStore::open(&test_config(&dir)).unwrap();

        let filled = test_set("DEU");
        let mut outline = test_set("DEU");
        outline.style = Style::Outline;
        outline.artifacts = vec![MeshArtifact::Outline {
            points: vec![[0.0; 3]; 4],
        }];

        store.put(test_key("DEU"), &filled).unwrap();
        store
            .put(
                CacheKey::new("DEU", Style::Outline, 100.0, TessellationMethod::Auto),
                &outline,
            )
            .unwrap();

        assert_eq!(store.entry_count(), 2);
        let hit = store
            .get(&CacheKey::new(
                "DEU",
                Style::Outline,
                100.0,
                TessellationMethod::Auto,
            ))
            .unwrap();
        assert_eq!(hit.style, Style::Outline);
    }

    #[test]
    fn test_clear_removes_records() {
        let dir = TempDir::new().unwrap();
        let store = PersistentStore::open(&test_config(&dir)).unwrap();
        store.put(test_key("DEU"), &test_set("DEU")).unwrap();
        store.clear().unwrap();
        assert_eq!(store.entry_count(), 0);
        assert!(store.get(&test_key("DEU")).is_none());
    }
}
