//! Transient memory tier with LRU eviction.

use crate::cache::stats::CacheStats;
use crate::cache::types::{CacheKey, MemoryCacheConfig};
use crate::mesh::MeshArtifactSet;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Entry in the memory tier.
#[derive(Debug, Clone)]
struct MemoryEntry {
    set: Arc<MeshArtifactSet>,
    last_accessed: Instant,
    byte_size: usize,
}

/// Process-lifetime artifact cache.
///
/// Checked first on every lookup and updated after every successful compute.
/// Artifact sets are held behind `Arc` so hits are cheap and eviction never
/// invalidates a set a caller still holds.
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, MemoryEntry>>,
    max_size_bytes: usize,
    current_size_bytes: Mutex<usize>,
    stats: Mutex<CacheStats>,
}

impl MemoryCache {
    pub fn new(config: &MemoryCacheConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_size_bytes: config.max_size_bytes,
            current_size_bytes: Mutex::new(0),
            stats: Mutex::new(CacheStats::new()),
        }
    }

    /// Get a cached artifact set, updating access time on hit.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<MeshArtifactSet>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(entry) = entries.get_mut(key) {
            entry.last_accessed = Instant::now();
            if let Ok(mut stats) = self.stats.lock() {
                stats.record_memory_hit();
            }
            Some(Arc::clone(&entry.set))
        } else {
            if let Ok(mut stats) = self.stats.lock() {
                stats.record_memory_miss();
            }
            None
        }
    }

    /// Insert an artifact set, evicting least-recently-used entries first
    /// when the size cap would be exceeded.
    pub fn put(&self, key: CacheKey, set: Arc<MeshArtifactSet>) {
        let byte_size = set.byte_size();

        {
            let current = *self
                .current_size_bytes
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if current + byte_size > self.max_size_bytes {
                self.evict_until_fits(byte_size);
            }
        }

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut size = self
            .current_size_bytes
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        if let Some(old) = entries.insert(
            key,
            MemoryEntry {
                set,
                last_accessed: Instant::now(),
                byte_size,
            },
        ) {
            *size = size.saturating_sub(old.byte_size);
        }
        *size += byte_size;

        if let Ok(mut stats) = self.stats.lock() {
            stats.update_memory_size(*size, entries.len());
        }
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn size_bytes(&self) -> usize {
        *self
            .current_size_bytes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
        *self
            .current_size_bytes
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = 0;
        if let Ok(mut stats) = self.stats.lock() {
            stats.update_memory_size(0, 0);
        }
    }

    /// Evict oldest entries until `required` bytes fit under the cap.
    fn evict_until_fits(&self, required: usize) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut size = self
            .current_size_bytes
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        let target = self.max_size_bytes.saturating_sub(required);

        let mut by_age: Vec<(CacheKey, Instant, usize)> = entries
            .iter()
            .map(|(k, v)| (k.clone(), v.last_accessed, v.byte_size))
            .collect();
        by_age.sort_by_key(|(_, accessed, _)| *accessed);

        let mut evicted = 0;
        for (key, _, bytes) in by_age {
            if *size <= target {
                break;
            }
            entries.remove(&key);
            *size = size.saturating_sub(bytes);
            evicted += 1;
        }

        if let Ok(mut stats) = self.stats.lock() {
            stats.record_memory_eviction(evicted);
            stats.update_memory_size(*size, entries.len());
        }
    }
}
