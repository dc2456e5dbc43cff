//! Cache statistics tracking.

/// Counters for all cache tiers and the coalescer.
///
/// Updated by the tier implementations, snapshotted for diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub memory_hits: u64,
    pub memory_misses: u64,
    pub memory_evictions: u64,
    pub memory_entry_count: usize,
    pub memory_size_bytes: usize,

    pub persistent_hits: u64,
    pub persistent_misses: u64,
    pub persistent_writes: u64,

    pub precomputed_hits: u64,
    pub precomputed_misses: u64,

    /// Full misses that went through the pipeline
    pub computes: u64,
    /// Requests that waited on an in-flight computation
    pub coalesced: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_memory_hit(&mut self) {
        self.memory_hits += 1;
    }

    pub fn record_memory_miss(&mut self) {
        self.memory_misses += 1;
    }

    pub fn record_memory_eviction(&mut self, count: u64) {
        self.memory_evictions += count;
    }

    pub fn update_memory_size(&mut self, bytes: usize, entries: usize) {
        self.memory_size_bytes = bytes;
        self.memory_entry_count = entries;
    }

    pub fn record_persistent_hit(&mut self) {
        self.persistent_hits += 1;
    }

    pub fn record_persistent_miss(&mut self) {
        self.persistent_misses += 1;
    }

    pub fn record_persistent_write(&mut self) {
        self.persistent_writes += 1;
    }

    pub fn record_precomputed_hit(&mut self) {
        self.precomputed_hits += 1;
    }

    pub fn record_precomputed_miss(&mut self) {
        self.precomputed_misses += 1;
    }

    pub fn record_compute(&mut self) {
        self.computes += 1;
    }

    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    /// Memory tier hit rate in [0, 1].
    pub fn memory_hit_rate(&self) -> f64 {
        rate(self.memory_hits, self.memory_misses)
    }

    /// Overall hit rate across all tiers in [0, 1].
    pub fn overall_hit_rate(&self) -> f64 {
        let hits = self.memory_hits + self.persistent_hits + self.precomputed_hits;
        rate(hits, self.computes)
    }

    /// Merge counters from another snapshot.
    pub fn merge(&mut self, other: &CacheStats) {
        self.memory_hits += other.memory_hits;
        self.memory_misses += other.memory_misses;
        self.memory_evictions += other.memory_evictions;
        self.memory_entry_count = self.memory_entry_count.max(other.memory_entry_count);
        self.memory_size_bytes = self.memory_size_bytes.max(other.memory_size_bytes);
        self.persistent_hits += other.persistent_hits;
        self.persistent_misses += other.persistent_misses;
        self.persistent_writes += other.persistent_writes;
        self.precomputed_hits += other.precomputed_hits;
        self.precomputed_misses += other.precomputed_misses;
        self.computes += other.computes;
        self.coalesced += other.coalesced;
    }
}

fn rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
