//! Three-tier mesh cache with single-flight computation.
//!
//! Lookup order on every request: memory, persistent store, precomputed
//! asset, full computation. Whatever a lower tier produces is promoted into
//! the memory tier, and computed results worth keeping are written back to
//! the persistent store. Concurrent requests for the same key are coalesced
//! so the computation runs once.

use crate::cache::coalesce::{CoalesceOutcome, LeaderGuard, RequestCoalescer};
use crate::cache::memory::MemoryCache;
use crate::cache::persistent::PersistentStore;
use crate::cache::precomputed::PrecomputedAssets;
use crate::cache::stats::CacheStats;
use crate::cache::types::{CacheConfig, CacheError, CacheKey, TierOrigin};
use crate::mesh::MeshArtifactSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A served artifact set together with the tier that produced it.
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub set: Arc<MeshArtifactSet>,
    pub origin: TierOrigin,
}

/// The cache system facade.
pub struct MeshCacheSystem {
    memory: MemoryCache,
    persistent: Option<Arc<PersistentStore>>,
    assets: PrecomputedAssets,
    coalescer: RequestCoalescer,
    persist_min_compute: std::time::Duration,
    persist_min_bytes: usize,
    stats: Mutex<CacheStats>,
}

impl MeshCacheSystem {
    /// Build the cache system from configuration. Opens the persistent store
    /// when one is configured; a store that fails to open disables the tier
    /// rather than failing the whole system.
    pub fn new(config: &CacheConfig) -> Self {
        let persistent = config.persistent.as_ref().and_then(|pc| {
            match PersistentStore::open(pc) {
                Ok(store) => Some(Arc::new(store)),
                Err(err) => {
                    warn!(error = %err, "persistent tier unavailable, continuing without it");
                    None
                }
            }
        });
        let (persist_min_compute, persist_min_bytes) = config
            .persistent
            .as_ref()
            .map(|pc| (pc.persist_min_compute, pc.persist_min_bytes))
            .unwrap_or_default();

        info!(
            memory_bytes = config.memory.max_size_bytes,
            persistent = persistent.is_some(),
            precomputed_codes = config.precomputed_codes.len(),
            "mesh cache system ready"
        );

        Self {
            memory: MemoryCache::new(&config.memory),
            persistent,
            assets: PrecomputedAssets::new(&config.precomputed_codes),
            coalescer: RequestCoalescer::new(),
            persist_min_compute,
            persist_min_bytes,
            stats: Mutex::new(CacheStats::new()),
        }
    }

    /// Whether `code` is on the precomputed allow-list.
    pub fn is_precomputed(&self, code: &str) -> bool {
        self.assets.is_listed(code)
    }

    /// Look up `key`, falling back through the tiers and finally to
    /// `compute`. `fetch_model` is only invoked for allow-listed keys with no
    /// cached entry, to retrieve the precomputed asset blob.
    ///
    /// Concurrent calls for the same key share one computation: the first
    /// caller runs it, the rest receive the broadcast result with
    /// [`TierOrigin::Computed`].
    pub async fn get_or_compute<M, MFut, F, FFut>(
        &self,
        key: CacheKey,
        fetch_model: M,
        compute: F,
    ) -> Result<CacheLookup, CacheError>
    where
        M: FnOnce() -> MFut,
        MFut: Future<Output = Result<Vec<u8>, String>>,
        F: FnOnce() -> FFut,
        FFut: Future<Output = Result<MeshArtifactSet, String>>,
    {
        if let Some(set) = self.memory.get(&key) {
            return Ok(CacheLookup {
                set,
                origin: TierOrigin::Memory,
            });
        }

        let mut fetch_model = Some(fetch_model);
        let mut compute = Some(compute);

        loop {
            match self.coalescer.register(key.clone()) {
                CoalesceOutcome::Leader(guard) => {
                    let (fetch_model, compute) = match (fetch_model.take(), compute.take()) {
                        (Some(m), Some(f)) => (m, f),
                        // Unreachable: leadership is won at most once per call.
                        _ => {
                            return Err(CacheError::Compute(
                                "computation closures already consumed".into(),
                            ))
                        }
                    };
                    return self.lead(guard, fetch_model, compute).await;
                }
                follower @ CoalesceOutcome::Follower(_) => match follower.wait().await {
                    Some(Ok(set)) => {
                        if let Ok(mut stats) = self.stats.lock() {
                            stats.record_coalesced();
                        }
                        return Ok(CacheLookup {
                            set,
                            origin: TierOrigin::Computed,
                        });
                    }
                    Some(Err(msg)) => return Err(CacheError::Compute(msg)),
                    // Leader dropped without completing; its guard released
                    // the key, so contend again.
                    None => continue,
                },
            }
        }
    }

    /// Leader path: probe the lower tiers, compute on a full miss, and
    /// broadcast whatever happened. If this future is dropped before a
    /// result, the guard releases the key so waiters re-contend.
    async fn lead<M, MFut, F, FFut>(
        &self,
        guard: LeaderGuard,
        fetch_model: M,
        compute: F,
    ) -> Result<CacheLookup, CacheError>
    where
        M: FnOnce() -> MFut,
        MFut: Future<Output = Result<Vec<u8>, String>>,
        F: FnOnce() -> FFut,
        FFut: Future<Output = Result<MeshArtifactSet, String>>,
    {
        let key = guard.key().clone();

        // A previous leader may have finished between our memory probe and
        // winning registration.
        if let Some(set) = self.memory.get(&key) {
            guard.complete(Ok(Arc::clone(&set)));
            return Ok(CacheLookup {
                set,
                origin: TierOrigin::Memory,
            });
        }

        if let Some(set) = self.store_get(&key).await {
            self.memory.put(key.clone(), Arc::clone(&set));
            guard.complete(Ok(Arc::clone(&set)));
            return Ok(CacheLookup {
                set,
                origin: TierOrigin::Persistent,
            });
        }

        if self.assets.applies_to(&key) {
            match fetch_model().await {
                Ok(bytes) => match self.assets.decode(&key, &bytes) {
                    Ok(set) => {
                        let set = Arc::new(set);
                        self.memory.put(key.clone(), Arc::clone(&set));
                        self.store_put(&key, &set).await;
                        guard.complete(Ok(Arc::clone(&set)));
                        return Ok(CacheLookup {
                            set,
                            origin: TierOrigin::Precomputed,
                        });
                    }
                    Err(err) => {
                        warn!(key = %key.storage_name(), error = %err, "precomputed asset unusable, falling back to computation");
                    }
                },
                Err(err) => {
                    warn!(key = %key.storage_name(), error = %err, "precomputed asset fetch failed, falling back to computation");
                }
            }
        }

        let started = Instant::now();
        match compute().await {
            Ok(set) => {
                let elapsed = started.elapsed();
                let set = Arc::new(set);
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_compute();
                }
                debug!(
                    key = %key.storage_name(),
                    vertices = set.vertex_count(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "mesh computed"
                );

                self.memory.put(key.clone(), Arc::clone(&set));
                if self.should_persist(&key, elapsed, set.byte_size()) {
                    self.store_put(&key, &set).await;
                }

                guard.complete(Ok(Arc::clone(&set)));
                Ok(CacheLookup {
                    set,
                    origin: TierOrigin::Computed,
                })
            }
            Err(msg) => {
                guard.complete(Err(msg.clone()));
                Err(CacheError::Compute(msg))
            }
        }
    }

    /// Read through the persistent tier on the blocking pool; record files
    /// for gridded regions run to megabytes.
    async fn store_get(&self, key: &CacheKey) -> Option<Arc<MeshArtifactSet>> {
        let store = Arc::clone(self.persistent.as_ref()?);
        let lookup_key = key.clone();
        match tokio::task::spawn_blocking(move || store.get(&lookup_key)).await {
            Ok(found) => found,
            Err(err) => {
                warn!(key = %key.storage_name(), error = %err, "persistent read task failed");
                None
            }
        }
    }

    /// Write to the persistent tier on the blocking pool. Failures are
    /// logged and swallowed; a missed write-back only costs a recompute.
    async fn store_put(&self, key: &CacheKey, set: &Arc<MeshArtifactSet>) {
        let Some(store) = &self.persistent else {
            return;
        };
        let store = Arc::clone(store);
        let write_key = key.clone();
        let write_set = Arc::clone(set);
        match tokio::task::spawn_blocking(move || store.put(write_key, &write_set)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(key = %key.storage_name(), error = %err, "failed to persist mesh");
            }
            Err(err) => {
                warn!(key = %key.storage_name(), error = %err, "persist task failed");
            }
        }
    }

    /// Write-back policy: always for allow-listed regions, otherwise only
    /// when the result was expensive to compute or large enough that a cold
    /// start would notice.
    fn should_persist(&self, key: &CacheKey, elapsed: std::time::Duration, bytes: usize) -> bool {
        if self.persistent.is_none() {
            return false;
        }
        self.assets.is_listed(&key.code)
            || elapsed >= self.persist_min_compute
            || bytes >= self.persist_min_bytes
    }

    /// Merged statistics snapshot across all tiers.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self
            .stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default();
        stats.merge(&self.memory.stats());
        if let Some(store) = &self.persistent {
            stats.merge(&store.stats());
        }
        stats.merge(&self.assets.stats());
        stats
    }

    pub fn in_flight_count(&self) -> usize {
        self.coalescer.in_flight_count()
    }

    /// Drop the memory tier. Persistent records survive.
    pub fn clear_memory(&self) {
        self.memory.clear();
    }
}
