//! Three-tier mesh caching.
//!
//! - [`MemoryCache`]: transient, LRU-bounded, checked first.
//! - [`PersistentStore`]: directory-backed bincode records surviving
//!   restarts.
//! - [`PrecomputedAssets`]: offline-authored model blobs for allow-listed
//!   regions.
//!
//! [`MeshCacheSystem`] ties the tiers together and coalesces concurrent
//! requests for the same key into a single computation.

mod coalesce;
mod memory;
mod persistent;
mod precomputed;
mod stats;
mod system;
mod types;

pub use coalesce::{CoalescerStats, RequestCoalescer};
pub use memory::MemoryCache;
pub use persistent::{PersistentStore, SCHEMA_VERSION};
pub use precomputed::{MaterialDesc, ModelPrimitive, PrecomputedAssets, PrecomputedModel};
pub use stats::CacheStats;
pub use system::{CacheLookup, MeshCacheSystem};
pub use types::{
    CacheConfig, CacheError, CacheKey, MemoryCacheConfig, PersistentCacheConfig, TierOrigin,
};
