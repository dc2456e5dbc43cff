//! Request coalescing for mesh computation.
//!
//! When several callers ask for the same cache key while a computation for it
//! is still running, only the first triggers work; the rest subscribe to a
//! broadcast channel and receive the same result. Tessellating a large region
//! can take hundreds of milliseconds, so duplicate concurrent requests are
//! common around style toggles and rapid reselection.

use crate::cache::types::CacheKey;
use crate::mesh::MeshArtifactSet;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Result broadcast to waiters. Failures are carried as strings so the
/// channel payload stays `Clone`.
pub(crate) type CoalescedResult = Result<Arc<MeshArtifactSet>, String>;

type InFlightMap = Arc<Mutex<HashMap<CacheKey, broadcast::Sender<CoalescedResult>>>>;

fn lock_in_flight(
    map: &InFlightMap,
) -> std::sync::MutexGuard<'_, HashMap<CacheKey, broadcast::Sender<CoalescedResult>>> {
    map.lock().unwrap_or_else(|e| e.into_inner())
}

/// Tracks in-flight mesh computations so duplicate requests wait for the
/// same result instead of triggering duplicate work.
pub struct RequestCoalescer {
    in_flight: InFlightMap,
    stats: Mutex<CoalescerStats>,
}

/// Statistics for monitoring coalescing effectiveness.
#[derive(Debug, Default, Clone)]
pub struct CoalescerStats {
    pub total_requests: u64,
    /// Requests that waited for existing work
    pub coalesced_requests: u64,
    /// Requests that triggered new work
    pub new_requests: u64,
}

impl CoalescerStats {
    /// Fraction of requests that were coalesced, in [0, 1].
    pub fn coalescing_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.coalesced_requests as f64 / self.total_requests as f64
        }
    }
}

impl RequestCoalescer {
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            stats: Mutex::new(CoalescerStats::default()),
        }
    }

    /// Register interest in a key.
    ///
    /// Returns [`CoalesceOutcome::Leader`] with a guard if this is the first
    /// request for the key; the caller must finish the computation through
    /// [`LeaderGuard::complete`]. Returns [`CoalesceOutcome::Follower`] with
    /// a receiver when a computation for the key is already in flight.
    pub(crate) fn register(&self, key: CacheKey) -> CoalesceOutcome {
        let mut in_flight = lock_in_flight(&self.in_flight);
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());

        stats.total_requests += 1;

        if let Some(tx) = in_flight.get(&key) {
            let rx = tx.subscribe();
            stats.coalesced_requests += 1;
            debug!(
                key = %key.storage_name(),
                coalesced = stats.coalesced_requests,
                "coalescing request onto in-flight computation"
            );
            CoalesceOutcome::Follower(rx)
        } else {
            // Capacity 16: the typical case is a handful of concurrent
            // requests for one key.
            let (tx, _rx) = broadcast::channel(16);
            in_flight.insert(key.clone(), tx);
            stats.new_requests += 1;
            debug!(
                key = %key.storage_name(),
                in_flight_count = in_flight.len(),
                "new request, starting computation"
            );
            CoalesceOutcome::Leader(LeaderGuard {
                in_flight: Arc::clone(&self.in_flight),
                key,
                completed: false,
            })
        }
    }

    pub fn stats(&self) -> CoalescerStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn in_flight_count(&self) -> usize {
        lock_in_flight(&self.in_flight).len()
    }

    pub fn log_stats(&self) {
        let stats = self.stats();
        let in_flight_count = self.in_flight_count();

        info!(
            total_requests = stats.total_requests,
            coalesced = stats.coalesced_requests,
            new_requests = stats.new_requests,
            in_flight = in_flight_count,
            coalescing_ratio = format!("{:.1}%", stats.coalescing_ratio() * 100.0),
            "request coalescing statistics"
        );
    }
}

impl Default for RequestCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive right to compute a key, held by the caller that registered
/// first.
///
/// The in-flight entry lives exactly as long as the guard: completing
/// broadcasts the result and clears it, and dropping the guard without a
/// result also clears it, which closes the channel so followers re-contend
/// for leadership instead of waiting on a computation that will never
/// finish. A leader future cancelled mid-computation therefore cannot wedge
/// the key.
pub(crate) struct LeaderGuard {
    in_flight: InFlightMap,
    key: CacheKey,
    completed: bool,
}

impl LeaderGuard {
    pub(crate) fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Broadcast the finished computation to all waiters and clear the key.
    pub(crate) fn complete(mut self, result: CoalescedResult) {
        self.completed = true;
        let removed = lock_in_flight(&self.in_flight).remove(&self.key);
        if let Some(tx) = removed {
            let waiters = tx.receiver_count();
            // Dropped receivers are fine.
            let _ = tx.send(result);
            if waiters > 0 {
                debug!(
                    key = %self.key.storage_name(),
                    waiters,
                    "broadcast result to coalesced waiters"
                );
            }
        }
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        // Removing the entry drops the only sender and closes the channel.
        lock_in_flight(&self.in_flight).remove(&self.key);
        debug!(
            key = %self.key.storage_name(),
            "leader dropped without result, key released"
        );
    }
}

/// Outcome of registering a request.
pub(crate) enum CoalesceOutcome {
    /// First request for the key; the caller computes and completes through
    /// the guard.
    Leader(LeaderGuard),
    /// A computation is in flight; await the receiver for its result.
    Follower(broadcast::Receiver<CoalescedResult>),
}

impl CoalesceOutcome {
    pub(crate) fn is_leader(&self) -> bool {
        matches!(self, Self::Leader(_))
    }

    /// Wait for the in-flight result if this is a follower.
    ///
    /// Returns `None` when the channel closed without a result (leader
    /// dropped mid-computation); callers re-register in that case. Calling
    /// this on a leader releases its key and returns `None`.
    pub(crate) async fn wait(self) -> Option<CoalescedResult> {
        match self {
            Self::Follower(mut rx) => rx.recv().await.ok(),
            Self::Leader(_) => None,
        }
    }
}
