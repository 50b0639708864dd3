//! Per-interface mesh state.
//!
//! One [`MeshState`] exists per mesh virtual interface. Every engine
//! operation takes it by reference; nothing here is process-global.
//!
//! Lock order: `discoveries` before any route shard. `seen`, `neighbors`,
//! and the proxy table are leaf locks and are never held across a call
//! into another table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use hwmp_core::MacAddr;
use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::discovery::DiscoveryTable;
use crate::engine::EngineConfig;
use crate::metric::LinkStats;
use crate::proxy::ProxyTable;
use crate::seen::PreqSeenCache;
use crate::table::RouteTable;

/// How long a failed discovery stays reported as [`PathState::Failed`].
pub const FAILED_RETENTION_MS: u64 = 30_000;

/// Portals not re-announced for this long are forgotten.
pub const PORTAL_TIMEOUT_MS: u64 = 30_000;

/// Where a destination stands from this node's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathState {
    Unknown,
    Discovering,
    Valid,
    /// The last discovery exhausted its retries.
    Failed,
}

macro_rules! counters {
    ($($name:ident),* $(,)?) => {
        /// Protocol counters. Updated with relaxed atomics from any context.
        #[derive(Debug, Default)]
        pub struct Diagnostics {
            $(pub $name: AtomicU64,)*
        }

        /// Point-in-time copy of [`Diagnostics`].
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct DiagnosticsSnapshot {
            $(pub $name: u64,)*
        }

        impl Diagnostics {
            #[must_use]
            pub fn snapshot(&self) -> DiagnosticsSnapshot {
                DiagnosticsSnapshot {
                    $($name: self.$name.load(Ordering::Relaxed),)*
                }
            }

            pub fn reset(&self) {
                $(self.$name.store(0, Ordering::Relaxed);)*
            }
        }
    };
}

counters!(
    malformed,
    non_peer,
    ttl_drop,
    dup_preq,
    stale,
    worse_metric,
    preq_tx,
    preq_rx,
    prep_tx,
    prep_rx,
    prep_no_reverse,
    perr_tx,
    perr_rx,
    rann_tx,
    rann_rx,
    pann_tx,
    pann_rx,
    pxu_tx,
    pxu_rx,
    pxuc_rx,
    discoveries_completed,
    discoveries_failed,
);

/// Bump a counter by one.
pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Everything one mesh interface knows about paths and neighbors.
pub struct MeshState {
    address: MacAddr,
    pub routes: RouteTable,
    discoveries: Mutex<DiscoveryTable>,
    seen: Mutex<PreqSeenCache>,
    pub proxy: ProxyTable,
    neighbors: RwLock<HashMap<MacAddr, LinkStats>>,
    own_seq: AtomicU32,
    preq_id: AtomicU32,
    pub diag: Diagnostics,
}

impl MeshState {
    pub fn new(address: MacAddr, config: &EngineConfig) -> Self {
        Self {
            address,
            routes: RouteTable::new(config.max_routes),
            discoveries: Mutex::new(DiscoveryTable::new(
                config.preq_retries,
                config.preq_retry_base_ms,
            )),
            seen: Mutex::new(PreqSeenCache::new(config.preq_dup_lifetime_ms)),
            proxy: ProxyTable::new(),
            neighbors: RwLock::new(HashMap::new()),
            own_seq: AtomicU32::new(0),
            preq_id: AtomicU32::new(0),
            diag: Diagnostics::default(),
        }
    }

    /// This interface's mesh address.
    #[must_use]
    pub fn address(&self) -> MacAddr {
        self.address
    }

    /// Increment and return this node's HWMP sequence number.
    pub fn next_own_seq(&self) -> u32 {
        self.own_seq.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }

    #[must_use]
    pub fn own_seq(&self) -> u32 {
        self.own_seq.load(Ordering::Acquire)
    }

    /// Raise this node's sequence number to at least `seq`.
    pub fn raise_own_seq(&self, seq: u32) {
        self.own_seq.fetch_max(seq, Ordering::AcqRel);
    }

    /// Fresh PREQ identifier.
    pub fn next_preq_id(&self) -> u32 {
        self.preq_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Lock the discovery table. Take this before touching routes that a
    /// discovery may be waiting on.
    pub fn discoveries(&self) -> MutexGuard<'_, DiscoveryTable> {
        self.discoveries.lock()
    }

    pub fn seen(&self) -> MutexGuard<'_, PreqSeenCache> {
        self.seen.lock()
    }

    /// A peering with `peer` reached the established state.
    pub fn peer_up(&self, peer: MacAddr, stats: LinkStats) {
        self.neighbors.write().insert(peer, stats);
    }

    /// New link statistics for an established peer. Returns false if
    /// `peer` is not a neighbor.
    pub fn update_link(&self, peer: &MacAddr, stats: LinkStats) -> bool {
        match self.neighbors.write().get_mut(peer) {
            Some(s) => {
                *s = stats;
                true
            }
            None => false,
        }
    }

    /// Forget a neighbor. Route cleanup is the engine's job.
    pub fn remove_peer(&self, peer: &MacAddr) -> Option<LinkStats> {
        self.neighbors.write().remove(peer)
    }

    #[must_use]
    pub fn is_peer(&self, addr: &MacAddr) -> bool {
        self.neighbors.read().contains_key(addr)
    }

    #[must_use]
    pub fn link_stats(&self, peer: &MacAddr) -> Option<LinkStats> {
        self.neighbors.read().get(peer).copied()
    }

    #[must_use]
    pub fn neighbors(&self) -> Vec<MacAddr> {
        self.neighbors.read().keys().copied().collect()
    }

    /// Current state of the path to `dest`.
    #[must_use]
    pub fn path_state(&self, dest: &MacAddr, now: u64) -> PathState {
        let discoveries = self.discoveries.lock();
        if discoveries.contains(dest) {
            return PathState::Discovering;
        }
        if self.routes.next_hop(dest, now).is_some() {
            return PathState::Valid;
        }
        if discoveries.is_failed(dest) {
            return PathState::Failed;
        }
        PathState::Unknown
    }

    /// Periodic cleanup of every table. Returns the number of routes removed.
    pub fn sweep_expired(&self, now: u64) -> usize {
        let removed = self.routes.sweep_expired(now);
        self.seen.lock().cull(now);
        self.proxy.cull(now, PORTAL_TIMEOUT_MS);
        self.discoveries
            .lock()
            .cull_failed(now, FAILED_RETENTION_MS);
        if removed > 0 {
            tracing::debug!(removed, remaining = self.routes.len(), "swept expired routes");
        }
        removed
    }

    /// Drop all learned state. Neighbors, proxy registrations, and sequence
    /// counters survive.
    pub fn clear(&self) {
        self.routes.clear();
        self.seen.lock().clear();
        self.proxy.clear_learned();
    }
}

impl std::fmt::Debug for MeshState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshState")
            .field("address", &self.address)
            .field("routes", &self.routes.len())
            .field("discoveries", &self.discoveries.lock().len())
            .field("neighbors", &self.neighbors.read().len())
            .field("own_seq", &self.own_seq())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RouteCandidate;

    fn addr(seed: u8) -> MacAddr {
        MacAddr::new([0x02, 0, 0, 0, 0, seed])
    }

    fn state() -> MeshState {
        MeshState::new(addr(1), &EngineConfig::default())
    }

    #[test]
    fn sequence_counters() {
        let s = state();
        assert_eq!(s.own_seq(), 0);
        assert_eq!(s.next_own_seq(), 1);
        assert_eq!(s.next_own_seq(), 2);
        s.raise_own_seq(10);
        assert_eq!(s.own_seq(), 10);
        s.raise_own_seq(4);
        assert_eq!(s.own_seq(), 10);
        assert_eq!(s.next_preq_id(), 1);
        assert_eq!(s.next_preq_id(), 2);
    }

    #[test]
    fn neighbor_tracking() {
        let s = state();
        assert!(!s.is_peer(&addr(2)));
        assert!(!s.update_link(&addr(2), LinkStats::new(10, 0)));
        s.peer_up(addr(2), LinkStats::new(540, 0));
        assert!(s.is_peer(&addr(2)));
        assert!(s.update_link(&addr(2), LinkStats::new(60, 5)));
        assert_eq!(s.link_stats(&addr(2)), Some(LinkStats::new(60, 5)));
        assert_eq!(s.remove_peer(&addr(2)), Some(LinkStats::new(60, 5)));
        assert!(s.neighbors().is_empty());
    }

    #[test]
    fn path_state_transitions() {
        let s = state();
        let b = addr(9);
        assert_eq!(s.path_state(&b, 0), PathState::Unknown);

        s.discoveries().start(b, 1, 1, 0);
        s.routes.set_discovering(b, 0);
        assert_eq!(s.path_state(&b, 0), PathState::Discovering);

        s.discoveries().complete(&b, 1);
        s.routes.clear_discovering(&b);
        s.routes
            .update_or_insert(b, RouteCandidate::new(addr(2), 10, 1, 1, 5000), 0);
        assert_eq!(s.path_state(&b, 0), PathState::Valid);
        assert_eq!(s.path_state(&b, 5001), PathState::Unknown);

        s.routes.invalidate(&b, None);
        s.discoveries().start(b, 2, 2, 10);
        s.discoveries().fail_all(20);
        assert_eq!(s.path_state(&b, 20), PathState::Failed);
        s.sweep_expired(20 + FAILED_RETENTION_MS + 1);
        assert_eq!(s.path_state(&b, 20 + FAILED_RETENTION_MS + 1), PathState::Unknown);
    }

    #[test]
    fn diagnostics_snapshot_and_reset() {
        let s = state();
        bump(&s.diag.malformed);
        bump(&s.diag.malformed);
        bump(&s.diag.preq_tx);
        let snap = s.diag.snapshot();
        assert_eq!(snap.malformed, 2);
        assert_eq!(snap.preq_tx, 1);
        assert_eq!(snap.prep_rx, 0);
        s.diag.reset();
        assert_eq!(s.diag.snapshot(), DiagnosticsSnapshot::default());
    }

    #[test]
    fn clear_keeps_neighbors_and_registrations() {
        let s = state();
        s.peer_up(addr(2), LinkStats::default());
        s.proxy.register_proxy(addr(0x50));
        s.routes
            .update_or_insert(addr(3), RouteCandidate::new(addr(2), 1, 1, 1, 5000), 0);
        s.seen().insert(addr(3), 1, 0);
        s.clear();
        assert!(s.routes.is_empty());
        assert!(s.seen().is_empty());
        assert!(s.is_peer(&addr(2)));
        assert!(s.proxy.is_proxied(&addr(0x50)));
    }
}
