//! Proxy and portal bookkeeping.
//!
//! Tracks the non-mesh stations this node answers for, the stations other
//! mesh nodes have announced as proxied by them, and the portals heard via
//! portal announcements. The registration set is read on every PREQ and
//! changes rarely, so it sits behind a read-write lock.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU8, Ordering};

use hwmp_core::MacAddr;
use parking_lot::RwLock;

/// A station proxied by another mesh node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyMapping {
    pub proxy: MacAddr,
    pub seq: u32,
    pub expires: u64,
}

/// A portal heard through a portal announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalInfo {
    pub portal: MacAddr,
    pub seq: u32,
    pub hop_count: u8,
    /// Neighbor the freshest announcement arrived from.
    pub via: MacAddr,
    pub last_seen: u64,
}

#[derive(Debug, Default)]
struct Inner {
    local: HashSet<MacAddr>,
    remote: HashMap<MacAddr, ProxyMapping>,
    portals: HashMap<MacAddr, PortalInfo>,
}

#[derive(Debug, Default)]
pub struct ProxyTable {
    inner: RwLock<Inner>,
    pu_seq: AtomicU8,
}

impl ProxyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start answering for `station`. Returns false if already registered.
    pub fn register_proxy(&self, station: MacAddr) -> bool {
        let mut inner = self.inner.write();
        inner.remote.remove(&station);
        inner.local.insert(station)
    }

    /// Stop answering for `station`. Returns false if it was not registered.
    pub fn unregister_proxy(&self, station: MacAddr) -> bool {
        self.inner.write().local.remove(&station)
    }

    /// Whether this node proxies `station`.
    #[must_use]
    pub fn is_proxied(&self, station: &MacAddr) -> bool {
        self.inner.read().local.contains(station)
    }

    #[must_use]
    pub fn local_stations(&self) -> Vec<MacAddr> {
        self.inner.read().local.iter().copied().collect()
    }

    /// Next Proxy Update sequence number (8 bits, wrapping).
    pub fn proxy_update_seq_next(&self) -> u8 {
        self.pu_seq.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Last Proxy Update sequence number handed out.
    #[must_use]
    pub fn proxy_update_seq(&self) -> u8 {
        self.pu_seq.load(Ordering::Relaxed)
    }

    /// Record that `proxy` answers for `station`.
    ///
    /// Ignored for stations this node proxies itself, and for mappings older
    /// than the one already held. Returns true if the mapping was stored.
    pub fn learn_remote(
        &self,
        station: MacAddr,
        proxy: MacAddr,
        seq: u32,
        now: u64,
        lifetime_ms: u32,
    ) -> bool {
        let mut inner = self.inner.write();
        if inner.local.contains(&station) {
            return false;
        }
        let expires = now + u64::from(lifetime_ms);
        match inner.remote.get_mut(&station) {
            Some(m) if m.proxy == proxy && seq < m.seq => false,
            Some(m) => {
                *m = ProxyMapping {
                    proxy,
                    seq,
                    expires,
                };
                true
            }
            None => {
                inner.remote.insert(
                    station,
                    ProxyMapping {
                        proxy,
                        seq,
                        expires,
                    },
                );
                true
            }
        }
    }

    /// Drop the mapping for `station` if it is held by `proxy`.
    pub fn forget_remote(&self, station: &MacAddr, proxy: &MacAddr) -> bool {
        let mut inner = self.inner.write();
        match inner.remote.get(station) {
            Some(m) if m.proxy == *proxy => inner.remote.remove(station).is_some(),
            _ => false,
        }
    }

    /// Mesh node proxying `station`, if known and unexpired.
    #[must_use]
    pub fn proxy_for(&self, station: &MacAddr, now: u64) -> Option<MacAddr> {
        self.inner
            .read()
            .remote
            .get(station)
            .filter(|m| now <= m.expires)
            .map(|m| m.proxy)
    }

    /// Record a portal announcement. Returns true if it was fresher than
    /// the one held.
    pub fn record_portal(
        &self,
        portal: MacAddr,
        seq: u32,
        hop_count: u8,
        via: MacAddr,
        now: u64,
    ) -> bool {
        let mut inner = self.inner.write();
        let fresh = match inner.portals.get(&portal) {
            Some(p) => seq > p.seq || (seq == p.seq && hop_count < p.hop_count),
            None => true,
        };
        if fresh {
            inner.portals.insert(
                portal,
                PortalInfo {
                    portal,
                    seq,
                    hop_count,
                    via,
                    last_seen: now,
                },
            );
        }
        fresh
    }

    #[must_use]
    pub fn portals(&self) -> Vec<PortalInfo> {
        self.inner.read().portals.values().copied().collect()
    }

    /// Remove expired remote mappings and portals not heard for `portal_timeout_ms`.
    pub fn cull(&self, now: u64, portal_timeout_ms: u64) -> usize {
        let mut inner = self.inner.write();
        let before = inner.remote.len() + inner.portals.len();
        inner.remote.retain(|_, m| now <= m.expires);
        inner
            .portals
            .retain(|_, p| now.saturating_sub(p.last_seen) <= portal_timeout_ms);
        before - (inner.remote.len() + inner.portals.len())
    }

    /// Forget remote mappings and portals. Local registrations are kept.
    pub fn clear_learned(&self) {
        let mut inner = self.inner.write();
        inner.remote.clear();
        inner.portals.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sta(seed: u8) -> MacAddr {
        MacAddr::new([0x0a, 0, 0, 0, 0, seed])
    }

    fn mesh(seed: u8) -> MacAddr {
        MacAddr::new([0x02, 0, 0, 0, 0, seed])
    }

    #[test]
    fn register_and_query() {
        let table = ProxyTable::new();
        assert!(!table.is_proxied(&sta(1)));
        assert!(table.register_proxy(sta(1)));
        assert!(!table.register_proxy(sta(1)));
        assert!(table.is_proxied(&sta(1)));
        assert_eq!(table.local_stations(), vec![sta(1)]);
        assert!(table.unregister_proxy(sta(1)));
        assert!(!table.is_proxied(&sta(1)));
    }

    #[test]
    fn pu_seq_wraps_at_eight_bits() {
        let table = ProxyTable::new();
        assert_eq!(table.proxy_update_seq_next(), 1);
        for _ in 0..253 {
            table.proxy_update_seq_next();
        }
        assert_eq!(table.proxy_update_seq_next(), 255);
        assert_eq!(table.proxy_update_seq_next(), 0);
        assert_eq!(table.proxy_update_seq_next(), 1);
    }

    #[test]
    fn remote_mapping_lifecycle() {
        let table = ProxyTable::new();
        assert!(table.learn_remote(sta(1), mesh(5), 3, 0, 1000));
        assert_eq!(table.proxy_for(&sta(1), 1000), Some(mesh(5)));
        assert_eq!(table.proxy_for(&sta(1), 1001), None);

        // older update from the same proxy ignored
        assert!(!table.learn_remote(sta(1), mesh(5), 2, 10, 1000));
        // a different proxy takes over (station roamed)
        assert!(table.learn_remote(sta(1), mesh(6), 1, 20, 1000));
        assert!(!table.forget_remote(&sta(1), &mesh(5)));
        assert!(table.forget_remote(&sta(1), &mesh(6)));
        assert_eq!(table.proxy_for(&sta(1), 20), None);
    }

    #[test]
    fn local_registration_wins_over_remote() {
        let table = ProxyTable::new();
        table.learn_remote(sta(1), mesh(5), 1, 0, 1000);
        table.register_proxy(sta(1));
        assert_eq!(table.proxy_for(&sta(1), 0), None);
        assert!(!table.learn_remote(sta(1), mesh(5), 2, 0, 1000));
    }

    #[test]
    fn portal_freshness() {
        let table = ProxyTable::new();
        assert!(table.record_portal(mesh(9), 5, 3, mesh(1), 0));
        assert!(!table.record_portal(mesh(9), 5, 3, mesh(2), 1));
        assert!(table.record_portal(mesh(9), 5, 2, mesh(2), 2));
        assert!(!table.record_portal(mesh(9), 4, 1, mesh(3), 3));
        assert!(table.record_portal(mesh(9), 6, 7, mesh(3), 4));
        assert_eq!(table.portals()[0].via, mesh(3));
        assert_eq!(table.cull(5000, 1000), 1);
        assert!(table.portals().is_empty());
    }
}
