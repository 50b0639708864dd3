//! Sharded routing table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use hwmp_core::MacAddr;
use parking_lot::RwLock;

use super::constants::{DEFAULT_MAX_ROUTES, EVICTION_BATCH_DIVISOR, ROUTE_SHARDS};
use super::types::{RouteCandidate, RouteEntry, RouteFlags};
use crate::freshness::{UpdateOutcome, decide_update};

type Shard = RwLock<HashMap<MacAddr, RouteEntry>>;

/// Routing table keyed by destination address.
///
/// Each shard has its own lock: writers to one destination never block
/// readers of destinations in other shards. The entry count is bounded;
/// inserting into a full table evicts instead of failing.
#[must_use]
pub struct RouteTable {
    shards: Box<[Shard]>,
    len: AtomicUsize,
    max_routes: usize,
}

fn shard_index(dest: &MacAddr) -> usize {
    let folded = dest.octets().iter().fold(0u8, |acc, b| acc.rotate_left(3) ^ b);
    usize::from(folded) % ROUTE_SHARDS
}

impl RouteTable {
    pub fn new(max_routes: usize) -> Self {
        let shards = (0..ROUTE_SHARDS)
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            shards,
            len: AtomicUsize::new(0),
            max_routes: max_routes.max(1),
        }
    }

    fn shard(&self, dest: &MacAddr) -> &Shard {
        &self.shards[shard_index(dest)]
    }

    /// Copy of the entry for `dest`, valid or not.
    #[must_use]
    pub fn lookup(&self, dest: &MacAddr) -> Option<RouteEntry> {
        self.shard(dest).read().get(dest).cloned()
    }

    /// Next hop for `dest` if the entry is valid and unexpired.
    #[must_use]
    pub fn next_hop(&self, dest: &MacAddr, now: u64) -> Option<MacAddr> {
        self.shard(dest)
            .read()
            .get(dest)
            .filter(|e| e.is_usable(now))
            .map(|e| e.next_hop)
    }

    #[must_use]
    pub fn contains(&self, dest: &MacAddr) -> bool {
        self.shard(dest).read().contains_key(dest)
    }

    /// Offer a candidate route under the freshness rule.
    ///
    /// On replacement the entry keeps its creation time and any in-flight
    /// `DISCOVER` mark.
    pub fn update_or_insert(
        &self,
        dest: MacAddr,
        candidate: RouteCandidate,
        now: u64,
    ) -> UpdateOutcome {
        if !self.contains(&dest) && self.len.load(Ordering::Relaxed) >= self.max_routes {
            self.evict_batch();
        }

        let mut shard = self.shard(&dest).write();
        let existing = shard.get(&dest).map(|e| (e.seq, e.metric));
        let outcome = decide_update(existing, candidate.seq, candidate.metric);
        if !outcome.is_applied() {
            return outcome;
        }

        let mut flags = RouteFlags::empty();
        if candidate.valid {
            flags.insert(RouteFlags::VALID);
        }
        if candidate.proxy.is_some() {
            flags.insert(RouteFlags::PROXY);
        }
        let expires = now + u64::from(candidate.lifetime);

        match shard.get_mut(&dest) {
            Some(entry) => {
                if entry.is_discovering() {
                    flags.insert(RouteFlags::DISCOVER);
                }
                entry.next_hop = candidate.next_hop;
                entry.metric = candidate.metric;
                entry.hop_count = candidate.hop_count;
                entry.seq = candidate.seq;
                entry.lifetime = candidate.lifetime;
                entry.expires = expires;
                entry.flags = flags;
                entry.proxy = candidate.proxy;
                entry.last_used = entry.last_used.max(now);
            }
            None => {
                shard.insert(
                    dest,
                    RouteEntry {
                        destination: dest,
                        next_hop: candidate.next_hop,
                        metric: candidate.metric,
                        hop_count: candidate.hop_count,
                        seq: candidate.seq,
                        lifetime: candidate.lifetime,
                        expires,
                        flags,
                        created: now,
                        last_used: now,
                        proxy: candidate.proxy,
                    },
                );
                self.len.fetch_add(1, Ordering::Relaxed);
            }
        }
        outcome
    }

    /// Mark `dest` usable. Returns false (and logs) if there is no entry.
    pub fn mark_valid(&self, dest: &MacAddr) -> bool {
        match self.shard(dest).write().get_mut(dest) {
            Some(entry) => {
                entry.flags.insert(RouteFlags::VALID);
                true
            }
            None => {
                tracing::warn!(dest = %dest, "mark_valid on untracked destination");
                false
            }
        }
    }

    /// Create an invalid placeholder for a discovery, or flag the existing entry.
    pub fn set_discovering(&self, dest: MacAddr, now: u64) {
        if !self.contains(&dest) && self.len.load(Ordering::Relaxed) >= self.max_routes {
            self.evict_batch();
        }
        let mut shard = self.shard(&dest).write();
        match shard.get_mut(&dest) {
            Some(entry) => entry.flags.insert(RouteFlags::DISCOVER),
            None => {
                shard.insert(dest, RouteEntry::discovering(dest, now));
                self.len.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn clear_discovering(&self, dest: &MacAddr) {
        if let Some(entry) = self.shard(dest).write().get_mut(dest) {
            entry.flags.remove(RouteFlags::DISCOVER);
        }
    }

    /// Clear `VALID` on `dest`, raising its seq to `seq` if that is newer.
    ///
    /// Returns the entry's seq if it was valid before the call.
    pub fn invalidate(&self, dest: &MacAddr, seq: Option<u32>) -> Option<u32> {
        let mut shard = self.shard(dest).write();
        let entry = shard.get_mut(dest).filter(|e| e.is_valid())?;
        entry.flags.remove(RouteFlags::VALID);
        if let Some(seq) = seq {
            entry.seq = entry.seq.max(seq);
        }
        Some(entry.seq)
    }

    /// Invalidate (without removing) every valid entry routed through `next_hop`.
    ///
    /// Returns `(destination, seq)` for each entry that was invalidated.
    pub fn invalidate_via_next_hop(&self, next_hop: &MacAddr) -> Vec<(MacAddr, u32)> {
        let mut lost = Vec::new();
        for shard in self.shards.iter() {
            for entry in shard.write().values_mut() {
                if entry.is_valid() && entry.next_hop == *next_hop {
                    entry.flags.remove(RouteFlags::VALID);
                    lost.push((entry.destination, entry.seq));
                }
            }
        }
        lost
    }

    /// Invalidate every valid `PROXY` entry whose proxy is `proxy`.
    pub fn invalidate_proxied_by(&self, proxy: &MacAddr) -> Vec<MacAddr> {
        let mut lost = Vec::new();
        for shard in self.shards.iter() {
            for entry in shard.write().values_mut() {
                if entry.is_valid() && entry.proxy.as_ref() == Some(proxy) {
                    entry.flags.remove(RouteFlags::VALID);
                    lost.push(entry.destination);
                }
            }
        }
        lost
    }

    /// Record forwarding use of `dest`, extending its expiry.
    pub fn touch(&self, dest: &MacAddr, now: u64) {
        if let Some(entry) = self.shard(dest).write().get_mut(dest) {
            entry.touch(now);
        }
    }

    /// Remove expired entries that have no discovery in flight.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self, now: u64) -> usize {
        let mut removed = 0;
        for shard in self.shards.iter() {
            let mut map = shard.write();
            let before = map.len();
            map.retain(|_, e| e.is_discovering() || !e.is_expired(now));
            removed += before - map.len();
        }
        self.len.fetch_sub(removed, Ordering::Relaxed);
        removed
    }

    pub fn remove(&self, dest: &MacAddr) -> Option<RouteEntry> {
        let removed = self.shard(dest).write().remove(dest);
        if removed.is_some() {
            self.len.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    pub fn clear(&self) {
        for shard in self.shards.iter() {
            let mut map = shard.write();
            self.len.fetch_sub(map.len(), Ordering::Relaxed);
            map.clear();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn max_routes(&self) -> usize {
        self.max_routes
    }

    /// Copies of all entries, in no particular order.
    #[must_use]
    pub fn entries(&self) -> Vec<RouteEntry> {
        self.shards
            .iter()
            .flat_map(|s| s.read().values().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Evict a batch of entries: least recently used invalid entries first,
    /// then valid ones, and discovering placeholders only as a last resort.
    ///
    /// Returns the number of entries removed.
    fn evict_batch(&self) -> usize {
        let rank = |e: &RouteEntry| {
            let tier: u8 = if e.is_discovering() {
                2
            } else if e.is_valid() {
                1
            } else {
                0
            };
            (tier, e.last_used)
        };

        let mut ranked: Vec<((u8, u64), MacAddr)> = self
            .shards
            .iter()
            .flat_map(|s| {
                s.read()
                    .values()
                    .map(|e| (rank(e), e.destination))
                    .collect::<Vec<_>>()
            })
            .collect();
        let batch = (self.max_routes / EVICTION_BATCH_DIVISOR).max(1);
        if ranked.len() > batch {
            ranked.select_nth_unstable_by_key(batch - 1, |&(r, _)| r);
            ranked.truncate(batch);
        }

        let removed = ranked
            .iter()
            .filter(|(_, dest)| self.remove(dest).is_some())
            .count();
        tracing::debug!(removed, "route table full, evicted");
        removed
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ROUTES)
    }
}
