//! Duplicate suppression for relayed PREQs.
//!
//! A PREQ is identified by `(originator, preq_id)`. The first copy is
//! processed and relayed; later copies inside the window only refresh the
//! reverse route.

use std::collections::{HashMap, VecDeque};

use hwmp_core::MacAddr;

/// Default suppression window in milliseconds.
pub const DEFAULT_PREQ_DUP_LIFETIME_MS: u64 = 5_000;

/// Hard bound on remembered identifiers. Past it the oldest is forgotten
/// even if it is still inside the window.
pub const SEEN_MAX_ENTRIES: usize = 4096;

type PreqKey = (MacAddr, u32);

/// Time-windowed set of recently seen PREQ identifiers.
#[derive(Debug)]
pub struct PreqSeenCache {
    lifetime: u64,
    max_entries: usize,
    entries: HashMap<PreqKey, u64>,
    /// Insertion order. A record whose stamp no longer matches `entries`
    /// was superseded and is skipped when popped.
    order: VecDeque<(PreqKey, u64)>,
}

impl PreqSeenCache {
    pub fn new(lifetime_ms: u64) -> Self {
        Self::with_capacity(lifetime_ms, SEEN_MAX_ENTRIES)
    }

    pub fn with_capacity(lifetime_ms: u64, max_entries: usize) -> Self {
        Self {
            lifetime: lifetime_ms,
            max_entries: max_entries.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Record `(originator, preq_id)` and return `true` if it was not seen
    /// within the window.
    pub fn insert(&mut self, originator: MacAddr, preq_id: u32, now: u64) -> bool {
        self.cull(now);
        let key = (originator, preq_id);
        match self.entries.get_mut(&key) {
            Some(seen) if now.saturating_sub(*seen) <= self.lifetime => return false,
            Some(seen) => {
                *seen = now;
                self.order.push_back((key, now));
                return true;
            }
            None => {}
        }
        while self.entries.len() >= self.max_entries {
            if !self.pop_oldest() {
                break;
            }
        }
        self.entries.insert(key, now);
        self.order.push_back((key, now));
        true
    }

    fn pop_oldest(&mut self) -> bool {
        let Some((key, stamp)) = self.order.pop_front() else {
            return false;
        };
        if self.entries.get(&key) == Some(&stamp) {
            self.entries.remove(&key);
        }
        true
    }

    #[must_use]
    pub fn contains(&self, originator: &MacAddr, preq_id: u32, now: u64) -> bool {
        self.entries
            .get(&(*originator, preq_id))
            .is_some_and(|seen| now.saturating_sub(*seen) <= self.lifetime)
    }

    /// Drop identifiers older than the window. Returns how many were removed.
    pub fn cull(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        while let Some(&(_, stamp)) = self.order.front() {
            if now.saturating_sub(stamp) <= self.lifetime {
                break;
            }
            self.pop_oldest();
        }
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PreqSeenCache {
    fn default() -> Self {
        Self::new(DEFAULT_PREQ_DUP_LIFETIME_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(seed: u8) -> MacAddr {
        MacAddr::new([0x02, 0, 0, 0, 0, seed])
    }

    #[test]
    fn first_copy_is_new() {
        let mut cache = PreqSeenCache::new(1000);
        assert!(cache.insert(addr(1), 7, 0));
        assert!(!cache.insert(addr(1), 7, 500));
        assert!(cache.insert(addr(1), 8, 500));
        assert!(cache.insert(addr(2), 7, 500));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn window_expiry_readmits() {
        let mut cache = PreqSeenCache::new(1000);
        assert!(cache.insert(addr(1), 7, 0));
        assert!(cache.contains(&addr(1), 7, 1000));
        assert!(!cache.contains(&addr(1), 7, 1001));
        assert!(cache.insert(addr(1), 7, 1001));
    }

    #[test]
    fn flood_inside_window_is_capped() {
        let mut cache = PreqSeenCache::with_capacity(5000, 4);
        for id in 0..10 {
            assert!(cache.insert(addr(1), id, u64::from(id)));
        }
        assert_eq!(cache.len(), 4);
        // the oldest identifiers were forgotten, the newest are still suppressed
        assert!(!cache.contains(&addr(1), 5, 10));
        assert!(cache.contains(&addr(1), 6, 10));
        assert!(!cache.insert(addr(1), 9, 10));
    }

    #[test]
    fn cull_removes_old() {
        let mut cache = PreqSeenCache::new(100);
        cache.insert(addr(1), 1, 0);
        cache.insert(addr(1), 2, 90);
        assert_eq!(cache.cull(150), 1);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
