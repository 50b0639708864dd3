//! In-flight path discoveries originated by this node.
//!
//! The table is driven from two sides: the timer walks it for due retries,
//! and the receive path removes an entry when a matching PREP arrives. Both
//! run under the same lock (held by [`MeshState`](crate::MeshState)), so a
//! discovery is either retransmitted or completed, never both.

use std::collections::HashMap;

use hwmp_core::MacAddr;

/// Default number of PREQ retransmissions after the first transmission.
pub const DEFAULT_PREQ_RETRIES: u8 = 3;

/// Default interval before the first retransmission, in milliseconds.
pub const DEFAULT_PREQ_RETRY_BASE_MS: u64 = 512;

/// Backoff grows by doubling up to this multiple of the base interval.
pub const MAX_BACKOFF_FACTOR: u64 = 8;

/// Retry delay after `attempt` transmissions (1-based).
#[must_use]
pub fn backoff(base_ms: u64, attempt: u32) -> u64 {
    let factor = 1u64
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(MAX_BACKOFF_FACTOR)
        .min(MAX_BACKOFF_FACTOR);
    base_ms.saturating_mul(factor)
}

/// Originator state for one destination being discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub target: MacAddr,
    /// Identifier of the most recent PREQ transmission.
    pub preq_id: u32,
    /// Originator seq stamped on every PREQ of this discovery.
    pub originator_seq: u32,
    pub retries_remaining: u8,
    /// Transmissions so far, including the first.
    pub attempts: u32,
    pub started: u64,
    pub next_retry: u64,
}

/// What the timer should do for a discovery that came due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryAction {
    /// Send another PREQ with a fresh identifier.
    Retransmit {
        target: MacAddr,
        preq_id: u32,
        originator_seq: u32,
    },
    /// Retries exhausted; the destination is unreachable.
    Failed { target: MacAddr },
}

/// Discoveries keyed by target, plus the set of targets whose last
/// discovery failed.
#[derive(Debug)]
pub struct DiscoveryTable {
    pending: HashMap<MacAddr, Discovery>,
    failed: HashMap<MacAddr, u64>,
    retries: u8,
    retry_base_ms: u64,
}

impl DiscoveryTable {
    pub fn new(retries: u8, retry_base_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            failed: HashMap::new(),
            retries,
            retry_base_ms,
        }
    }

    /// Begin discovering `target`. Returns false if one is already in flight.
    pub fn start(&mut self, target: MacAddr, preq_id: u32, originator_seq: u32, now: u64) -> bool {
        if self.pending.contains_key(&target) {
            return false;
        }
        self.failed.remove(&target);
        self.pending.insert(
            target,
            Discovery {
                target,
                preq_id,
                originator_seq,
                retries_remaining: self.retries,
                attempts: 1,
                started: now,
                next_retry: now + backoff(self.retry_base_ms, 1),
            },
        );
        true
    }

    #[must_use]
    pub fn get(&self, target: &MacAddr) -> Option<&Discovery> {
        self.pending.get(target)
    }

    #[must_use]
    pub fn contains(&self, target: &MacAddr) -> bool {
        self.pending.contains_key(target)
    }

    /// Remove the discovery for `target` if a reply answering
    /// `originator_seq` is fresh enough for it.
    ///
    /// This is the check-and-clear the PREP handler performs before marking
    /// the route valid.
    pub fn complete(&mut self, target: &MacAddr, originator_seq: u32) -> Option<Discovery> {
        match self.pending.get(target) {
            Some(d) if originator_seq >= d.originator_seq => self.pending.remove(target),
            _ => None,
        }
    }

    /// Collect retries that are due at `now`.
    ///
    /// Due discoveries with retries left are rescheduled with a fresh PREQ
    /// identifier from `next_preq_id`; exhausted ones are removed and
    /// remembered as failed.
    pub fn due(&mut self, now: u64, mut next_preq_id: impl FnMut() -> u32) -> Vec<RetryAction> {
        let mut actions = Vec::new();
        let mut exhausted = Vec::new();

        for (target, d) in &mut self.pending {
            if now < d.next_retry {
                continue;
            }
            if d.retries_remaining == 0 {
                exhausted.push(*target);
                continue;
            }
            d.retries_remaining -= 1;
            d.attempts += 1;
            d.preq_id = next_preq_id();
            d.next_retry = now + backoff(self.retry_base_ms, d.attempts);
            actions.push(RetryAction::Retransmit {
                target: *target,
                preq_id: d.preq_id,
                originator_seq: d.originator_seq,
            });
        }

        for target in exhausted {
            self.pending.remove(&target);
            self.failed.insert(target, now);
            actions.push(RetryAction::Failed { target });
        }
        actions
    }

    /// Fail every pending discovery, returning their targets.
    pub fn fail_all(&mut self, now: u64) -> Vec<MacAddr> {
        let targets: Vec<MacAddr> = self.pending.drain().map(|(t, _)| t).collect();
        for t in &targets {
            self.failed.insert(*t, now);
        }
        targets
    }

    #[must_use]
    pub fn is_failed(&self, target: &MacAddr) -> bool {
        self.failed.contains_key(target)
    }

    pub fn clear_failed(&mut self, target: &MacAddr) {
        self.failed.remove(target);
    }

    /// Forget failures recorded more than `max_age_ms` ago.
    pub fn cull_failed(&mut self, now: u64, max_age_ms: u64) -> usize {
        let before = self.failed.len();
        self.failed
            .retain(|_, at| now.saturating_sub(*at) <= max_age_ms);
        before - self.failed.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn targets(&self) -> Vec<MacAddr> {
        self.pending.keys().copied().collect()
    }
}

impl Default for DiscoveryTable {
    fn default() -> Self {
        Self::new(DEFAULT_PREQ_RETRIES, DEFAULT_PREQ_RETRY_BASE_MS)
    }
}
