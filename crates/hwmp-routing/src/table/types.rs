//! Route entry types.

use core::fmt;

use hwmp_core::MacAddr;

/// Route entry flag bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RouteFlags(u8);

impl RouteFlags {
    /// Path discovery completed; the entry may be used for forwarding.
    pub const VALID: RouteFlags = RouteFlags(0x01);
    /// A discovery for this destination is in flight.
    pub const DISCOVER: RouteFlags = RouteFlags(0x02);
    /// The destination is a non-mesh station reached through a proxying mesh node.
    pub const PROXY: RouteFlags = RouteFlags(0x04);

    pub const fn empty() -> Self {
        RouteFlags(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn contains(self, other: RouteFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: RouteFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: RouteFlags) {
        self.0 &= !other.0;
    }
}

impl core::ops::BitOr for RouteFlags {
    type Output = RouteFlags;

    fn bitor(self, rhs: RouteFlags) -> RouteFlags {
        RouteFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for RouteFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(RouteFlags::VALID) {
            names.push("VALID");
        }
        if self.contains(RouteFlags::DISCOVER) {
            names.push("DISCOVER");
        }
        if self.contains(RouteFlags::PROXY) {
            names.push("PROXY");
        }
        write!(f, "RouteFlags({})", names.join(" | "))
    }
}

/// One entry in the routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub destination: MacAddr,
    pub next_hop: MacAddr,
    pub metric: u32,
    pub hop_count: u8,
    pub seq: u32,
    /// Lifetime granted by the last update, in milliseconds.
    pub lifetime: u32,
    /// Absolute expiry time in milliseconds.
    pub expires: u64,
    pub flags: RouteFlags,
    pub created: u64,
    pub last_used: u64,
    /// Mesh node proxying this destination, for `PROXY` entries.
    pub proxy: Option<MacAddr>,
}

impl RouteEntry {
    /// Placeholder entry created when discovery starts.
    pub fn discovering(destination: MacAddr, now: u64) -> Self {
        Self {
            destination,
            next_hop: MacAddr::ZERO,
            metric: u32::MAX,
            hop_count: 0,
            seq: 0,
            lifetime: 0,
            expires: now,
            flags: RouteFlags::DISCOVER,
            created: now,
            last_used: now,
            proxy: None,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.flags.contains(RouteFlags::VALID)
    }

    #[must_use]
    pub fn is_discovering(&self) -> bool {
        self.flags.contains(RouteFlags::DISCOVER)
    }

    /// Uses strict `>`: an entry is still usable at exactly `expires`.
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expires
    }

    /// Valid and not yet expired.
    #[must_use]
    pub fn is_usable(&self, now: u64) -> bool {
        self.is_valid() && !self.is_expired(now)
    }

    /// Record use for forwarding and push expiry out by the granted lifetime.
    pub fn touch(&mut self, now: u64) {
        self.last_used = now;
        self.expires = self.expires.max(now + u64::from(self.lifetime));
    }
}

/// Route information offered to [`RouteTable::update_or_insert`](super::RouteTable::update_or_insert).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteCandidate {
    pub next_hop: MacAddr,
    pub metric: u32,
    pub hop_count: u8,
    pub seq: u32,
    /// Lifetime in milliseconds.
    pub lifetime: u32,
    /// Install the entry as `VALID`.
    pub valid: bool,
    pub proxy: Option<MacAddr>,
}

impl RouteCandidate {
    pub fn new(next_hop: MacAddr, metric: u32, hop_count: u8, seq: u32, lifetime: u32) -> Self {
        Self {
            next_hop,
            metric,
            hop_count,
            seq,
            lifetime,
            valid: true,
            proxy: None,
        }
    }

    /// Same path, installed as a `PROXY` route via `proxy`.
    pub fn via_proxy(self, proxy: MacAddr) -> Self {
        Self {
            proxy: Some(proxy),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(seed: u8) -> MacAddr {
        MacAddr::new([0x02, 0, 0, 0, 0, seed])
    }

    #[test]
    fn flags_insert_remove() {
        let mut flags = RouteFlags::empty();
        flags.insert(RouteFlags::VALID | RouteFlags::PROXY);
        assert!(flags.contains(RouteFlags::VALID));
        assert!(flags.contains(RouteFlags::PROXY));
        flags.remove(RouteFlags::VALID);
        assert!(!flags.contains(RouteFlags::VALID));
        assert_eq!(format!("{flags:?}"), "RouteFlags(PROXY)");
    }

    #[test]
    fn expiry_is_strict() {
        let mut entry = RouteEntry::discovering(addr(1), 1000);
        entry.expires = 2000;
        assert!(!entry.is_expired(2000));
        assert!(entry.is_expired(2001));
    }

    #[test]
    fn touch_extends_but_never_shortens() {
        let mut entry = RouteEntry::discovering(addr(1), 0);
        entry.lifetime = 100;
        entry.expires = 500;
        entry.touch(50);
        assert_eq!(entry.expires, 500);
        entry.touch(450);
        assert_eq!(entry.expires, 550);
        assert_eq!(entry.last_used, 450);
    }

    #[test]
    fn discovering_placeholder_is_unusable() {
        let entry = RouteEntry::discovering(addr(3), 10);
        assert!(entry.is_discovering());
        assert!(!entry.is_usable(10));
    }
}
