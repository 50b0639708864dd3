//! Routing table constants.

/// Default route lifetime in milliseconds.
pub const DEFAULT_ROUTE_LIFETIME_MS: u32 = 5_000;

/// Default bound on the number of entries.
pub const DEFAULT_MAX_ROUTES: usize = 1024;

/// Number of independently locked shards.
pub const ROUTE_SHARDS: usize = 16;

/// A full table evicts `max_routes / EVICTION_BATCH_DIVISOR` entries at once
/// (at least one), so the scan is paid once per batch of inserts.
pub const EVICTION_BATCH_DIVISOR: usize = 8;
