//! Mesh routing table.
//!
//! Maps destination addresses to route entries under the freshness rule,
//! with sharded locking so forwarding lookups never wait behind a writer
//! working on an unrelated destination.

pub mod constants;
pub mod table;
pub mod types;

pub use constants::*;
pub use table::RouteTable;
pub use types::{RouteCandidate, RouteEntry, RouteFlags};
