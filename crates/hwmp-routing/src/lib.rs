//! Routing and path selection for an 802.11s mesh interface.
//!
//! This crate holds the per-interface mesh state (routing table, in-flight
//! discoveries, PREQ duplicate cache, proxy registrations, neighbor links)
//! and the HWMP protocol engine that reads and writes it. The engine is
//! driven from two contexts, the receive path and a periodic timer, and
//! answers with [`EngineAction`]s for the caller to transmit or surface.

pub mod discovery;
pub mod engine;
pub mod error;
pub mod freshness;
pub mod metric;
pub mod protocol;
pub mod proxy;
pub mod seen;
pub mod state;
pub mod table;

pub use engine::{EngineAction, EngineConfig, HwmpEngine, Resolution, RootMode, UnknownRootMode};
pub use error::EngineError;
pub use freshness::{UpdateOutcome, decide_update};
pub use metric::{AirtimeMetric, LinkMetric, LinkStats, NullMetric};
pub use protocol::{NullPathProtocol, PathProtocol};
pub use proxy::{PortalInfo, ProxyMapping, ProxyTable};
pub use state::{Diagnostics, DiagnosticsSnapshot, MeshState, PathState};
pub use table::{RouteCandidate, RouteEntry, RouteFlags, RouteTable};
