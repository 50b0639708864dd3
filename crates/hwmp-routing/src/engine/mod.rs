//! The HWMP path-selection engine.
//!
//! [`HwmpEngine`] implements [`PathProtocol`](crate::PathProtocol): it
//! originates and retries PREQs, answers and relays PREQ/PREP/PERR/RANN/PANN
//! elements, and keeps the routing table in [`MeshState`](crate::MeshState)
//! current. It never transmits anything itself; every call returns the
//! [`EngineAction`]s the caller must carry out.

pub mod config;
mod hwmp;
mod receive;
pub mod types;

pub use config::{EngineConfig, RootMode, UnknownRootMode};
pub use hwmp::HwmpEngine;
pub use types::{EngineAction, Resolution};
