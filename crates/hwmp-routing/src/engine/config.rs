//! Engine configuration.

use std::str::FromStr;

use hwmp_core::constants::MESH_DEFAULT_TTL;

use crate::discovery::{DEFAULT_PREQ_RETRIES, DEFAULT_PREQ_RETRY_BASE_MS};
use crate::seen::DEFAULT_PREQ_DUP_LIFETIME_MS;
use crate::table::{DEFAULT_MAX_ROUTES, DEFAULT_ROUTE_LIFETIME_MS};

/// Default interval between proactive root PREQs.
pub const DEFAULT_ROOT_INTERVAL_MS: u64 = 2_000;

/// Default interval between root announcements.
pub const DEFAULT_RANN_INTERVAL_MS: u64 = 1_000;

/// Default interval between portal announcements.
pub const DEFAULT_PANN_INTERVAL_MS: u64 = 5_000;

/// Whether and how this node acts as a root for proactive path building.
///
/// The variants are exclusive: a root runs exactly one proactive scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootMode {
    #[default]
    Disabled,
    /// Periodic proactive PREQ. Receivers learn a path to the root only.
    Normal,
    /// Periodic proactive PREQ with the proactive-PREP flag. Receivers
    /// answer with a PREP so the root learns a path back.
    Proactive,
    /// Periodic RANN. Receivers with `rann_reply` answer with a PREQ
    /// toward the root.
    Rann,
}

impl RootMode {
    #[must_use]
    pub fn is_root(self) -> bool {
        self != RootMode::Disabled
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown root mode: {0:?}")]
pub struct UnknownRootMode(pub String);

impl FromStr for RootMode {
    type Err = UnknownRootMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disabled" | "off" | "none" => Ok(RootMode::Disabled),
            "normal" => Ok(RootMode::Normal),
            "proactive" => Ok(RootMode::Proactive),
            "rann" => Ok(RootMode::Rann),
            _ => Err(UnknownRootMode(s.to_string())),
        }
    }
}

/// Tunables for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Initial TTL of originated elements.
    pub ttl: u8,
    /// Lifetime stamped on originated PREQs and PREPs.
    pub route_lifetime_ms: u32,
    pub preq_retries: u8,
    pub preq_retry_base_ms: u64,
    pub preq_dup_lifetime_ms: u64,
    pub max_routes: usize,
    pub root_mode: RootMode,
    pub root_interval_ms: u64,
    pub rann_interval_ms: u64,
    /// Answer RANNs with a unicast PREQ toward the root.
    pub rann_reply: bool,
    /// This node bridges to an external network: announce PANNs and set
    /// the portal bit in RANNs.
    pub portal: bool,
    pub pann_interval_ms: u64,
    /// Set the target-only flag on originated PREQs.
    pub target_only: bool,
    /// Answer PREQs on behalf of targets we hold a fresh route to, when
    /// the target-only flag allows it.
    pub intermediate_reply: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ttl: MESH_DEFAULT_TTL,
            route_lifetime_ms: DEFAULT_ROUTE_LIFETIME_MS,
            preq_retries: DEFAULT_PREQ_RETRIES,
            preq_retry_base_ms: DEFAULT_PREQ_RETRY_BASE_MS,
            preq_dup_lifetime_ms: DEFAULT_PREQ_DUP_LIFETIME_MS,
            max_routes: DEFAULT_MAX_ROUTES,
            root_mode: RootMode::Disabled,
            root_interval_ms: DEFAULT_ROOT_INTERVAL_MS,
            rann_interval_ms: DEFAULT_RANN_INTERVAL_MS,
            rann_reply: true,
            portal: false,
            pann_interval_ms: DEFAULT_PANN_INTERVAL_MS,
            target_only: true,
            intermediate_reply: true,
        }
    }
}
