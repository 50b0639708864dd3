//! Link metric protocols.
//!
//! A [`LinkMetric`] turns the link statistics the peering collaborator
//! reports for a neighbor into the per-hop cost added to PREQ, PREP, and
//! RANN metrics as they cross that link.

use hwmp_core::element::PathMetricProtocol;

/// Channel access overhead for one test frame, in microseconds.
pub const AIRTIME_OVERHEAD_US: u64 = 185;

/// Size of the reference test frame, in bits.
pub const AIRTIME_TEST_FRAME_BITS: u64 = 8224;

/// Statistics for the link to one neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkStats {
    /// Current transmit rate in units of 100 kbit/s.
    pub rate_100kbps: u32,
    /// Frame error rate in parts per thousand.
    pub fer_permille: u16,
}

impl LinkStats {
    pub fn new(rate_100kbps: u32, fer_permille: u16) -> Self {
        Self {
            rate_100kbps,
            fer_permille,
        }
    }
}

/// Per-hop path cost.
pub trait LinkMetric: Send + Sync {
    /// Metric protocol this implementation advertises in the mesh configuration.
    fn id(&self) -> PathMetricProtocol;

    /// Cost of one hop over a link with `stats`. Lower is better.
    fn link_cost(&self, stats: &LinkStats) -> u32;
}

/// The default airtime link metric.
///
/// Cost is the expected airtime to deliver a test frame, expressed in
/// units of 0.01 TU (10.24 µs). Unusable links cost `u32::MAX`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AirtimeMetric;

impl LinkMetric for AirtimeMetric {
    fn id(&self) -> PathMetricProtocol {
        PathMetricProtocol::Airtime
    }

    fn link_cost(&self, stats: &LinkStats) -> u32 {
        if stats.rate_100kbps == 0 || stats.fer_permille >= 1000 {
            return u32::MAX;
        }
        let tx_us = AIRTIME_OVERHEAD_US + AIRTIME_TEST_FRAME_BITS * 10 / u64::from(stats.rate_100kbps);
        let with_loss = tx_us * 1000 / (1000 - u64::from(stats.fer_permille));
        u32::try_from(with_loss * 100 / 1024).unwrap_or(u32::MAX)
    }
}

/// Contributes nothing per hop. Path metrics carry only what the originator stamped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMetric;

impl LinkMetric for NullMetric {
    fn id(&self) -> PathMetricProtocol {
        PathMetricProtocol::Null
    }

    fn link_cost(&self, _stats: &LinkStats) -> u32 {
        0
    }
}
