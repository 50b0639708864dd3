//! The route freshness rule.
//!
//! Sequence numbers dominate: newer information always replaces older,
//! whatever its metric. Only at equal sequence numbers does the metric
//! decide, and a tie keeps the existing route so paths do not flap.

/// Result of offering a candidate route to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Candidate installed (new entry or replacement).
    Applied,
    /// Candidate carries an older sequence number.
    Stale,
    /// Same sequence number, metric not strictly better.
    WorseMetric,
}

impl UpdateOutcome {
    #[must_use]
    pub fn is_applied(self) -> bool {
        self == UpdateOutcome::Applied
    }
}

/// Decide whether `(seq, metric)` should replace the existing `(seq, metric)`.
#[must_use]
pub fn decide_update(existing: Option<(u32, u32)>, seq: u32, metric: u32) -> UpdateOutcome {
    match existing {
        None => UpdateOutcome::Applied,
        Some((cur_seq, _)) if seq < cur_seq => UpdateOutcome::Stale,
        Some((cur_seq, cur_metric)) if seq == cur_seq && metric >= cur_metric => {
            UpdateOutcome::WorseMetric
        }
        Some(_) => UpdateOutcome::Applied,
    }
}
