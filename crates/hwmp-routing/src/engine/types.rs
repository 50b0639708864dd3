//! Engine output types.

use hwmp_core::{ActionFrame, MacAddr};

/// Work the caller must carry out after an engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineAction {
    /// Send a frame to one neighbor.
    Transmit { to: MacAddr, frame: ActionFrame },
    /// Send a frame to every neighbor.
    Broadcast { frame: ActionFrame },
    /// A discovery this node started has a usable path. Frames queued for
    /// `dest` can be released toward `next_hop`.
    DiscoveryComplete { dest: MacAddr, next_hop: MacAddr },
    /// Discovery for `dest` failed. Frames queued for it should be dropped.
    Unreachable { dest: MacAddr },
}

impl EngineAction {
    /// The frame carried by a transmit or broadcast action.
    #[must_use]
    pub fn frame(&self) -> Option<&ActionFrame> {
        match self {
            EngineAction::Transmit { frame, .. } | EngineAction::Broadcast { frame } => Some(frame),
            _ => None,
        }
    }
}

/// Answer to "where do frames for this destination go".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The destination is this node or a station it proxies.
    Local,
    /// Forward to this neighbor.
    NextHop(MacAddr),
    /// A discovery is in flight. Queue and wait for
    /// [`EngineAction::DiscoveryComplete`] or [`EngineAction::Unreachable`].
    Pending,
    Unreachable,
}
