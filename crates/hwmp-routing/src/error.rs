//! Engine error types.

use hwmp_core::{Action, DecodeError, MacAddr};

/// Why an inbound frame was not processed.
///
/// None of these are fatal: the frame is dropped, a diagnostic counter is
/// bumped, and processing continues with the next frame.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("frame from non-peer {0}")]
    NotPeer(MacAddr),

    #[error("action {0:?} is not handled by path selection")]
    Unhandled(Action),
}
