//! Pluggable path-selection protocols.
//!
//! The active protocol is chosen when the mesh interface is configured and
//! handed to the runtime as a `Box<dyn PathProtocol>`. All per-interface
//! state lives in the [`MeshState`] passed to every call, so a protocol
//! value holds only its configuration.

use hwmp_core::constants::PXU_FLAG_DELETE;
use hwmp_core::element::{PathSelectionProtocol, ProxyRecord, ProxyUpdate};
use hwmp_core::{Action, ActionFrame, Element, MacAddr, MeshActionCode};

use crate::engine::{EngineAction, Resolution};
use crate::error::EngineError;
use crate::state::{MeshState, bump};

/// Lifetime announced for proxied stations in Proxy Update records.
pub const PROXY_LIFETIME_MS: u32 = 300_000;

pub trait PathProtocol: Send + Sync {
    fn id(&self) -> PathSelectionProtocol;

    /// Resolve the next hop for `dest`, starting a discovery if needed.
    fn discover(
        &self,
        state: &MeshState,
        dest: MacAddr,
        now: u64,
    ) -> (Resolution, Vec<EngineAction>);

    /// Process a decoded mesh action frame received from neighbor `from`.
    fn handle_frame(
        &self,
        state: &MeshState,
        from: MacAddr,
        frame: &ActionFrame,
        now: u64,
    ) -> Result<Vec<EngineAction>, EngineError>;

    /// Decode and process a raw action frame body. Malformed frames are
    /// counted and returned as errors; they never reach the state machine.
    fn handle_bytes(
        &self,
        state: &MeshState,
        from: MacAddr,
        bytes: &[u8],
        now: u64,
    ) -> Result<Vec<EngineAction>, EngineError> {
        let frame = ActionFrame::decode(bytes).inspect_err(|e| {
            bump(&state.diag.malformed);
            tracing::trace!(from = %from, error = %e, "dropping malformed frame");
        })?;
        self.handle_frame(state, from, &frame, now)
    }

    /// The peering with `peer` is gone.
    fn peer_down(&self, state: &MeshState, peer: MacAddr, now: u64) -> Vec<EngineAction>;

    /// Forwarding a data frame toward `dest` failed at the link layer.
    fn forward_failed(&self, state: &MeshState, dest: MacAddr, now: u64) -> Vec<EngineAction>;

    /// Periodic timer work: discovery retries and announcements.
    fn tick(&self, state: &MeshState, now: u64) -> Vec<EngineAction>;

    /// Interface teardown. Fails pending discoveries and clears learned state.
    fn shutdown(&self, state: &MeshState, now: u64) -> Vec<EngineAction>;

    /// Start proxying `station` and announce it to the neighbors.
    fn register_proxy(&self, state: &MeshState, station: MacAddr) -> Vec<EngineAction> {
        if !state.proxy.register_proxy(station) {
            return Vec::new();
        }
        tracing::debug!(station = %station, "registered proxied station");
        vec![proxy_update(state, station, 0)]
    }

    /// Stop proxying `station` and withdraw it from the neighbors.
    fn unregister_proxy(&self, state: &MeshState, station: MacAddr) -> Vec<EngineAction> {
        if !state.proxy.unregister_proxy(station) {
            return Vec::new();
        }
        tracing::debug!(station = %station, "unregistered proxied station");
        vec![proxy_update(state, station, PXU_FLAG_DELETE)]
    }
}

fn proxy_update(state: &MeshState, station: MacAddr, flags: u8) -> EngineAction {
    bump(&state.diag.pxu_tx);
    let pxu = ProxyUpdate {
        flags: 0,
        pu_seq: state.proxy.proxy_update_seq_next(),
        proxy: state.address(),
        records: vec![ProxyRecord {
            flags,
            station,
            seq: state.own_seq(),
            lifetime: PROXY_LIFETIME_MS,
        }],
    };
    EngineAction::Broadcast {
        frame: ActionFrame::new(
            Action::Mesh(MeshActionCode::ProxyUpdate),
            vec![Element::ProxyUpdate(pxu)],
        ),
    }
}

/// Accept frames only from established peers.
pub(crate) fn check_peer(state: &MeshState, from: MacAddr) -> Result<(), EngineError> {
    if state.is_peer(&from) {
        return Ok(());
    }
    bump(&state.diag.non_peer);
    tracing::trace!(from = %from, "dropping frame from non-peer");
    Err(EngineError::NotPeer(from))
}

/// Actions the path-selection layer never handles.
pub(crate) fn is_foreign(action: Action) -> bool {
    matches!(
        action,
        Action::SelfProtected(_)
            | Action::Mesh(MeshActionCode::LinkMetricReport | MeshActionCode::CongestionControl)
    )
}

/// Path selection that only knows direct neighbors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPathProtocol;

impl PathProtocol for NullPathProtocol {
    fn id(&self) -> PathSelectionProtocol {
        PathSelectionProtocol::Null
    }

    fn discover(
        &self,
        state: &MeshState,
        dest: MacAddr,
        _now: u64,
    ) -> (Resolution, Vec<EngineAction>) {
        let resolution = if dest == state.address() || state.proxy.is_proxied(&dest) {
            Resolution::Local
        } else if state.is_peer(&dest) {
            Resolution::NextHop(dest)
        } else {
            Resolution::Unreachable
        };
        (resolution, Vec::new())
    }

    fn handle_frame(
        &self,
        state: &MeshState,
        from: MacAddr,
        frame: &ActionFrame,
        _now: u64,
    ) -> Result<Vec<EngineAction>, EngineError> {
        check_peer(state, from)?;
        if is_foreign(frame.action) {
            return Err(EngineError::Unhandled(frame.action));
        }
        Ok(Vec::new())
    }

    fn peer_down(&self, state: &MeshState, peer: MacAddr, _now: u64) -> Vec<EngineAction> {
        state.remove_peer(&peer);
        Vec::new()
    }

    fn forward_failed(&self, _state: &MeshState, _dest: MacAddr, _now: u64) -> Vec<EngineAction> {
        Vec::new()
    }

    fn tick(&self, _state: &MeshState, _now: u64) -> Vec<EngineAction> {
        Vec::new()
    }

    fn shutdown(&self, state: &MeshState, _now: u64) -> Vec<EngineAction> {
        state.clear();
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::metric::LinkStats;
    use hwmp_core::SelfProtectedCode;

    fn addr(seed: u8) -> MacAddr {
        MacAddr::new([0x02, 0, 0, 0, 0, seed])
    }

    fn state() -> MeshState {
        MeshState::new(addr(1), &EngineConfig::default())
    }

    #[test]
    fn null_protocol_resolves_neighbors_only() {
        let s = state();
        let p = NullPathProtocol;
        s.peer_up(addr(2), LinkStats::default());
        assert_eq!(p.discover(&s, addr(1), 0).0, Resolution::Local);
        assert_eq!(p.discover(&s, addr(2), 0).0, Resolution::NextHop(addr(2)));
        assert_eq!(p.discover(&s, addr(3), 0).0, Resolution::Unreachable);
        assert!(p.peer_down(&s, addr(2), 0).is_empty());
        assert_eq!(p.discover(&s, addr(2), 0).0, Resolution::Unreachable);
    }

    #[test]
    fn malformed_bytes_are_counted() {
        let s = state();
        s.peer_up(addr(2), LinkStats::default());
        let err = NullPathProtocol
            .handle_bytes(&s, addr(2), &[13, 1, 130, 2, 0], 0)
            .unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
        assert_eq!(s.diag.snapshot().malformed, 1);
    }

    #[test]
    fn frames_from_non_peers_are_rejected() {
        let s = state();
        let frame = ActionFrame::hwmp(Vec::new());
        assert_eq!(
            NullPathProtocol.handle_frame(&s, addr(9), &frame, 0),
            Err(EngineError::NotPeer(addr(9)))
        );
        assert_eq!(s.diag.snapshot().non_peer, 1);
    }

    #[test]
    fn peering_frames_are_not_ours() {
        let s = state();
        s.peer_up(addr(2), LinkStats::default());
        let frame = ActionFrame::new(
            Action::SelfProtected(SelfProtectedCode::PeeringOpen),
            Vec::new(),
        );
        assert!(matches!(
            NullPathProtocol.handle_frame(&s, addr(2), &frame, 0),
            Err(EngineError::Unhandled(_))
        ));
    }

    #[test]
    fn register_proxy_announces_once() {
        let s = state();
        let station = MacAddr::new([0x0a, 0, 0, 0, 0, 1]);
        let actions = NullPathProtocol.register_proxy(&s, station);
        assert_eq!(actions.len(), 1);
        let Some(frame) = actions[0].frame() else {
            panic!("expected a frame");
        };
        match &frame.elements[0] {
            Element::ProxyUpdate(pxu) => {
                assert_eq!(pxu.pu_seq, 1);
                assert_eq!(pxu.proxy, addr(1));
                assert_eq!(pxu.records[0].station, station);
                assert!(!pxu.records[0].is_delete());
            }
            other => panic!("unexpected element {other:?}"),
        }
        assert!(NullPathProtocol.register_proxy(&s, station).is_empty());

        let actions = NullPathProtocol.unregister_proxy(&s, station);
        match actions[0].frame().map(|f| &f.elements[0]) {
            Some(Element::ProxyUpdate(pxu)) => {
                assert_eq!(pxu.pu_seq, 2);
                assert!(pxu.records[0].is_delete());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
