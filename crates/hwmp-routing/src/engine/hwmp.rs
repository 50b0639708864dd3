//! Origination, timers, and teardown for the HWMP engine.

use hwmp_core::constants::{
    PERR_DFLAG_USN, PERR_MAX_DESTS, PREQ_FLAG_BROADCAST, PREQ_FLAG_PROACTIVE,
    PREQ_FLAG_PROACTIVE_PREP, PREQ_TFLAG_TO, PREQ_TFLAG_USN, RANN_FLAG_PORTAL,
    REASON_MESH_PERR_DEST_UNREACH, REASON_MESH_PERR_NO_FI,
};
use hwmp_core::element::{
    Pann, PathSelectionProtocol, Perr, PerrDest, Preq, PreqTarget, Rann,
};
use hwmp_core::{
    Action, ActionFrame, AddressExtension, Element, MacAddr, MeshActionCode,
};
use parking_lot::Mutex;

use super::config::{EngineConfig, RootMode};
use super::types::{EngineAction, Resolution};
use crate::discovery::RetryAction;
use crate::error::EngineError;
use crate::freshness::UpdateOutcome;
use crate::metric::{AirtimeMetric, LinkMetric};
use crate::protocol::{PathProtocol, check_peer, is_foreign};
use crate::state::{MeshState, bump};

/// Next due time for each periodic announcement.
#[derive(Debug, Default)]
struct Timers {
    next_root: u64,
    next_rann: u64,
    next_pann: u64,
}

/// Hybrid Wireless Mesh Protocol path selection.
pub struct HwmpEngine {
    pub(super) config: EngineConfig,
    pub(super) metric: Box<dyn LinkMetric>,
    timers: Mutex<Timers>,
}

impl HwmpEngine {
    pub fn new(config: EngineConfig, metric: Box<dyn LinkMetric>) -> Self {
        Self {
            config,
            metric,
            timers: Mutex::new(Timers::default()),
        }
    }

    /// Engine using the airtime link metric.
    pub fn with_airtime(config: EngineConfig) -> Self {
        Self::new(config, Box::new(AirtimeMetric))
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn metric(&self) -> &dyn LinkMetric {
        self.metric.as_ref()
    }

    /// Cost of the hop from `from` to this node.
    pub(super) fn hop_cost(&self, state: &MeshState, from: &MacAddr) -> u32 {
        state
            .link_stats(from)
            .map_or(u32::MAX, |stats| self.metric.link_cost(&stats))
    }

    pub(super) fn count_outcome(state: &MeshState, outcome: UpdateOutcome) {
        match outcome {
            UpdateOutcome::Applied => {}
            UpdateOutcome::Stale => bump(&state.diag.stale),
            UpdateOutcome::WorseMetric => bump(&state.diag.worse_metric),
        }
    }

    /// Neighbor or route holding a usable next hop for `dest`.
    fn resolve_known(&self, state: &MeshState, dest: &MacAddr, now: u64) -> Option<MacAddr> {
        if state.is_peer(dest) {
            return Some(*dest);
        }
        let next_hop = state.routes.next_hop(dest, now)?;
        state.routes.touch(dest, now);
        Some(next_hop)
    }

    /// PREQ for `target`, carrying the last seq we hold for it. A relay may
    /// only answer on the target's behalf with something strictly newer.
    fn preq_frame(&self, state: &MeshState, target: MacAddr, preq_id: u32, orig_seq: u32) -> ActionFrame {
        let target_seq = state.routes.lookup(&target).map_or(0, |e| e.seq);
        let mut tflags = if target_seq == 0 { PREQ_TFLAG_USN } else { 0 };
        if self.config.target_only {
            tflags |= PREQ_TFLAG_TO;
        }
        ActionFrame::hwmp(vec![Element::Preq(Preq {
            flags: PREQ_FLAG_BROADCAST,
            hop_count: 0,
            ttl: self.config.ttl,
            preq_id,
            originator: state.address(),
            originator_seq: orig_seq,
            ext: AddressExtension::None,
            lifetime: self.config.route_lifetime_ms,
            metric: 0,
            targets: vec![PreqTarget {
                flags: tflags,
                target,
                seq: target_seq,
            }],
        })])
    }

    /// Proactive PREQ addressed to every node.
    fn root_preq(&self, state: &MeshState, now: u64) -> ActionFrame {
        let mut flags = PREQ_FLAG_PROACTIVE | PREQ_FLAG_BROADCAST;
        if self.config.root_mode == RootMode::Proactive {
            flags |= PREQ_FLAG_PROACTIVE_PREP;
        }
        let preq_id = state.next_preq_id();
        state.seen().insert(state.address(), preq_id, now);
        ActionFrame::hwmp(vec![Element::Preq(Preq {
            flags,
            hop_count: 0,
            ttl: self.config.ttl,
            preq_id,
            originator: state.address(),
            originator_seq: state.next_own_seq(),
            ext: AddressExtension::None,
            lifetime: self.config.route_lifetime_ms,
            metric: 0,
            targets: vec![PreqTarget {
                flags: PREQ_TFLAG_USN,
                target: MacAddr::BROADCAST,
                seq: 0,
            }],
        })])
    }

    fn rann(&self, state: &MeshState) -> ActionFrame {
        let flags = if self.config.portal { RANN_FLAG_PORTAL } else { 0 };
        ActionFrame::hwmp(vec![Element::Rann(Rann {
            flags,
            hop_count: 0,
            ttl: self.config.ttl,
            root: state.address(),
            seq: state.next_own_seq(),
            metric: 0,
        })])
    }

    fn pann(&self, state: &MeshState) -> ActionFrame {
        ActionFrame::new(
            Action::Mesh(MeshActionCode::GateAnnouncement),
            vec![Element::Pann(Pann {
                flags: 0,
                hop_count: 0,
                ttl: self.config.ttl,
                portal: state.address(),
                seq: state.next_own_seq(),
                interval: u16::try_from(self.config.pann_interval_ms).unwrap_or(u16::MAX),
            })],
        )
    }

    /// Broadcast PERRs for `lost` destinations, at most [`PERR_MAX_DESTS`] per element.
    pub(super) fn perr_actions(
        &self,
        state: &MeshState,
        lost: &[(MacAddr, u32)],
        reason: u16,
    ) -> Vec<EngineAction> {
        lost.chunks(PERR_MAX_DESTS)
            .map(|chunk| {
                bump(&state.diag.perr_tx);
                let dests = chunk
                    .iter()
                    .map(|&(dest, seq)| PerrDest {
                        flags: if seq == 0 { PERR_DFLAG_USN } else { 0 },
                        dest,
                        seq,
                        proxied: None,
                        reason,
                    })
                    .collect();
                EngineAction::Broadcast {
                    frame: ActionFrame::hwmp(vec![Element::Perr(Perr {
                        ttl: self.config.ttl,
                        dests,
                    })]),
                }
            })
            .collect()
    }

    fn announcements(&self, state: &MeshState, now: u64) -> Vec<EngineAction> {
        let mut actions = Vec::new();
        let mut timers = self.timers.lock();

        match self.config.root_mode {
            RootMode::Normal | RootMode::Proactive if now >= timers.next_root => {
                timers.next_root = now + self.config.root_interval_ms;
                bump(&state.diag.preq_tx);
                actions.push(EngineAction::Broadcast {
                    frame: self.root_preq(state, now),
                });
            }
            RootMode::Rann if now >= timers.next_rann => {
                timers.next_rann = now + self.config.rann_interval_ms;
                bump(&state.diag.rann_tx);
                actions.push(EngineAction::Broadcast {
                    frame: self.rann(state),
                });
            }
            _ => {}
        }

        if self.config.portal && now >= timers.next_pann {
            timers.next_pann = now + self.config.pann_interval_ms;
            bump(&state.diag.pann_tx);
            actions.push(EngineAction::Broadcast {
                frame: self.pann(state),
            });
        }
        actions
    }
}

impl std::fmt::Debug for HwmpEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HwmpEngine")
            .field("config", &self.config)
            .field("metric", &self.metric.id())
            .finish()
    }
}

impl PathProtocol for HwmpEngine {
    fn id(&self) -> PathSelectionProtocol {
        PathSelectionProtocol::Hwmp
    }

    fn discover(
        &self,
        state: &MeshState,
        dest: MacAddr,
        now: u64,
    ) -> (Resolution, Vec<EngineAction>) {
        if dest == state.address() || state.proxy.is_proxied(&dest) {
            return (Resolution::Local, Vec::new());
        }
        if let Some(next_hop) = self.resolve_known(state, &dest, now) {
            return (Resolution::NextHop(next_hop), Vec::new());
        }
        if let Some(proxy) = state.proxy.proxy_for(&dest, now)
            && let Some(next_hop) = self.resolve_known(state, &proxy, now)
        {
            return (Resolution::NextHop(next_hop), Vec::new());
        }

        let mut discoveries = state.discoveries();
        if discoveries.contains(&dest) {
            return (Resolution::Pending, Vec::new());
        }
        let orig_seq = state.next_own_seq();
        let preq_id = state.next_preq_id();
        discoveries.start(dest, preq_id, orig_seq, now);
        state.routes.set_discovering(dest, now);
        drop(discoveries);

        state.seen().insert(state.address(), preq_id, now);
        bump(&state.diag.preq_tx);
        tracing::debug!(dest = %dest, preq_id, seq = orig_seq, "starting path discovery");
        (
            Resolution::Pending,
            vec![EngineAction::Broadcast {
                frame: self.preq_frame(state, dest, preq_id, orig_seq),
            }],
        )
    }

    fn handle_frame(
        &self,
        state: &MeshState,
        from: MacAddr,
        frame: &ActionFrame,
        now: u64,
    ) -> Result<Vec<EngineAction>, EngineError> {
        check_peer(state, from)?;
        if is_foreign(frame.action) {
            return Err(EngineError::Unhandled(frame.action));
        }

        let mut out = Vec::new();
        for element in &frame.elements {
            match element {
                Element::Preq(preq) => self.on_preq(state, from, preq, now, &mut out),
                Element::Prep(prep) => self.on_prep(state, from, prep, now, &mut out),
                Element::Perr(perr) => self.on_perr(state, from, perr, &mut out),
                Element::Rann(rann) => self.on_rann(state, from, rann, now, &mut out),
                Element::Pann(pann) => self.on_pann(state, from, pann, now, &mut out),
                Element::ProxyUpdate(pxu) => self.on_proxy_update(state, from, pxu, now, &mut out),
                Element::ProxyUpdateConfirm(pxuc) => {
                    bump(&state.diag.pxuc_rx);
                    tracing::trace!(from = %from, pu_seq = pxuc.pu_seq, "proxy update confirmed");
                }
                other => {
                    tracing::trace!(from = %from, id = other.id(), "ignoring element");
                }
            }
        }
        Ok(out)
    }

    fn peer_down(&self, state: &MeshState, peer: MacAddr, _now: u64) -> Vec<EngineAction> {
        state.remove_peer(&peer);
        let lost = state.routes.invalidate_via_next_hop(&peer);
        if lost.is_empty() {
            return Vec::new();
        }
        tracing::debug!(peer = %peer, routes = lost.len(), "peer down, invalidated routes");
        self.perr_actions(state, &lost, REASON_MESH_PERR_DEST_UNREACH)
    }

    fn forward_failed(&self, state: &MeshState, dest: MacAddr, _now: u64) -> Vec<EngineAction> {
        let Some(seq) = state.routes.invalidate(&dest, None) else {
            return Vec::new();
        };
        let proxied = state.routes.invalidate_proxied_by(&dest);
        tracing::debug!(dest = %dest, seq, proxied = proxied.len(), "forwarding failed");
        self.perr_actions(state, &[(dest, seq)], REASON_MESH_PERR_NO_FI)
    }

    fn tick(&self, state: &MeshState, now: u64) -> Vec<EngineAction> {
        let mut actions = Vec::new();

        let mut discoveries = state.discoveries();
        for retry in discoveries.due(now, || state.next_preq_id()) {
            match retry {
                RetryAction::Retransmit {
                    target,
                    preq_id,
                    originator_seq,
                } => {
                    state.seen().insert(state.address(), preq_id, now);
                    bump(&state.diag.preq_tx);
                    tracing::debug!(dest = %target, preq_id, "retransmitting PREQ");
                    actions.push(EngineAction::Broadcast {
                        frame: self.preq_frame(state, target, preq_id, originator_seq),
                    });
                }
                RetryAction::Failed { target } => {
                    state.routes.clear_discovering(&target);
                    bump(&state.diag.discoveries_failed);
                    tracing::debug!(dest = %target, "path discovery failed");
                    actions.push(EngineAction::Unreachable { dest: target });
                }
            }
        }
        drop(discoveries);

        actions.extend(self.announcements(state, now));
        actions
    }

    fn shutdown(&self, state: &MeshState, now: u64) -> Vec<EngineAction> {
        let failed = state.discoveries().fail_all(now);
        state.clear();
        tracing::info!(
            address = %state.address(),
            failed = failed.len(),
            "mesh path selection shut down"
        );
        failed
            .into_iter()
            .map(|dest| {
                bump(&state.diag.discoveries_failed);
                EngineAction::Unreachable { dest }
            })
            .collect()
    }
}
