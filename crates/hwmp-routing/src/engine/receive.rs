//! Receive-path handlers for HWMP elements.
//!
//! Each handler updates [`MeshState`] and appends the frames to send in
//! response. A handler never fails: anything it cannot use is counted and
//! dropped.

use hwmp_core::constants::{PREQ_FLAG_BROADCAST, PREQ_TFLAG_TO, PREQ_TFLAG_USN};
use hwmp_core::element::{
    Pann, Perr, PerrDest, Preq, PreqTarget, Prep, ProxyUpdate, ProxyUpdateConfirm, Rann,
};
use hwmp_core::{Action, ActionFrame, AddressExtension, Element, MacAddr, MeshActionCode};

use super::hwmp::HwmpEngine;
use super::types::EngineAction;
use crate::freshness::UpdateOutcome;
use crate::state::{MeshState, bump};
use crate::table::RouteCandidate;

fn hwmp(element: Element) -> ActionFrame {
    ActionFrame::hwmp(vec![element])
}

impl HwmpEngine {
    pub(super) fn on_preq(
        &self,
        state: &MeshState,
        from: MacAddr,
        preq: &Preq,
        now: u64,
        out: &mut Vec<EngineAction>,
    ) {
        bump(&state.diag.preq_rx);
        if preq.ttl == 0 {
            bump(&state.diag.ttl_drop);
            tracing::trace!(from = %from, "dropping PREQ with zero TTL");
            return;
        }
        if preq.originator == state.address() {
            return;
        }

        let metric = preq.metric.saturating_add(self.hop_cost(state, &from));
        let hop_count = preq.hop_count.saturating_add(1);

        let reverse = RouteCandidate::new(from, metric, hop_count, preq.originator_seq, preq.lifetime);
        let outcome = state.routes.update_or_insert(preq.originator, reverse, now);
        Self::count_outcome(state, outcome);
        if let Some(station) = preq.ext.source() {
            state
                .proxy
                .learn_remote(station, preq.originator, preq.originator_seq, now, preq.lifetime);
            state
                .routes
                .update_or_insert(station, reverse.via_proxy(preq.originator), now);
        }

        let fresh = state.seen().insert(preq.originator, preq.preq_id, now);
        if !fresh {
            bump(&state.diag.dup_preq);
            if !outcome.is_applied() {
                tracing::trace!(
                    originator = %preq.originator,
                    preq_id = preq.preq_id,
                    "duplicate PREQ"
                );
                return;
            }
        }

        // Replies follow the best reverse path, which may not be `from`.
        let reply_to = state.routes.next_hop(&preq.originator, now).unwrap_or(from);
        let mut relay_targets = Vec::with_capacity(preq.targets.len());

        for target in &preq.targets {
            if target.target.is_broadcast() {
                if preq.wants_proactive_prep() && fresh {
                    out.push(self.reply_as_target(state, preq, target, reply_to));
                }
                relay_targets.push(*target);
                continue;
            }

            if target.target == state.address() || state.proxy.is_proxied(&target.target) {
                out.push(self.reply_as_target(state, preq, target, reply_to));
                continue;
            }

            if self.config.intermediate_reply
                && !target.target_only()
                && let Some(reply) = self.reply_on_behalf(state, preq, target, now)
            {
                out.push(EngineAction::Transmit {
                    to: reply_to,
                    frame: hwmp(Element::Prep(reply)),
                });
                if target.reply_and_forward() {
                    relay_targets.push(PreqTarget {
                        flags: target.flags | PREQ_TFLAG_TO,
                        ..*target
                    });
                }
                continue;
            }

            relay_targets.push(*target);
        }

        if !fresh || relay_targets.is_empty() {
            return;
        }
        if preq.ttl <= 1 {
            bump(&state.diag.ttl_drop);
            tracing::trace!(originator = %preq.originator, "PREQ TTL exhausted, not relaying");
            return;
        }

        let relayed = Preq {
            hop_count,
            ttl: preq.ttl - 1,
            metric,
            targets: relay_targets,
            ..preq.clone()
        };
        bump(&state.diag.preq_tx);

        // An individually addressed PREQ follows the route to its single target.
        let unicast_to = match relayed.targets.as_slice() {
            [only] if preq.flags & PREQ_FLAG_BROADCAST == 0 => {
                state.routes.next_hop(&only.target, now)
            }
            _ => None,
        };
        let frame = hwmp(Element::Preq(relayed));
        out.push(match unicast_to {
            Some(to) => EngineAction::Transmit { to, frame },
            None => EngineAction::Broadcast { frame },
        });
    }

    /// PREP from this node, for itself or for a station it proxies.
    fn reply_as_target(
        &self,
        state: &MeshState,
        preq: &Preq,
        target: &PreqTarget,
        reply_to: MacAddr,
    ) -> EngineAction {
        let seq = if target.unknown_seq() || target.seq >= state.own_seq() {
            state.raise_own_seq(target.seq);
            state.next_own_seq()
        } else {
            state.own_seq()
        };
        let ext = if target.target == state.address() || target.target.is_broadcast() {
            AddressExtension::None
        } else {
            AddressExtension::Destination(target.target)
        };
        bump(&state.diag.prep_tx);
        tracing::debug!(
            originator = %preq.originator,
            target = %target.target,
            seq,
            "answering PREQ"
        );
        EngineAction::Transmit {
            to: reply_to,
            frame: hwmp(Element::Prep(Prep {
                flags: 0,
                hop_count: 0,
                ttl: self.config.ttl,
                target: state.address(),
                target_seq: seq,
                ext,
                lifetime: preq.lifetime,
                metric: 0,
                originator: preq.originator,
                originator_seq: preq.originator_seq,
            })),
        }
    }

    /// PREP built from our own route to `target`, if it is usable and newer
    /// than what the originator already knows.
    fn reply_on_behalf(
        &self,
        state: &MeshState,
        preq: &Preq,
        target: &PreqTarget,
        now: u64,
    ) -> Option<Prep> {
        let entry = state
            .routes
            .lookup(&target.target)
            .filter(|e| e.is_usable(now) && (target.unknown_seq() || e.seq > target.seq))?;
        let (prep_target, ext) = match entry.proxy {
            Some(proxy) => (proxy, AddressExtension::Destination(target.target)),
            None => (target.target, AddressExtension::None),
        };
        bump(&state.diag.prep_tx);
        tracing::debug!(
            originator = %preq.originator,
            target = %target.target,
            seq = entry.seq,
            "answering PREQ on behalf of target"
        );
        Some(Prep {
            flags: 0,
            hop_count: entry.hop_count,
            ttl: self.config.ttl,
            target: prep_target,
            target_seq: entry.seq,
            ext,
            lifetime: preq.lifetime,
            metric: entry.metric,
            originator: preq.originator,
            originator_seq: preq.originator_seq,
        })
    }

    pub(super) fn on_prep(
        &self,
        state: &MeshState,
        from: MacAddr,
        prep: &Prep,
        now: u64,
        out: &mut Vec<EngineAction>,
    ) {
        bump(&state.diag.prep_rx);
        if prep.ttl == 0 {
            bump(&state.diag.ttl_drop);
            tracing::trace!(from = %from, "dropping PREP with zero TTL");
            return;
        }
        if prep.target == state.address() {
            return;
        }

        let metric = prep.metric.saturating_add(self.hop_cost(state, &from));
        let hop_count = prep.hop_count.saturating_add(1);
        let forward = RouteCandidate::new(from, metric, hop_count, prep.target_seq, prep.lifetime);
        let station = prep.ext.destination();

        if prep.originator == state.address() {
            // Route update and discovery completion happen under the
            // discovery lock so a concurrent retry tick sees either both or neither.
            let mut discoveries = state.discoveries();
            let outcome = state.routes.update_or_insert(prep.target, forward, now);
            Self::count_outcome(state, outcome);
            let mut applied = outcome.is_applied();
            if let Some(station) = station {
                state
                    .proxy
                    .learn_remote(station, prep.target, prep.target_seq, now, prep.lifetime);
                applied |= state
                    .routes
                    .update_or_insert(station, forward.via_proxy(prep.target), now)
                    .is_applied();
            }
            if !applied {
                return;
            }
            for dest in [Some(prep.target), station].into_iter().flatten() {
                if discoveries.complete(&dest, prep.originator_seq).is_some() {
                    state.routes.clear_discovering(&dest);
                    bump(&state.diag.discoveries_completed);
                    tracing::debug!(dest = %dest, next_hop = %from, metric, "path discovery complete");
                    out.push(EngineAction::DiscoveryComplete {
                        dest,
                        next_hop: from,
                    });
                }
            }
            return;
        }

        let outcome = state.routes.update_or_insert(prep.target, forward, now);
        Self::count_outcome(state, outcome);
        if let Some(station) = station {
            state
                .proxy
                .learn_remote(station, prep.target, prep.target_seq, now, prep.lifetime);
            state
                .routes
                .update_or_insert(station, forward.via_proxy(prep.target), now);
        }
        if !outcome.is_applied() {
            tracing::trace!(target = %prep.target, ?outcome, "not relaying PREP");
            return;
        }
        if prep.ttl <= 1 {
            bump(&state.diag.ttl_drop);
            return;
        }
        let Some(next_hop) = state.routes.next_hop(&prep.originator, now) else {
            bump(&state.diag.prep_no_reverse);
            tracing::trace!(originator = %prep.originator, "no reverse route for PREP");
            return;
        };
        bump(&state.diag.prep_tx);
        out.push(EngineAction::Transmit {
            to: next_hop,
            frame: hwmp(Element::Prep(Prep {
                hop_count,
                ttl: prep.ttl - 1,
                metric,
                ..*prep
            })),
        });
    }

    pub(super) fn on_perr(
        &self,
        state: &MeshState,
        from: MacAddr,
        perr: &Perr,
        out: &mut Vec<EngineAction>,
    ) {
        bump(&state.diag.perr_rx);
        if perr.ttl == 0 {
            bump(&state.diag.ttl_drop);
            return;
        }

        let mut lost = Vec::new();
        for dest in &perr.dests {
            let Some(entry) = state.routes.lookup(&dest.dest) else {
                continue;
            };
            // Only the neighbor we forward through can break our route.
            if entry.next_hop != from || !entry.is_valid() {
                continue;
            }
            if !dest.unknown_seq() && dest.seq < entry.seq {
                Self::count_outcome(state, UpdateOutcome::Stale);
                continue;
            }
            let seq = (!dest.unknown_seq()).then_some(dest.seq);
            let Some(seq) = state.routes.invalidate(&dest.dest, seq) else {
                continue;
            };
            let proxied = state.routes.invalidate_proxied_by(&dest.dest);
            if let Some(station) = dest.proxied {
                state.proxy.forget_remote(&station, &dest.dest);
                state.routes.invalidate(&station, None);
            }
            tracing::debug!(
                dest = %dest.dest,
                seq,
                proxied = proxied.len(),
                reason = dest.reason,
                "route invalidated by PERR"
            );
            lost.push(PerrDest { seq, ..*dest });
        }

        if lost.is_empty() {
            return;
        }
        if perr.ttl <= 1 {
            bump(&state.diag.ttl_drop);
            return;
        }
        bump(&state.diag.perr_tx);
        out.push(EngineAction::Broadcast {
            frame: hwmp(Element::Perr(Perr {
                ttl: perr.ttl - 1,
                dests: lost,
            })),
        });
    }

    pub(super) fn on_rann(
        &self,
        state: &MeshState,
        from: MacAddr,
        rann: &Rann,
        now: u64,
        out: &mut Vec<EngineAction>,
    ) {
        bump(&state.diag.rann_rx);
        if rann.ttl == 0 {
            bump(&state.diag.ttl_drop);
            return;
        }
        if rann.root == state.address() {
            return;
        }

        let metric = rann.metric.saturating_add(self.hop_cost(state, &from));
        let hop_count = rann.hop_count.saturating_add(1);
        let candidate = RouteCandidate::new(
            from,
            metric,
            hop_count,
            rann.seq,
            self.config.route_lifetime_ms,
        );
        let outcome = state.routes.update_or_insert(rann.root, candidate, now);
        Self::count_outcome(state, outcome);
        if !outcome.is_applied() {
            return;
        }
        if rann.is_portal() {
            state
                .proxy
                .record_portal(rann.root, rann.seq, hop_count, from, now);
        }

        if self.config.rann_reply {
            let preq_id = state.next_preq_id();
            state.seen().insert(state.address(), preq_id, now);
            bump(&state.diag.preq_tx);
            tracing::debug!(root = %rann.root, seq = rann.seq, "answering RANN with PREQ");
            out.push(EngineAction::Transmit {
                to: from,
                frame: hwmp(Element::Preq(Preq {
                    flags: 0,
                    hop_count: 0,
                    ttl: self.config.ttl,
                    preq_id,
                    originator: state.address(),
                    originator_seq: state.next_own_seq(),
                    ext: AddressExtension::None,
                    lifetime: self.config.route_lifetime_ms,
                    metric: 0,
                    targets: vec![PreqTarget {
                        flags: PREQ_TFLAG_TO | PREQ_TFLAG_USN,
                        target: rann.root,
                        seq: 0,
                    }],
                })),
            });
        }

        if rann.ttl > 1 {
            bump(&state.diag.rann_tx);
            out.push(EngineAction::Broadcast {
                frame: hwmp(Element::Rann(Rann {
                    hop_count,
                    ttl: rann.ttl - 1,
                    metric,
                    ..*rann
                })),
            });
        } else {
            bump(&state.diag.ttl_drop);
        }
    }

    pub(super) fn on_pann(
        &self,
        state: &MeshState,
        from: MacAddr,
        pann: &Pann,
        now: u64,
        out: &mut Vec<EngineAction>,
    ) {
        bump(&state.diag.pann_rx);
        if pann.ttl == 0 {
            bump(&state.diag.ttl_drop);
            return;
        }
        if pann.portal == state.address() {
            return;
        }
        let hop_count = pann.hop_count.saturating_add(1);
        if !state
            .proxy
            .record_portal(pann.portal, pann.seq, hop_count, from, now)
        {
            return;
        }
        tracing::debug!(portal = %pann.portal, seq = pann.seq, hop_count, "portal announced");
        if pann.ttl <= 1 {
            bump(&state.diag.ttl_drop);
            return;
        }
        bump(&state.diag.pann_tx);
        out.push(EngineAction::Broadcast {
            frame: ActionFrame::new(
                Action::Mesh(MeshActionCode::GateAnnouncement),
                vec![Element::Pann(Pann {
                    hop_count,
                    ttl: pann.ttl - 1,
                    ..*pann
                })],
            ),
        });
    }

    pub(super) fn on_proxy_update(
        &self,
        state: &MeshState,
        from: MacAddr,
        pxu: &ProxyUpdate,
        now: u64,
        out: &mut Vec<EngineAction>,
    ) {
        bump(&state.diag.pxu_rx);
        if pxu.proxy == state.address() {
            return;
        }
        for record in &pxu.records {
            if record.is_delete() {
                state.proxy.forget_remote(&record.station, &pxu.proxy);
            } else {
                state
                    .proxy
                    .learn_remote(record.station, pxu.proxy, record.seq, now, record.lifetime);
            }
        }
        tracing::debug!(
            proxy = %pxu.proxy,
            pu_seq = pxu.pu_seq,
            records = pxu.records.len(),
            "proxy update"
        );
        out.push(EngineAction::Transmit {
            to: from,
            frame: ActionFrame::new(
                Action::Mesh(MeshActionCode::ProxyUpdateConfirm),
                vec![Element::ProxyUpdateConfirm(ProxyUpdateConfirm {
                    flags: 0,
                    pu_seq: pxu.pu_seq,
                    proxy: pxu.proxy,
                })],
            ),
        });
    }
}
