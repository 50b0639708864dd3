//! Shared harness: in-process meshes of engines joined by perfect links.

#![allow(dead_code)]

use std::collections::VecDeque;

use hwmp_core::MacAddr;
use hwmp_routing::{
    AirtimeMetric, EngineAction, EngineConfig, HwmpEngine, LinkMetric, LinkStats, MeshState,
    NullMetric, PathProtocol,
};

/// 54 Mbit/s, no loss: 32 airtime units per hop.
pub const LINK: LinkStats = LinkStats {
    rate_100kbps: 540,
    fer_permille: 0,
};

pub const AIRTIME_HOP: u32 = 32;

pub fn addr(seed: u8) -> MacAddr {
    MacAddr::new([0x02, 0, 0, 0, 0, seed])
}

pub fn station(seed: u8) -> MacAddr {
    MacAddr::new([0x0a, 0, 0, 0, 0, seed])
}

pub struct Node {
    pub state: MeshState,
    pub engine: HwmpEngine,
}

impl Node {
    pub fn new(seed: u8, config: EngineConfig, metric: Box<dyn LinkMetric>) -> Self {
        Self {
            state: MeshState::new(addr(seed), &config),
            engine: HwmpEngine::new(config, metric),
        }
    }

    pub fn null(seed: u8) -> Self {
        Self::new(seed, EngineConfig::default(), Box::new(NullMetric))
    }

    pub fn address(&self) -> MacAddr {
        self.state.address()
    }
}

/// A mesh of nodes. Frames are passed as encoded bytes so every hop goes
/// through the codec.
pub struct Net {
    pub nodes: Vec<Node>,
}

/// A non-frame action surfaced by a node while the net ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub at: MacAddr,
    pub action: EngineAction,
}

impl Net {
    /// Nodes with seeds `1..=n` joined in a line, airtime metric.
    pub fn chain(n: u8, config: EngineConfig) -> Self {
        let nodes: Vec<Node> = (1..=n)
            .map(|seed| Node::new(seed, config.clone(), Box::new(AirtimeMetric)))
            .collect();
        for pair in nodes.windows(2) {
            pair[0].state.peer_up(pair[1].address(), LINK);
            pair[1].state.peer_up(pair[0].address(), LINK);
        }
        Self { nodes }
    }

    pub fn node(&self, seed: u8) -> &Node {
        self.nodes
            .iter()
            .find(|n| n.address() == addr(seed))
            .expect("node in net")
    }

    fn by_addr(&self, a: &MacAddr) -> Option<&Node> {
        self.nodes.iter().find(|n| n.address() == *a)
    }

    /// Deliver `actions` emitted by `origin` until the mesh is quiet.
    pub fn run(&self, origin: MacAddr, actions: Vec<EngineAction>, now: u64) -> Vec<Event> {
        let mut queue: VecDeque<(MacAddr, EngineAction)> =
            actions.into_iter().map(|a| (origin, a)).collect();
        let mut events = Vec::new();
        let mut steps = 0;

        while let Some((sender, action)) = queue.pop_front() {
            steps += 1;
            assert!(steps < 100_000, "mesh did not settle");
            let Some(src) = self.by_addr(&sender) else {
                continue;
            };
            let receivers: Vec<MacAddr> = match &action {
                EngineAction::Transmit { to, .. } => vec![*to],
                EngineAction::Broadcast { .. } => src.state.neighbors(),
                _ => {
                    events.push(Event { at: sender, action });
                    continue;
                }
            };
            let bytes = action.frame().expect("frame action").encode();
            for rx in receivers {
                let Some(dst) = self.by_addr(&rx) else {
                    continue;
                };
                if !src.state.is_peer(&rx) {
                    continue;
                }
                if let Ok(out) = dst.engine.handle_bytes(&dst.state, sender, &bytes, now) {
                    queue.extend(out.into_iter().map(|a| (rx, a)));
                }
            }
        }
        events
    }

    /// Start a discovery at `from` for `to` and run it to completion.
    pub fn discover(&self, from: u8, to: MacAddr, now: u64) -> Vec<Event> {
        let node = self.node(from);
        let (_, actions) = node.engine.discover(&node.state, to, now);
        self.run(node.address(), actions, now)
    }

    /// Run one timer tick on `seed` and deliver the result.
    pub fn tick(&self, seed: u8, now: u64) -> Vec<Event> {
        let node = self.node(seed);
        let actions = node.engine.tick(&node.state, now);
        self.run(node.address(), actions, now)
    }
}
