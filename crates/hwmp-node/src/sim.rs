//! In-process mesh simulator.
//!
//! Runs several [`MeshNode`]s on one runtime and joins them with a simulated
//! radio: each node's outbound frames are delivered as inbound
//! [`NodeEvent::Frame`](crate::NodeEvent::Frame)s to the neighbors the
//! topology links it with. Discovery outcomes from every node are collected
//! on one channel.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use hwmp_core::MacAddr;
use hwmp_routing::{LinkStats, Resolution};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::node::{MeshNode, NodeHandle, Outbound};

/// Link quality used for every simulated link.
pub const SIM_LINK: LinkStats = LinkStats {
    rate_100kbps: 540,
    fer_permille: 0,
};

/// Address of simulated node `index`: `02:00:00:00:xx:yy` with `xxyy = index + 1`.
pub fn sim_address(index: usize) -> MacAddr {
    let n = u16::try_from(index + 1).unwrap_or(u16::MAX).to_be_bytes();
    MacAddr::new([0x02, 0, 0, 0, n[0], n[1]])
}

/// A discovery outcome reported by one simulated node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub node: MacAddr,
    pub outcome: Outbound,
}

/// One hop of a traced route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop {
    pub node: MacAddr,
    /// Metric toward the destination as seen from `node`.
    pub metric: u32,
    pub hop_count: u8,
}

/// A set of running nodes joined by simulated links.
pub struct Sim {
    handles: Vec<NodeHandle>,
    links: HashSet<(usize, usize)>,
    notices: mpsc::Receiver<Notice>,
    tasks: Vec<JoinHandle<()>>,
}

impl Sim {
    /// Start `count` nodes in a line, each linked to its predecessor.
    pub async fn chain(base: &NodeConfig, count: usize) -> Result<Self, NodeError> {
        let links: Vec<(usize, usize)> = (1..count).map(|i| (i - 1, i)).collect();
        Self::with_links(base, count, &links).await
    }

    /// Start `count` nodes sharing `base`, each with its own [`sim_address`].
    pub async fn with_links(
        base: &NodeConfig,
        count: usize,
        links: &[(usize, usize)],
    ) -> Result<Self, NodeError> {
        let configs = (0..count)
            .map(|i| {
                let mut config = base.clone();
                config.mesh.address = sim_address(i).to_string();
                config
            })
            .collect();
        Self::from_configs(configs, links).await
    }

    /// Start one node per configuration and bring up peering on each
    /// undirected link. Links index into `configs`.
    pub async fn from_configs(
        configs: Vec<NodeConfig>,
        links: &[(usize, usize)],
    ) -> Result<Self, NodeError> {
        let count = configs.len();
        let mut handles = Vec::with_capacity(count);
        let mut outbound = Vec::with_capacity(count);
        let mut tasks = Vec::with_capacity(count * 2);

        let mut link_set = HashSet::new();
        for &(a, b) in links {
            if a >= count || b >= count || a == b {
                return Err(NodeError::Config(format!("invalid link {a} <-> {b}")));
            }
            link_set.insert((a.min(b), a.max(b)));
        }

        let nodes = configs
            .into_iter()
            .map(MeshNode::new)
            .collect::<Result<Vec<_>, _>>()?;
        for (node, out_rx) in nodes {
            handles.push(node.handle());
            outbound.push(out_rx);
            tasks.push(node.spawn());
        }

        let (notice_tx, notices) = mpsc::channel(1024);
        for (i, out_rx) in outbound.into_iter().enumerate() {
            let neighbors: Vec<NodeHandle> = link_set
                .iter()
                .filter_map(|&(a, b)| {
                    if a == i {
                        Some(handles[b].clone())
                    } else if b == i {
                        Some(handles[a].clone())
                    } else {
                        None
                    }
                })
                .collect();
            tasks.push(tokio::spawn(radio(
                handles[i].address(),
                out_rx,
                neighbors,
                notice_tx.clone(),
            )));
        }

        for &(a, b) in &link_set {
            handles[a].peer_up(handles[b].address(), SIM_LINK).await?;
            handles[b].peer_up(handles[a].address(), SIM_LINK).await?;
        }

        tracing::info!(nodes = count, links = link_set.len(), "simulation started");

        Ok(Self {
            handles,
            links: link_set,
            notices,
            tasks,
        })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn node(&self, index: usize) -> &NodeHandle {
        &self.handles[index]
    }

    pub fn linked(&self, a: usize, b: usize) -> bool {
        self.links.contains(&(a.min(b), a.max(b)))
    }

    /// Take a link down on both ends.
    pub async fn cut(&mut self, a: usize, b: usize) -> Result<(), NodeError> {
        if !self.links.remove(&(a.min(b), a.max(b))) {
            return Ok(());
        }
        self.handles[a].peer_down(self.handles[b].address()).await?;
        self.handles[b].peer_down(self.handles[a].address()).await
    }

    /// Next discovery outcome from any node, or `None` after `timeout`.
    pub async fn next_notice(&mut self, timeout: Duration) -> Option<Notice> {
        tokio::time::timeout(timeout, self.notices.recv())
            .await
            .ok()
            .flatten()
    }

    /// Resolve the next hop from node `from` toward node `to`, waiting up to
    /// `timeout` for a discovery to finish. `None` means unreachable.
    pub async fn discover(
        &mut self,
        from: usize,
        to: usize,
        timeout: Duration,
    ) -> Result<Option<MacAddr>, NodeError> {
        let dest = self.handles[to].address();
        self.discover_addr(from, dest, timeout).await
    }

    /// Like [`Sim::discover`] for any destination address, including
    /// stations proxied by a mesh node.
    pub async fn discover_addr(
        &mut self,
        from: usize,
        dest: MacAddr,
        timeout: Duration,
    ) -> Result<Option<MacAddr>, NodeError> {
        let origin = self.handles[from].address();
        match self.handles[from].discover(dest).await? {
            Resolution::Local => return Ok(Some(origin)),
            Resolution::NextHop(hop) => return Ok(Some(hop)),
            Resolution::Unreachable => return Ok(None),
            Resolution::Pending => {}
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let Some(notice) = self.next_notice(remaining).await else {
                return Ok(None);
            };
            if notice.node != origin {
                continue;
            }
            match notice.outcome {
                Outbound::PathResolved { dest: d, next_hop } if d == dest => {
                    return Ok(Some(next_hop));
                }
                Outbound::Unreachable { dest: d } if d == dest => return Ok(None),
                _ => {}
            }
        }
    }

    /// Follow installed routes hop by hop from node `from` toward node `to`.
    ///
    /// Stops early when a node has no valid route or a loop would form.
    pub fn trace(&self, from: usize, to: usize) -> Vec<Hop> {
        let dest = self.handles[to].address();
        let mut hops = Vec::new();
        let mut visited = HashSet::new();
        let mut current = from;
        while current != to && visited.insert(current) {
            let Some(entry) = self.handles[current]
                .state()
                .routes
                .lookup(&dest)
                .filter(|e| e.is_valid())
            else {
                break;
            };
            hops.push(Hop {
                node: self.handles[current].address(),
                metric: entry.metric,
                hop_count: entry.hop_count,
            });
            match self.handles.iter().position(|h| h.address() == entry.next_hop) {
                Some(next) => current = next,
                None => break,
            }
        }
        hops
    }

    /// Shut every node down and wait for the tasks to finish.
    pub async fn shutdown(self) {
        for handle in &self.handles {
            handle.shutdown();
        }
        drop(self.handles);
        for task in self.tasks {
            let _ = task.await;
        }
        tracing::info!("simulation stopped");
    }
}

impl std::fmt::Debug for Sim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sim")
            .field("nodes", &self.handles.len())
            .field("links", &self.links.len())
            .finish_non_exhaustive()
    }
}

/// Carry one node's outbound traffic to its neighbors.
async fn radio(
    me: MacAddr,
    mut out_rx: mpsc::Receiver<Outbound>,
    neighbors: Vec<NodeHandle>,
    notices: mpsc::Sender<Notice>,
) {
    while let Some(out) = out_rx.recv().await {
        match out {
            Outbound::Transmit { to, bytes } => {
                if let Some(peer) = neighbors.iter().find(|h| h.address() == to) {
                    let _ = peer.frame(me, bytes).await;
                } else {
                    tracing::trace!(from = %me, to = %to, "no link to unicast target");
                }
            }
            Outbound::Broadcast { bytes } => {
                for peer in &neighbors {
                    let _ = peer.frame(me, bytes.clone()).await;
                }
            }
            outcome => {
                if notices.try_send(Notice { node: me, outcome }).is_err() {
                    tracing::warn!(node = %me, "notice queue full or closed, dropping");
                }
            }
        }
    }
}
