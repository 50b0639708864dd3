//! Mesh node struct and async event loop.
//!
//! A [`MeshNode`] owns the state of one mesh interface and the path-selection
//! protocol that drives it. The receive path, peering changes, and forwarding
//! queries arrive as [`NodeEvent`]s on one channel, so the engine sees them
//! one at a time; interval timers drive discovery retries, root and portal
//! announcements, and expiry sweeps from the same loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use hwmp_core::MacAddr;
use hwmp_core::element::{PathMetricProtocol, PathSelectionProtocol};
use hwmp_routing::{
    AirtimeMetric, DiagnosticsSnapshot, EngineAction, EngineError, HwmpEngine, LinkMetric,
    LinkStats, MeshState, NullMetric, NullPathProtocol, PathProtocol, PathState, Resolution,
};

use crate::config::{MeshSection, NodeConfig, TimersSection};
use crate::error::NodeError;

/// Inputs to the node event loop.
#[derive(Debug)]
pub enum NodeEvent {
    /// A mesh action frame body received from neighbor `from`.
    Frame { from: MacAddr, bytes: Vec<u8> },
    /// Peering with `peer` is established.
    PeerUp { peer: MacAddr, stats: LinkStats },
    /// New link measurements for an established peer.
    LinkUpdate { peer: MacAddr, stats: LinkStats },
    /// Peering with `peer` is gone.
    PeerDown { peer: MacAddr },
    /// Forwarding path query. Starts a discovery when no route is known.
    Discover {
        dest: MacAddr,
        reply: oneshot::Sender<Resolution>,
    },
    /// Current path state of `dest` on the node clock.
    PathQuery {
        dest: MacAddr,
        reply: oneshot::Sender<PathState>,
    },
    /// The MAC layer could not deliver a data frame toward `dest`.
    ForwardFailed { dest: MacAddr },
    RegisterProxy { station: MacAddr },
    UnregisterProxy { station: MacAddr },
}

/// Outputs of the node for the MAC layer and the forwarding path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Encoded action frame body for one neighbor.
    Transmit { to: MacAddr, bytes: Vec<u8> },
    /// Encoded action frame body for every neighbor.
    Broadcast { bytes: Vec<u8> },
    /// Frames queued for `dest` can go to `next_hop`.
    PathResolved { dest: MacAddr, next_hop: MacAddr },
    /// Frames queued for `dest` should be dropped.
    Unreachable { dest: MacAddr },
}

impl From<EngineAction> for Outbound {
    fn from(action: EngineAction) -> Self {
        match action {
            EngineAction::Transmit { to, frame } => Outbound::Transmit {
                to,
                bytes: frame.encode(),
            },
            EngineAction::Broadcast { frame } => Outbound::Broadcast {
                bytes: frame.encode(),
            },
            EngineAction::DiscoveryComplete { dest, next_hop } => {
                Outbound::PathResolved { dest, next_hop }
            }
            EngineAction::Unreachable { dest } => Outbound::Unreachable { dest },
        }
    }
}

/// Build the path-selection protocol named by the configuration.
pub fn build_protocol(mesh: &MeshSection) -> Result<Box<dyn PathProtocol>, NodeError> {
    let engine_config = mesh.engine_config()?;
    let metric: Box<dyn LinkMetric> = match mesh.path_metric()? {
        PathMetricProtocol::Airtime => Box::new(AirtimeMetric),
        PathMetricProtocol::Null => Box::new(NullMetric),
    };
    Ok(match mesh.path_protocol()? {
        PathSelectionProtocol::Hwmp => Box::new(HwmpEngine::new(engine_config, metric)),
        PathSelectionProtocol::Null => Box::new(NullPathProtocol),
    })
}

/// Cloneable handle for feeding a running node and querying its state.
#[derive(Clone)]
pub struct NodeHandle {
    address: MacAddr,
    events: mpsc::Sender<NodeEvent>,
    shutdown: Arc<watch::Sender<bool>>,
    state: Arc<MeshState>,
}

impl NodeHandle {
    pub fn address(&self) -> MacAddr {
        self.address
    }

    /// Shared mesh state, for read-only inspection.
    pub fn state(&self) -> &Arc<MeshState> {
        &self.state
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.state.diag.snapshot()
    }

    pub async fn send(&self, event: NodeEvent) -> Result<(), NodeError> {
        self.events
            .send(event)
            .await
            .map_err(|_| NodeError::ChannelClosed)
    }

    pub async fn frame(&self, from: MacAddr, bytes: Vec<u8>) -> Result<(), NodeError> {
        self.send(NodeEvent::Frame { from, bytes }).await
    }

    pub async fn peer_up(&self, peer: MacAddr, stats: LinkStats) -> Result<(), NodeError> {
        self.send(NodeEvent::PeerUp { peer, stats }).await
    }

    pub async fn link_update(&self, peer: MacAddr, stats: LinkStats) -> Result<(), NodeError> {
        self.send(NodeEvent::LinkUpdate { peer, stats }).await
    }

    pub async fn peer_down(&self, peer: MacAddr) -> Result<(), NodeError> {
        self.send(NodeEvent::PeerDown { peer }).await
    }

    /// Ask where frames for `dest` should go.
    ///
    /// A [`Resolution::Pending`] answer is followed later by an
    /// [`Outbound::PathResolved`] or [`Outbound::Unreachable`].
    pub async fn discover(&self, dest: MacAddr) -> Result<Resolution, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.send(NodeEvent::Discover { dest, reply }).await?;
        rx.await.map_err(|_| NodeError::ChannelClosed)
    }

    pub async fn path_state(&self, dest: MacAddr) -> Result<PathState, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.send(NodeEvent::PathQuery { dest, reply }).await?;
        rx.await.map_err(|_| NodeError::ChannelClosed)
    }

    pub async fn forward_failed(&self, dest: MacAddr) -> Result<(), NodeError> {
        self.send(NodeEvent::ForwardFailed { dest }).await
    }

    pub async fn register_proxy(&self, station: MacAddr) -> Result<(), NodeError> {
        self.send(NodeEvent::RegisterProxy { station }).await
    }

    pub async fn unregister_proxy(&self, station: MacAddr) -> Result<(), NodeError> {
        self.send(NodeEvent::UnregisterProxy { station }).await
    }

    /// Signal the node to leave its event loop.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// One mesh interface: state, protocol, and the channels around them.
pub struct MeshNode {
    timers: TimersSection,
    state: Arc<MeshState>,
    protocol: Box<dyn PathProtocol>,
    event_tx: mpsc::Sender<NodeEvent>,
    event_rx: mpsc::Receiver<NodeEvent>,
    out_tx: mpsc::Sender<Outbound>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    epoch: Instant,
}

impl MeshNode {
    /// Create a node from configuration.
    ///
    /// Returns the node and the receiving end of its outbound channel, which
    /// the MAC layer drains.
    pub fn new(config: NodeConfig) -> Result<(Self, mpsc::Receiver<Outbound>), NodeError> {
        let address = config.mesh.address()?;
        let engine_config = config.mesh.engine_config()?;
        let protocol = build_protocol(&config.mesh)?;
        let state = Arc::new(MeshState::new(address, &engine_config));

        if config.timers.tick_ms == 0 || config.timers.sweep_ms == 0 {
            return Err(NodeError::Config(
                "timer intervals must be non-zero".to_string(),
            ));
        }
        let capacity = config.timers.channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let (out_tx, out_rx) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let node = Self {
            timers: config.timers,
            state,
            protocol,
            event_tx,
            event_rx,
            out_tx,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            epoch: Instant::now(),
        };
        Ok((node, out_rx))
    }

    pub fn address(&self) -> MacAddr {
        self.state.address()
    }

    pub fn state(&self) -> &Arc<MeshState> {
        &self.state
    }

    pub fn handle(&self) -> NodeHandle {
        NodeHandle {
            address: self.state.address(),
            events: self.event_tx.clone(),
            shutdown: Arc::clone(&self.shutdown_tx),
            state: Arc::clone(&self.state),
        }
    }

    /// Milliseconds since the node was created, on the tokio clock.
    fn now(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Run the event loop, then shut down, on a new task.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
            self.shutdown();
        })
    }

    /// Run the main event loop. Returns when shutdown is signalled.
    pub async fn run(&mut self) {
        let mut tick_interval = tokio::time::interval(Duration::from_millis(self.timers.tick_ms));
        let mut sweep_interval = tokio::time::interval(Duration::from_millis(self.timers.sweep_ms));

        // Don't fire immediately
        tick_interval.tick().await;
        sweep_interval.tick().await;

        tracing::info!(
            address = %self.state.address(),
            protocol = ?self.protocol.id(),
            "entering event loop"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    tracing::info!(address = %self.state.address(), "shutdown signal received");
                    break;
                }

                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            tracing::info!("event channel closed, exiting");
                            break;
                        }
                    }
                }

                _ = tick_interval.tick() => {
                    let actions = self.protocol.tick(&self.state, self.now());
                    self.emit(actions);
                }

                _ = sweep_interval.tick() => {
                    let removed = self.state.sweep_expired(self.now());
                    if removed > 0 {
                        tracing::debug!(removed, "swept expired routes");
                    }
                }
            }
        }
    }

    /// Signal the node to leave its event loop.
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Tear the interface down in order: stop accepting events, fail pending
    /// discoveries, clear the routing table.
    pub fn shutdown(mut self) {
        tracing::info!(address = %self.state.address(), "shutting down node");
        self.trigger_shutdown();

        self.event_rx.close();
        let mut dropped = 0usize;
        while self.event_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(dropped, "discarded queued events");
        }

        let actions = self.protocol.shutdown(&self.state, self.now());
        self.emit(actions);

        tracing::info!(address = %self.state.address(), "node shutdown complete");
    }

    fn handle_event(&self, event: NodeEvent) {
        let now = self.now();
        let actions = match event {
            NodeEvent::Frame { from, bytes } => {
                match self.protocol.handle_bytes(&self.state, from, &bytes, now) {
                    Ok(actions) => actions,
                    Err(EngineError::Unhandled(action)) => {
                        tracing::trace!(from = %from, ?action, "frame for another subsystem");
                        Vec::new()
                    }
                    Err(e) => {
                        tracing::trace!(from = %from, error = %e, "dropped inbound frame");
                        Vec::new()
                    }
                }
            }
            NodeEvent::PeerUp { peer, stats } => {
                self.state.peer_up(peer, stats);
                tracing::debug!(peer = %peer, rate = stats.rate_100kbps, "peer up");
                Vec::new()
            }
            NodeEvent::LinkUpdate { peer, stats } => {
                if !self.state.update_link(&peer, stats) {
                    tracing::trace!(peer = %peer, "link update for unknown peer");
                }
                Vec::new()
            }
            NodeEvent::PeerDown { peer } => {
                tracing::debug!(peer = %peer, "peer down");
                self.protocol.peer_down(&self.state, peer, now)
            }
            NodeEvent::Discover { dest, reply } => {
                let (resolution, actions) = self.protocol.discover(&self.state, dest, now);
                let _ = reply.send(resolution);
                actions
            }
            NodeEvent::PathQuery { dest, reply } => {
                let _ = reply.send(self.state.path_state(&dest, now));
                Vec::new()
            }
            NodeEvent::ForwardFailed { dest } => {
                self.protocol.forward_failed(&self.state, dest, now)
            }
            NodeEvent::RegisterProxy { station } => {
                self.protocol.register_proxy(&self.state, station)
            }
            NodeEvent::UnregisterProxy { station } => {
                self.protocol.unregister_proxy(&self.state, station)
            }
        };
        self.emit(actions);
    }

    /// Hand engine output to the MAC layer. A full queue drops the frame,
    /// as a busy radio would.
    fn emit(&self, actions: Vec<EngineAction>) {
        for action in actions {
            match self.out_tx.try_send(Outbound::from(action)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(out)) => {
                    tracing::warn!(?out, "outbound queue full, dropping");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!("outbound channel closed");
                    return;
                }
            }
        }
    }
}

impl std::fmt::Debug for MeshNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshNode")
            .field("address", &self.state.address())
            .field("timers", &self.timers)
            .finish_non_exhaustive()
    }
}
