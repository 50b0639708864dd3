//! Runtime for one 802.11s mesh interface.
//!
//! This crate wraps the path-selection engine from `hwmp-routing` in a tokio
//! event loop: frames and peering changes arrive as [`NodeEvent`]s, encoded
//! frames and discovery outcomes leave as [`Outbound`] messages for the MAC
//! layer, and interval timers drive retries, announcements, and expiry.

pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod sim;

pub use config::NodeConfig;
pub use error::NodeError;
pub use node::{MeshNode, NodeEvent, NodeHandle, Outbound};
