//! Core types, constants, and wire formats for 802.11s mesh path selection.
//!
//! This crate defines the hardware address newtype, the information-element
//! codec (mesh configuration, peering, HWMP path-selection elements, portal
//! and proxy elements), the mesh control header, and the action-frame
//! envelope that carries elements between mesh peers.

pub mod action;
pub mod constants;
pub mod element;
pub mod error;
pub mod mesh_control;
pub mod types;

pub use action::{Action, ActionCategory, ActionFrame, MeshActionCode, SelfProtectedCode};
pub use element::{AddressExtension, Element, ElementIter};
pub use error::DecodeError;
pub use mesh_control::{MeshControl, MeshControlAe};
pub use types::{InvalidLength, MacAddr};
