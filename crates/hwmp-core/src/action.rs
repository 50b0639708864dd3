//! Action-frame envelope for mesh management traffic.
//!
//! The frame body is `category(1) action(1)` followed by concatenated
//! information elements. Only the Mesh and Self-Protected categories are
//! understood.

use crate::element::{Element, ElementIter};
use crate::error::DecodeError;

/// Action categories handled by the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActionCategory {
    Mesh = 13,
    SelfProtected = 15,
}

/// Mesh category action codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MeshActionCode {
    LinkMetricReport = 0,
    /// Carries PREQ, PREP, PERR, and RANN elements.
    Hwmp = 1,
    /// Carries PANN elements.
    GateAnnouncement = 2,
    CongestionControl = 3,
    ProxyUpdate = 11,
    ProxyUpdateConfirm = 12,
}

impl MeshActionCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::LinkMetricReport),
            1 => Some(Self::Hwmp),
            2 => Some(Self::GateAnnouncement),
            3 => Some(Self::CongestionControl),
            11 => Some(Self::ProxyUpdate),
            12 => Some(Self::ProxyUpdateConfirm),
            _ => None,
        }
    }
}

/// Self-Protected category action codes used for peering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SelfProtectedCode {
    PeeringOpen = 1,
    PeeringConfirm = 2,
    PeeringClose = 3,
}

impl SelfProtectedCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::PeeringOpen),
            2 => Some(Self::PeeringConfirm),
            3 => Some(Self::PeeringClose),
            _ => None,
        }
    }
}

/// Category plus action code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Mesh(MeshActionCode),
    SelfProtected(SelfProtectedCode),
}

impl Action {
    #[must_use]
    pub fn category(&self) -> ActionCategory {
        match self {
            Action::Mesh(_) => ActionCategory::Mesh,
            Action::SelfProtected(_) => ActionCategory::SelfProtected,
        }
    }

    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Action::Mesh(c) => *c as u8,
            Action::SelfProtected(c) => *c as u8,
        }
    }

    fn from_octets(category: u8, action: u8) -> Result<Self, DecodeError> {
        let decoded = match category {
            13 => MeshActionCode::from_u8(action).map(Action::Mesh),
            15 => SelfProtectedCode::from_u8(action).map(Action::SelfProtected),
            _ => None,
        };
        decoded.ok_or(DecodeError::UnknownAction { category, action })
    }
}

/// A decoded management action frame body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFrame {
    pub action: Action,
    pub elements: Vec<Element>,
}

impl ActionFrame {
    pub fn new(action: Action, elements: Vec<Element>) -> Self {
        Self { action, elements }
    }

    /// HWMP path-selection frame.
    pub fn hwmp(elements: Vec<Element>) -> Self {
        Self::new(Action::Mesh(MeshActionCode::Hwmp), elements)
    }

    /// Decode a frame body.
    ///
    /// Elements with an unrecognized ID are skipped. Any other element
    /// error rejects the whole frame.
    pub fn decode(bytes: &[u8]) -> Result<ActionFrame, DecodeError> {
        if bytes.len() < 2 {
            return Err(DecodeError::TooShort {
                need: 2,
                have: bytes.len(),
            });
        }
        let action = Action::from_octets(bytes[0], bytes[1])?;
        let mut elements = Vec::new();
        for item in ElementIter::new(&bytes[2..]) {
            match item {
                Ok(e) => elements.push(e),
                Err(DecodeError::UnknownElement(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(ActionFrame { action, elements })
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128);
        out.push(self.action.category() as u8);
        out.push(self.action.code());
        for e in &self.elements {
            e.encode_into(&mut out);
        }
        out
    }
}
