//! Mesh Configuration and Mesh ID elements.
//!
//! Mesh Configuration body layout (23 octets):
//! ```text
//! version(1) path_sel(4) path_metric(4) congestion(4) sync(4) auth(4) formation(1) capabilities(1)
//! ```
//! Each 4-octet selector is OUI(3) + ID(1). Only selectors under the IEEE
//! 802.11 OUI with a registered ID decode successfully.

use crate::constants::*;
use crate::error::DecodeError;

use super::cursor::Reader;

macro_rules! selector_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $id:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($variant = $id),+
        }

        impl $name {
            pub fn from_id(id: u8) -> Option<Self> {
                match id {
                    $($id => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// OUI + ID selector octets.
            pub fn selector(self) -> [u8; 4] {
                [OUI_IEEE80211[0], OUI_IEEE80211[1], OUI_IEEE80211[2], self as u8]
            }

            fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
                let sel: [u8; 4] = r.array()?;
                let known = if sel[..3] == OUI_IEEE80211 { Self::from_id(sel[3]) } else { None };
                known.ok_or(DecodeError::UnknownVersion {
                    element: ELEMID_MESHCONF,
                    value: u32::from_be_bytes(sel),
                })
            }
        }
    };
}

selector_enum!(
    /// Active path-selection protocol.
    PathSelectionProtocol { Null = 0, Hwmp = 1 }
);

selector_enum!(
    /// Active path metric.
    PathMetricProtocol { Null = 0, Airtime = 1 }
);

selector_enum!(
    /// Congestion-control mode.
    CongestionControl { None = 0, Signaling = 1 }
);

selector_enum!(
    /// Synchronization method.
    SyncMethod { None = 0, NeighborOffset = 1 }
);

selector_enum!(
    /// Authentication protocol used for peering.
    AuthProtocol { None = 0, Sae = 1, Ieee8021x = 2 }
);

/// Mesh Configuration element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshConfig {
    pub path_selection: PathSelectionProtocol,
    pub path_metric: PathMetricProtocol,
    pub congestion_control: CongestionControl,
    pub sync: SyncMethod,
    pub auth: AuthProtocol,
    pub formation: u8,
    pub capabilities: u8,
}

impl MeshConfig {
    /// Whether the advertising node is connected to a mesh gate.
    #[must_use]
    pub fn connected_to_gate(&self) -> bool {
        self.formation & MESHCONF_FORM_GATE != 0
    }

    /// Number of peerings advertised in the formation info.
    #[must_use]
    pub fn neighbor_count(&self) -> u8 {
        (self.formation & MESHCONF_FORM_NEIGHBOR_MASK) >> 1
    }

    #[must_use]
    pub fn accepts_peering(&self) -> bool {
        self.capabilities & MESHCONF_CAP_AP != 0
    }

    #[must_use]
    pub fn forwarding(&self) -> bool {
        self.capabilities & MESHCONF_CAP_FWRD != 0
    }

    pub(crate) fn decode_body(body: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(ELEMID_MESHCONF, body);
        if body.len() != MESHCONF_BODY_SIZE {
            return Err(r.bad_length());
        }
        let version = r.u8()?;
        if version != MESHCONF_VERSION {
            return Err(DecodeError::UnknownVersion {
                element: ELEMID_MESHCONF,
                value: u32::from(version),
            });
        }
        let conf = MeshConfig {
            path_selection: PathSelectionProtocol::read(&mut r)?,
            path_metric: PathMetricProtocol::read(&mut r)?,
            congestion_control: CongestionControl::read(&mut r)?,
            sync: SyncMethod::read(&mut r)?,
            auth: AuthProtocol::read(&mut r)?,
            formation: r.u8()?,
            capabilities: r.u8()?,
        };
        r.finish()?;
        Ok(conf)
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) {
        out.push(MESHCONF_VERSION);
        out.extend_from_slice(&self.path_selection.selector());
        out.extend_from_slice(&self.path_metric.selector());
        out.extend_from_slice(&self.congestion_control.selector());
        out.extend_from_slice(&self.sync.selector());
        out.extend_from_slice(&self.auth.selector());
        out.push(self.formation);
        out.push(self.capabilities);
    }
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            path_selection: PathSelectionProtocol::Hwmp,
            path_metric: PathMetricProtocol::Airtime,
            congestion_control: CongestionControl::None,
            sync: SyncMethod::NeighborOffset,
            auth: AuthProtocol::None,
            formation: 0,
            capabilities: MESHCONF_CAP_AP | MESHCONF_CAP_FWRD,
        }
    }
}

/// Mesh ID element (0 to 32 opaque octets).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MeshId(pub Vec<u8>);

impl MeshId {
    pub(crate) fn decode_body(body: &[u8]) -> Result<Self, DecodeError> {
        if body.len() > MESHID_MAXLEN {
            return Err(DecodeError::BadLength {
                element: ELEMID_MESHID,
                len: body.len(),
            });
        }
        Ok(MeshId(body.to_vec()))
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }
}
