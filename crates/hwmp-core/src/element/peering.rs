//! Peering Management, Link Metric Report, and Congestion Notification elements.

use crate::constants::*;
use crate::error::DecodeError;
use crate::types::MacAddr;

use super::cursor::{Reader, put_mac, put_u16, put_u32};

/// Peering Management element.
///
/// Layout: `protocol(2) local_link_id(2) [peer_link_id(2)] [reason(2)] [pmk(16)]`.
/// The optional fields are positional: a reason code is only ever carried
/// after a peer link ID, so a close without a known peer link ID encodes
/// the peer link ID as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeeringManagement {
    pub protocol: u16,
    pub local_link_id: u16,
    pub peer_link_id: Option<u16>,
    pub reason: Option<u16>,
    pub pmk: Option<[u8; PEER_PMK_LEN]>,
}

impl PeeringManagement {
    pub(crate) fn decode_body(body: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(ELEMID_MESHPEER, body);
        let (ids_len, has_pmk) = match body.len() {
            4 | 6 | 8 => (body.len(), false),
            20 | 22 | 24 => (body.len() - PEER_PMK_LEN, true),
            _ => return Err(r.bad_length()),
        };
        let protocol = r.u16_le()?;
        if protocol != PEER_PROTO_MPM && protocol != PEER_PROTO_AMPE {
            return Err(DecodeError::UnknownVersion {
                element: ELEMID_MESHPEER,
                value: u32::from(protocol),
            });
        }
        let local_link_id = r.u16_le()?;
        let peer_link_id = if ids_len >= 6 { Some(r.u16_le()?) } else { None };
        let reason = if ids_len == 8 { Some(r.u16_le()?) } else { None };
        let pmk = if has_pmk { Some(r.array()?) } else { None };
        r.finish()?;
        Ok(Self {
            protocol,
            local_link_id,
            peer_link_id,
            reason,
            pmk,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.protocol);
        put_u16(out, self.local_link_id);
        if self.peer_link_id.is_some() || self.reason.is_some() {
            put_u16(out, self.peer_link_id.unwrap_or(0));
        }
        if let Some(reason) = self.reason {
            put_u16(out, reason);
        }
        if let Some(pmk) = &self.pmk {
            out.extend_from_slice(pmk);
        }
    }
}

/// Link Metric Report element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkMetricReport {
    pub flags: u8,
    pub metric: u32,
}

impl LinkMetricReport {
    #[must_use]
    pub fn is_request(&self) -> bool {
        self.flags & MESHLINK_FLAG_REQUEST != 0
    }

    pub(crate) fn decode_body(body: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(ELEMID_MESHLINK, body);
        if body.len() != MESHLINK_BODY_SIZE {
            return Err(r.bad_length());
        }
        let out = Self {
            flags: r.u8()?,
            metric: r.u32_le()?,
        };
        r.finish()?;
        Ok(out)
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) {
        out.push(self.flags);
        put_u32(out, self.metric);
    }
}

/// Congestion Notification element.
///
/// Durations are per access category in BK, BE, VI, VO order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CongestionNotification {
    pub dest: MacAddr,
    pub durations: [u16; 4],
}

impl CongestionNotification {
    pub(crate) fn decode_body(body: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(ELEMID_MESHCNGST, body);
        if body.len() != MESHCNGST_BODY_SIZE {
            return Err(r.bad_length());
        }
        let dest = r.mac()?;
        let mut durations = [0u16; 4];
        for d in &mut durations {
            *d = r.u16_le()?;
        }
        r.finish()?;
        Ok(Self { dest, durations })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) {
        put_mac(out, &self.dest);
        for d in self.durations {
            put_u16(out, d);
        }
    }
}
