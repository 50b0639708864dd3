//! Mesh Control header carried by mesh data frames.
//!
//! ```text
//! flags(1) ttl(1) seq(4, LE) [addr4] [addr5 addr6] ...
//! ```
//! The low two bits of `flags` select how many extra addresses follow.

use crate::constants::{ADDR_LEN, MESHCTL_AE_MASK, MESHCTL_BASE_SIZE};
use crate::error::DecodeError;
use crate::types::MacAddr;

/// Extra addresses in a Mesh Control header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeshControlAe {
    #[default]
    None,
    One(MacAddr),
    Two(MacAddr, MacAddr),
    Three(MacAddr, MacAddr, MacAddr),
}

impl MeshControlAe {
    #[must_use]
    pub fn mode(&self) -> u8 {
        match self {
            MeshControlAe::None => 0,
            MeshControlAe::One(..) => 1,
            MeshControlAe::Two(..) => 2,
            MeshControlAe::Three(..) => 3,
        }
    }

    fn addrs(&self) -> impl Iterator<Item = &MacAddr> {
        let slice: [Option<&MacAddr>; 3] = match self {
            MeshControlAe::None => [None, None, None],
            MeshControlAe::One(a) => [Some(a), None, None],
            MeshControlAe::Two(a, b) => [Some(a), Some(b), None],
            MeshControlAe::Three(a, b, c) => [Some(a), Some(b), Some(c)],
        };
        slice.into_iter().flatten()
    }
}

/// Mesh Control header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshControl {
    /// Flags with the address-extension bits cleared.
    pub flags: u8,
    pub ttl: u8,
    pub seq: u32,
    pub ae: MeshControlAe,
}

impl MeshControl {
    /// Header size on the wire.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        MESHCTL_BASE_SIZE + usize::from(self.ae.mode()) * ADDR_LEN
    }

    /// Decode a header from the start of `bytes`, returning it with the
    /// number of octets consumed.
    pub fn decode(bytes: &[u8]) -> Result<(MeshControl, usize), DecodeError> {
        if bytes.len() < MESHCTL_BASE_SIZE {
            return Err(DecodeError::TooShort {
                need: MESHCTL_BASE_SIZE,
                have: bytes.len(),
            });
        }
        let mode = bytes[0] & MESHCTL_AE_MASK;
        let need = MESHCTL_BASE_SIZE + usize::from(mode) * ADDR_LEN;
        if bytes.len() < need {
            return Err(DecodeError::TooShort {
                need,
                have: bytes.len(),
            });
        }
        let addr = |i: usize| {
            let off = MESHCTL_BASE_SIZE + i * ADDR_LEN;
            let mut a = [0u8; ADDR_LEN];
            a.copy_from_slice(&bytes[off..off + ADDR_LEN]);
            MacAddr::new(a)
        };
        let ae = match mode {
            0 => MeshControlAe::None,
            1 => MeshControlAe::One(addr(0)),
            2 => MeshControlAe::Two(addr(0), addr(1)),
            _ => MeshControlAe::Three(addr(0), addr(1), addr(2)),
        };
        let hdr = MeshControl {
            flags: bytes[0] & !MESHCTL_AE_MASK,
            ttl: bytes[1],
            seq: u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]),
            ae,
        };
        Ok((hdr, need))
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.push((self.flags & !MESHCTL_AE_MASK) | self.ae.mode());
        out.push(self.ttl);
        out.extend_from_slice(&self.seq.to_le_bytes());
        for a in self.ae.addrs() {
            out.extend_from_slice(a.as_ref());
        }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        self.encode_into(&mut out);
        out
    }
}
