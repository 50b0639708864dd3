//! HWMP path-selection elements: PREQ, PREP, PERR, and RANN.
//!
//! The `flags` field of each decoded struct never contains address-extension
//! bits; the extension is carried as an explicit [`AddressExtension`] and
//! merged back into the flags octet on encode.

use crate::constants::*;
use crate::error::DecodeError;
use crate::types::MacAddr;

use super::cursor::{Reader, put_mac, put_u32};
use super::ext::AddressExtension;

/// One target record of a PREQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreqTarget {
    pub flags: u8,
    pub target: MacAddr,
    pub seq: u32,
}

impl PreqTarget {
    /// Target-only: only the target itself may answer.
    #[must_use]
    pub fn target_only(&self) -> bool {
        self.flags & PREQ_TFLAG_TO != 0
    }

    /// Reply-and-forward: an intermediate answering also relays the PREQ.
    #[must_use]
    pub fn reply_and_forward(&self) -> bool {
        self.flags & PREQ_TFLAG_RF != 0
    }

    /// The originator does not know the target's sequence number.
    #[must_use]
    pub fn unknown_seq(&self) -> bool {
        self.flags & PREQ_TFLAG_USN != 0
    }
}

/// Path Request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preq {
    pub flags: u8,
    pub hop_count: u8,
    pub ttl: u8,
    pub preq_id: u32,
    pub originator: MacAddr,
    pub originator_seq: u32,
    pub ext: AddressExtension,
    pub lifetime: u32,
    pub metric: u32,
    pub targets: Vec<PreqTarget>,
}

impl Preq {
    #[must_use]
    pub fn is_proactive(&self) -> bool {
        self.flags & PREQ_FLAG_PROACTIVE != 0
    }

    #[must_use]
    pub fn wants_proactive_prep(&self) -> bool {
        self.flags & PREQ_FLAG_PROACTIVE_PREP != 0
    }

    pub(crate) fn decode_body(body: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(ELEMID_MESHPREQ, body);
        let raw_flags = r.u8()?;
        let mode = AddressExtension::mode_of(raw_flags);
        let fixed = PREQ_BASE_SIZE + AddressExtension::wire_len_of(mode);
        if body.len() < fixed {
            return Err(r.bad_length());
        }
        let tcount = usize::from(body[fixed - 1]);
        if tcount == 0 || tcount > PREQ_MAX_TARGETS || body.len() - fixed != tcount * PREQ_TARGET_SIZE
        {
            return Err(r.bad_length());
        }

        let hop_count = r.u8()?;
        let ttl = r.u8()?;
        let preq_id = r.u32_le()?;
        let originator = r.mac()?;
        let originator_seq = r.u32_le()?;
        let ext = AddressExtension::read(mode, &mut r)?;
        let lifetime = r.u32_le()?;
        let metric = r.u32_le()?;
        r.u8()?;
        let mut targets = Vec::with_capacity(tcount);
        for _ in 0..tcount {
            targets.push(PreqTarget {
                flags: r.u8()?,
                target: r.mac()?,
                seq: r.u32_le()?,
            });
        }
        r.finish()?;

        Ok(Self {
            flags: raw_flags & !AE_MASK,
            hop_count,
            ttl,
            preq_id,
            originator,
            originator_seq,
            ext,
            lifetime,
            metric,
            targets,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) {
        debug_assert!(
            !self.targets.is_empty() && self.targets.len() <= PREQ_MAX_TARGETS,
            "PREQ carries 1..=20 targets"
        );
        out.push(self.ext.apply_to(self.flags));
        out.push(self.hop_count);
        out.push(self.ttl);
        put_u32(out, self.preq_id);
        put_mac(out, &self.originator);
        put_u32(out, self.originator_seq);
        self.ext.write(out);
        put_u32(out, self.lifetime);
        put_u32(out, self.metric);
        out.push(self.targets.len() as u8);
        for t in &self.targets {
            out.push(t.flags);
            put_mac(out, &t.target);
            put_u32(out, t.seq);
        }
    }
}

/// Path Reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prep {
    pub flags: u8,
    pub hop_count: u8,
    pub ttl: u8,
    pub target: MacAddr,
    pub target_seq: u32,
    pub ext: AddressExtension,
    pub lifetime: u32,
    pub metric: u32,
    pub originator: MacAddr,
    pub originator_seq: u32,
}

impl Prep {
    pub(crate) fn decode_body(body: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(ELEMID_MESHPREP, body);
        let raw_flags = r.u8()?;
        let mode = AddressExtension::mode_of(raw_flags);
        if body.len() != PREP_BASE_SIZE + AddressExtension::wire_len_of(mode) {
            return Err(r.bad_length());
        }
        let hop_count = r.u8()?;
        let ttl = r.u8()?;
        let target = r.mac()?;
        let target_seq = r.u32_le()?;
        let ext = AddressExtension::read(mode, &mut r)?;
        let out = Self {
            flags: raw_flags & !AE_MASK,
            hop_count,
            ttl,
            target,
            target_seq,
            ext,
            lifetime: r.u32_le()?,
            metric: r.u32_le()?,
            originator: r.mac()?,
            originator_seq: r.u32_le()?,
        };
        r.finish()?;
        Ok(out)
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) {
        out.push(self.ext.apply_to(self.flags));
        out.push(self.hop_count);
        out.push(self.ttl);
        put_mac(out, &self.target);
        put_u32(out, self.target_seq);
        self.ext.write(out);
        put_u32(out, self.lifetime);
        put_u32(out, self.metric);
        put_mac(out, &self.originator);
        put_u32(out, self.originator_seq);
    }
}

/// One unreachable destination listed in a PERR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerrDest {
    pub flags: u8,
    pub dest: MacAddr,
    pub seq: u32,
    /// Proxied external address (AE mode 10), the only extension a PERR may carry.
    pub proxied: Option<MacAddr>,
    pub reason: u16,
}

impl PerrDest {
    #[must_use]
    pub fn unknown_seq(&self) -> bool {
        self.flags & PERR_DFLAG_USN != 0
    }
}

/// Path Error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Perr {
    pub ttl: u8,
    pub dests: Vec<PerrDest>,
}

impl Perr {
    pub(crate) fn decode_body(body: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(ELEMID_MESHPERR, body);
        let ttl = r.u8()?;
        let count = usize::from(r.u8()?);
        if count == 0 || count > PERR_MAX_DESTS {
            return Err(r.bad_length());
        }
        let mut dests = Vec::with_capacity(count);
        for _ in 0..count {
            let raw_flags = r.u8()?;
            let dest = r.mac()?;
            let seq = r.u32_le()?;
            let proxied = match AddressExtension::mode_of(raw_flags) {
                0b00 => None,
                0b10 => Some(r.mac()?),
                other => return Err(DecodeError::UnknownAddressExtension(other)),
            };
            let reason = r.u16_le()?;
            dests.push(PerrDest {
                flags: raw_flags & !AE_MASK,
                dest,
                seq,
                proxied,
                reason,
            });
        }
        r.finish()?;
        Ok(Self { ttl, dests })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) {
        debug_assert!(
            !self.dests.is_empty() && self.dests.len() <= PERR_MAX_DESTS,
            "PERR carries 1..=19 destinations"
        );
        out.push(self.ttl);
        out.push(self.dests.len() as u8);
        for d in &self.dests {
            let ext = match d.proxied {
                Some(addr) => AddressExtension::Destination(addr),
                None => AddressExtension::None,
            };
            out.push(ext.apply_to(d.flags));
            put_mac(out, &d.dest);
            put_u32(out, d.seq);
            ext.write(out);
            out.extend_from_slice(&d.reason.to_le_bytes());
        }
    }
}

/// Root Announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rann {
    pub flags: u8,
    pub hop_count: u8,
    pub ttl: u8,
    pub root: MacAddr,
    pub seq: u32,
    pub metric: u32,
}

impl Rann {
    /// The root is also a portal to an external network.
    #[must_use]
    pub fn is_portal(&self) -> bool {
        self.flags & RANN_FLAG_PORTAL != 0
    }

    pub(crate) fn decode_body(body: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(ELEMID_MESHRANN, body);
        if body.len() != RANN_BODY_SIZE {
            return Err(r.bad_length());
        }
        let out = Self {
            flags: r.u8()?,
            hop_count: r.u8()?,
            ttl: r.u8()?,
            root: r.mac()?,
            seq: r.u32_le()?,
            metric: r.u32_le()?,
        };
        r.finish()?;
        Ok(out)
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) {
        out.push(self.flags);
        out.push(self.hop_count);
        out.push(self.ttl);
        put_mac(out, &self.root);
        put_u32(out, self.seq);
        put_u32(out, self.metric);
    }
}
