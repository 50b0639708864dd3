//! Portal announcement and proxy-update elements.

use crate::constants::*;
use crate::error::DecodeError;
use crate::types::MacAddr;

use super::cursor::{Reader, put_mac, put_u16, put_u32};

/// Portal Announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pann {
    pub flags: u8,
    pub hop_count: u8,
    pub ttl: u8,
    pub portal: MacAddr,
    pub seq: u32,
    /// Announcement interval in TUs.
    pub interval: u16,
}

impl Pann {
    pub(crate) fn decode_body(body: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(ELEMID_MESHPANN, body);
        if body.len() != PANN_BODY_SIZE {
            return Err(r.bad_length());
        }
        let out = Self {
            flags: r.u8()?,
            hop_count: r.u8()?,
            ttl: r.u8()?,
            portal: r.mac()?,
            seq: r.u32_le()?,
            interval: r.u16_le()?,
        };
        r.finish()?;
        Ok(out)
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) {
        out.push(self.flags);
        out.push(self.hop_count);
        out.push(self.ttl);
        put_mac(out, &self.portal);
        put_u32(out, self.seq);
        put_u16(out, self.interval);
    }
}

/// One station announced (or withdrawn) by a proxy update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyRecord {
    pub flags: u8,
    pub station: MacAddr,
    pub seq: u32,
    pub lifetime: u32,
}

impl ProxyRecord {
    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.flags & PXU_FLAG_DELETE != 0
    }
}

/// Proxy Update: a mesh node announces the non-mesh stations it proxies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyUpdate {
    pub flags: u8,
    pub pu_seq: u8,
    pub proxy: MacAddr,
    pub records: Vec<ProxyRecord>,
}

impl ProxyUpdate {
    /// Records that fit in one element after the fixed header.
    pub const MAX_RECORDS: usize = (255 - PXU_BASE_SIZE) / PXU_RECORD_SIZE;

    pub(crate) fn decode_body(body: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(ELEMID_MESHPXU, body);
        if body.len() < PXU_BASE_SIZE {
            return Err(r.bad_length());
        }
        let flags = r.u8()?;
        let pu_seq = r.u8()?;
        let proxy = r.mac()?;
        let count = usize::from(r.u8()?);
        if r.remaining() != count * PXU_RECORD_SIZE {
            return Err(r.bad_length());
        }
        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            records.push(ProxyRecord {
                flags: r.u8()?,
                station: r.mac()?,
                seq: r.u32_le()?,
                lifetime: r.u32_le()?,
            });
        }
        r.finish()?;
        Ok(Self {
            flags,
            pu_seq,
            proxy,
            records,
        })
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) {
        debug_assert!(self.records.len() <= Self::MAX_RECORDS);
        out.push(self.flags);
        out.push(self.pu_seq);
        put_mac(out, &self.proxy);
        out.push(self.records.len() as u8);
        for rec in &self.records {
            out.push(rec.flags);
            put_mac(out, &rec.station);
            put_u32(out, rec.seq);
            put_u32(out, rec.lifetime);
        }
    }
}

/// Proxy Update Confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyUpdateConfirm {
    pub flags: u8,
    pub pu_seq: u8,
    pub proxy: MacAddr,
}

impl ProxyUpdateConfirm {
    pub(crate) fn decode_body(body: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(ELEMID_MESHPXUC, body);
        if body.len() != PXUC_BODY_SIZE {
            return Err(r.bad_length());
        }
        let out = Self {
            flags: r.u8()?,
            pu_seq: r.u8()?,
            proxy: r.mac()?,
        };
        r.finish()?;
        Ok(out)
    }

    pub(crate) fn encode_body(&self, out: &mut Vec<u8>) {
        out.push(self.flags);
        out.push(self.pu_seq);
        put_mac(out, &self.proxy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pann_layout() {
        let pann = Pann {
            flags: 0,
            hop_count: 0,
            ttl: 31,
            portal: MacAddr::new([2, 0, 0, 0, 0, 1]),
            seq: 42,
            interval: 1000,
        };
        let mut raw = Vec::new();
        pann.encode_body(&mut raw);
        assert_eq!(raw.len(), PANN_BODY_SIZE);
        assert_eq!(&raw[13..15], &1000u16.to_le_bytes());
        assert_eq!(Pann::decode_body(&raw).unwrap(), pann);
    }

    #[test]
    fn proxy_update_count_must_match() {
        let pxu = ProxyUpdate {
            flags: 0,
            pu_seq: 3,
            proxy: MacAddr::new([2, 0, 0, 0, 0, 1]),
            records: vec![ProxyRecord {
                flags: PXU_FLAG_DELETE,
                station: MacAddr::new([0x0a, 0, 0, 0, 0, 1]),
                seq: 1,
                lifetime: 0,
            }],
        };
        let mut raw = Vec::new();
        pxu.encode_body(&mut raw);
        assert_eq!(raw.len(), PXU_BASE_SIZE + PXU_RECORD_SIZE);
        let decoded = ProxyUpdate::decode_body(&raw).unwrap();
        assert!(decoded.records[0].is_delete());

        raw[8] = 2;
        assert!(ProxyUpdate::decode_body(&raw).is_err());
    }

    #[test]
    fn proxy_update_max_records_fits_length_octet() {
        assert!(PXU_BASE_SIZE + ProxyUpdate::MAX_RECORDS * PXU_RECORD_SIZE <= 255);
    }

    #[test]
    fn confirm_fixed_length() {
        assert!(ProxyUpdateConfirm::decode_body(&[0; 7]).is_err());
        let c = ProxyUpdateConfirm::decode_body(&[1, 9, 2, 0, 0, 0, 0, 1]).unwrap();
        assert_eq!(c.pu_seq, 9);
    }
}
