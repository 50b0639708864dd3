//! Bounds-checked little-endian reader over an element body.
//!
//! Running out of body bytes means the declared element length does not fit
//! the element's layout, so every short read maps to `BadLength`.

use crate::error::DecodeError;
use crate::types::MacAddr;

pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    element: u8,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(element: u8, buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            element,
        }
    }

    pub(crate) fn bad_length(&self) -> DecodeError {
        DecodeError::BadLength {
            element: self.element,
            len: self.buf.len(),
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(self.bad_length());
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16_le(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32_le(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn mac(&mut self) -> Result<MacAddr, DecodeError> {
        Ok(MacAddr::new(self.array::<6>()?))
    }

    /// Require that the body has been consumed exactly.
    pub(crate) fn finish(self) -> Result<(), DecodeError> {
        if self.remaining() != 0 {
            return Err(self.bad_length());
        }
        Ok(())
    }
}

pub(crate) fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub(crate) fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub(crate) fn put_mac(out: &mut Vec<u8>, addr: &MacAddr) {
    out.extend_from_slice(addr.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let buf = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut r = Reader::new(1, &buf);
        assert_eq!(r.u16_le().unwrap(), 0x1234);
        assert_eq!(r.u32_le().unwrap(), 0x1234_5678);
        assert!(r.finish().is_ok());
    }

    #[test]
    fn short_read_is_bad_length() {
        let buf = [0x01, 0x02, 0x03];
        let mut r = Reader::new(130, &buf);
        assert_eq!(
            r.u32_le(),
            Err(DecodeError::BadLength { element: 130, len: 3 })
        );
    }

    #[test]
    fn leftover_bytes_fail_finish() {
        let buf = [0x01, 0x02];
        let mut r = Reader::new(7, &buf);
        r.u8().unwrap();
        assert!(r.finish().is_err());
    }
}
