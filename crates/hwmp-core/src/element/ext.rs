//! Address Extension (AE) sub-encodings for PREQ, PREP, and PERR.
//!
//! The AE mode lives in the two high bits of the owning flags octet. Each
//! mode appends a fixed number of proxied addresses after the sequence
//! number field that precedes it:
//!
//! ```text
//! 00  no extension
//! 01  proxied source address        (6)
//! 10  proxied destination address   (6)
//! 11  source then destination       (12)
//! ```

use crate::constants::{ADDR_LEN, AE_MASK, AE_SHIFT};
use crate::error::DecodeError;
use crate::types::MacAddr;

use super::cursor::{Reader, put_mac};

/// Proxied addresses carried by a path-selection element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressExtension {
    #[default]
    None,
    /// A non-mesh station proxied on the originating side.
    Source(MacAddr),
    /// A non-mesh station proxied on the target side.
    Destination(MacAddr),
    Both {
        source: MacAddr,
        destination: MacAddr,
    },
}

impl AddressExtension {
    /// Two-bit AE mode value.
    #[must_use]
    pub fn mode(&self) -> u8 {
        match self {
            AddressExtension::None => 0b00,
            AddressExtension::Source(_) => 0b01,
            AddressExtension::Destination(_) => 0b10,
            AddressExtension::Both { .. } => 0b11,
        }
    }

    /// Extract the AE mode from a flags octet.
    #[must_use]
    pub fn mode_of(flags: u8) -> u8 {
        (flags & AE_MASK) >> AE_SHIFT
    }

    /// Merge this extension's mode into `flags` (AE bits are overwritten).
    #[must_use]
    pub fn apply_to(&self, flags: u8) -> u8 {
        (flags & !AE_MASK) | (self.mode() << AE_SHIFT)
    }

    /// Octets appended on the wire.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        Self::wire_len_of(self.mode())
    }

    pub(crate) fn wire_len_of(mode: u8) -> usize {
        match mode {
            0b00 => 0,
            0b11 => 2 * ADDR_LEN,
            _ => ADDR_LEN,
        }
    }

    #[must_use]
    pub fn source(&self) -> Option<MacAddr> {
        match self {
            AddressExtension::Source(s) | AddressExtension::Both { source: s, .. } => Some(*s),
            _ => None,
        }
    }

    #[must_use]
    pub fn destination(&self) -> Option<MacAddr> {
        match self {
            AddressExtension::Destination(d)
            | AddressExtension::Both { destination: d, .. } => Some(*d),
            _ => None,
        }
    }

    pub(crate) fn read(mode: u8, r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(match mode {
            0b00 => AddressExtension::None,
            0b01 => AddressExtension::Source(r.mac()?),
            0b10 => AddressExtension::Destination(r.mac()?),
            0b11 => AddressExtension::Both {
                source: r.mac()?,
                destination: r.mac()?,
            },
            other => return Err(DecodeError::UnknownAddressExtension(other)),
        })
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        match self {
            AddressExtension::None => {}
            AddressExtension::Source(a) | AddressExtension::Destination(a) => put_mac(out, a),
            AddressExtension::Both {
                source,
                destination,
            } => {
                put_mac(out, source);
                put_mac(out, destination);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(seed: u8) -> MacAddr {
        MacAddr::new([0x02, 0, 0, 0, 0, seed])
    }

    #[test]
    fn mode_bits_round_trip_through_flags() {
        let cases = [
            AddressExtension::None,
            AddressExtension::Source(addr(1)),
            AddressExtension::Destination(addr(2)),
            AddressExtension::Both {
                source: addr(1),
                destination: addr(2),
            },
        ];
        for (expected_mode, ext) in cases.iter().enumerate() {
            let flags = ext.apply_to(0x05);
            assert_eq!(flags & 0x3f, 0x05);
            assert_eq!(AddressExtension::mode_of(flags), expected_mode as u8);
        }
    }

    #[test]
    fn wire_len_by_mode() {
        assert_eq!(AddressExtension::None.wire_len(), 0);
        assert_eq!(AddressExtension::Source(addr(1)).wire_len(), 6);
        assert_eq!(AddressExtension::Destination(addr(1)).wire_len(), 6);
        assert_eq!(
            AddressExtension::Both {
                source: addr(1),
                destination: addr(2)
            }
            .wire_len(),
            12
        );
    }

    #[test]
    fn both_orders_source_first() {
        let ext = AddressExtension::Both {
            source: addr(1),
            destination: addr(2),
        };
        let mut out = Vec::new();
        ext.write(&mut out);
        assert_eq!(&out[..6], addr(1).as_ref());
        assert_eq!(&out[6..], addr(2).as_ref());
        assert_eq!(ext.source(), Some(addr(1)));
        assert_eq!(ext.destination(), Some(addr(2)));
    }
}
