//! Information-element codec.
//!
//! Every element on the wire is `id(1) len(1) body(len)`. [`Element::decode`]
//! validates the header against the buffer and dispatches to the per-type
//! body decoder, which enforces that type's length rules. Decoded values own
//! their data; variable-length record arrays become `Vec`s.

mod cursor;
mod ext;
mod meshconf;
mod path;
mod peering;
mod portal;
#[cfg(test)]
mod vectors;

pub use ext::AddressExtension;
pub use meshconf::{
    AuthProtocol, CongestionControl, MeshConfig, MeshId, PathMetricProtocol,
    PathSelectionProtocol, SyncMethod,
};
pub use path::{Perr, PerrDest, Preq, PreqTarget, Prep, Rann};
pub use peering::{CongestionNotification, LinkMetricReport, PeeringManagement};
pub use portal::{Pann, ProxyRecord, ProxyUpdate, ProxyUpdateConfirm};

use crate::constants::*;
use crate::error::DecodeError;

/// A decoded mesh information element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    MeshConfig(MeshConfig),
    MeshId(MeshId),
    PeeringManagement(PeeringManagement),
    LinkMetricReport(LinkMetricReport),
    CongestionNotification(CongestionNotification),
    Pann(Pann),
    Rann(Rann),
    Preq(Preq),
    Prep(Prep),
    Perr(Perr),
    ProxyUpdate(ProxyUpdate),
    ProxyUpdateConfirm(ProxyUpdateConfirm),
}

impl Element {
    /// Element ID written in the header.
    #[must_use]
    pub fn id(&self) -> u8 {
        match self {
            Element::MeshConfig(_) => ELEMID_MESHCONF,
            Element::MeshId(_) => ELEMID_MESHID,
            Element::PeeringManagement(_) => ELEMID_MESHPEER,
            Element::LinkMetricReport(_) => ELEMID_MESHLINK,
            Element::CongestionNotification(_) => ELEMID_MESHCNGST,
            Element::Pann(_) => ELEMID_MESHPANN,
            Element::Rann(_) => ELEMID_MESHRANN,
            Element::Preq(_) => ELEMID_MESHPREQ,
            Element::Prep(_) => ELEMID_MESHPREP,
            Element::Perr(_) => ELEMID_MESHPERR,
            Element::ProxyUpdate(_) => ELEMID_MESHPXU,
            Element::ProxyUpdateConfirm(_) => ELEMID_MESHPXUC,
        }
    }

    /// Decode exactly one element from the start of `bytes`.
    ///
    /// Trailing bytes after the element are ignored; use [`ElementIter`] to
    /// walk a buffer of concatenated elements.
    pub fn decode(bytes: &[u8]) -> Result<Element, DecodeError> {
        Self::decode_prefix(bytes).map(|(element, _)| element)
    }

    /// Decode one element and report how many bytes it occupied.
    pub fn decode_prefix(bytes: &[u8]) -> Result<(Element, usize), DecodeError> {
        let (id, body) = split_header(bytes)?;
        let element = Self::decode_body(id, body)?;
        Ok((element, ELEM_HEADER_SIZE + body.len()))
    }

    fn decode_body(id: u8, body: &[u8]) -> Result<Element, DecodeError> {
        Ok(match id {
            ELEMID_MESHCONF => Element::MeshConfig(MeshConfig::decode_body(body)?),
            ELEMID_MESHID => Element::MeshId(MeshId::decode_body(body)?),
            ELEMID_MESHPEER => Element::PeeringManagement(PeeringManagement::decode_body(body)?),
            ELEMID_MESHLINK => Element::LinkMetricReport(LinkMetricReport::decode_body(body)?),
            ELEMID_MESHCNGST => {
                Element::CongestionNotification(CongestionNotification::decode_body(body)?)
            }
            ELEMID_MESHPANN => Element::Pann(Pann::decode_body(body)?),
            ELEMID_MESHRANN => Element::Rann(Rann::decode_body(body)?),
            ELEMID_MESHPREQ => Element::Preq(Preq::decode_body(body)?),
            ELEMID_MESHPREP => Element::Prep(Prep::decode_body(body)?),
            ELEMID_MESHPERR => Element::Perr(Perr::decode_body(body)?),
            ELEMID_MESHPXU => Element::ProxyUpdate(ProxyUpdate::decode_body(body)?),
            ELEMID_MESHPXUC => Element::ProxyUpdateConfirm(ProxyUpdateConfirm::decode_body(body)?),
            other => return Err(DecodeError::UnknownElement(other)),
        })
    }

    /// Encode header and body into a fresh buffer.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        self.encode_into(&mut out);
        out
    }

    /// Append header and body to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.push(self.id());
        out.push(0);
        match self {
            Element::MeshConfig(e) => e.encode_body(out),
            Element::MeshId(e) => e.encode_body(out),
            Element::PeeringManagement(e) => e.encode_body(out),
            Element::LinkMetricReport(e) => e.encode_body(out),
            Element::CongestionNotification(e) => e.encode_body(out),
            Element::Pann(e) => e.encode_body(out),
            Element::Rann(e) => e.encode_body(out),
            Element::Preq(e) => e.encode_body(out),
            Element::Prep(e) => e.encode_body(out),
            Element::Perr(e) => e.encode_body(out),
            Element::ProxyUpdate(e) => e.encode_body(out),
            Element::ProxyUpdateConfirm(e) => e.encode_body(out),
        }
        let len = out.len() - start - ELEM_HEADER_SIZE;
        debug_assert!(len <= u8::MAX as usize, "element body exceeds 255 octets");
        out[start + 1] = len as u8;
    }
}

fn split_header(bytes: &[u8]) -> Result<(u8, &[u8]), DecodeError> {
    if bytes.len() < ELEM_HEADER_SIZE {
        return Err(DecodeError::TooShort {
            need: ELEM_HEADER_SIZE,
            have: bytes.len(),
        });
    }
    let need = ELEM_HEADER_SIZE + usize::from(bytes[1]);
    if bytes.len() < need {
        return Err(DecodeError::TooShort {
            need,
            have: bytes.len(),
        });
    }
    Ok((bytes[0], &bytes[ELEM_HEADER_SIZE..need]))
}

/// Iterator over the elements of a frame body.
///
/// Yields one result per element. An element that fails to decode yields its
/// error and the walk continues with the next element; a truncated header or
/// body ends the walk after yielding `TooShort`.
pub struct ElementIter<'a> {
    buf: &'a [u8],
    done: bool,
}

impl<'a> ElementIter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, done: false }
    }
}

impl Iterator for ElementIter<'_> {
    type Item = Result<Element, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.buf.is_empty() {
            return None;
        }
        match split_header(self.buf) {
            Ok((id, body)) => {
                self.buf = &self.buf[ELEM_HEADER_SIZE + body.len()..];
                Some(Element::decode_body(id, body))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MacAddr;

    fn addr(seed: u8) -> MacAddr {
        MacAddr::new([0x02, 0, 0, 0, 0, seed])
    }

    fn prep(ext: AddressExtension) -> Element {
        Element::Prep(Prep {
            flags: 0,
            hop_count: 0,
            ttl: MESH_DEFAULT_TTL,
            target: addr(2),
            target_seq: 1,
            ext,
            lifetime: 5000,
            metric: 10,
            originator: addr(1),
            originator_seq: 1,
        })
    }

    #[test]
    fn header_length_is_written() {
        let raw = prep(AddressExtension::None).encode();
        assert_eq!(raw[0], ELEMID_MESHPREP);
        assert_eq!(usize::from(raw[1]), PREP_BASE_SIZE);
        assert_eq!(raw.len(), ELEM_HEADER_SIZE + PREP_BASE_SIZE);
    }

    #[test]
    fn declared_length_past_buffer_is_too_short() {
        let raw = prep(AddressExtension::None).encode();
        assert_eq!(
            Element::decode(&raw[..20]),
            Err(DecodeError::TooShort {
                need: 33,
                have: 20
            })
        );
        assert_eq!(
            Element::decode(&[ELEMID_MESHPREP]),
            Err(DecodeError::TooShort { need: 2, have: 1 })
        );
    }

    #[test]
    fn unknown_element_id() {
        assert_eq!(
            Element::decode(&[221, 0]),
            Err(DecodeError::UnknownElement(221))
        );
    }

    #[test]
    fn decode_prefix_reports_consumed() {
        let mut raw = prep(AddressExtension::None).encode();
        raw.extend_from_slice(&[0xde, 0xad]);
        let (_, used) = Element::decode_prefix(&raw).unwrap();
        assert_eq!(used, ELEM_HEADER_SIZE + PREP_BASE_SIZE);
    }

    #[test]
    fn iterator_skips_bad_elements_and_stops_on_truncation() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&[221, 1, 0]);
        prep(AddressExtension::None).encode_into(&mut raw);
        raw.extend_from_slice(&[ELEMID_MESHPERR, 40, 1]);

        let items: Vec<_> = ElementIter::new(&raw).collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Err(DecodeError::UnknownElement(221)));
        assert_eq!(items[1], Ok(prep(AddressExtension::None)));
        assert!(matches!(items[2], Err(DecodeError::TooShort { .. })));
    }

    #[test]
    fn every_prep_extension_variant_round_trips() {
        let variants = [
            AddressExtension::None,
            AddressExtension::Source(addr(7)),
            AddressExtension::Destination(addr(8)),
            AddressExtension::Both {
                source: addr(7),
                destination: addr(8),
            },
        ];
        for ext in variants {
            let e = prep(ext);
            assert_eq!(Element::decode(&e.encode()).unwrap(), e, "{ext:?}");
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn mac() -> impl Strategy<Value = MacAddr> {
            any::<[u8; 6]>().prop_map(MacAddr::new)
        }

        fn ext() -> impl Strategy<Value = AddressExtension> {
            prop_oneof![
                Just(AddressExtension::None),
                mac().prop_map(AddressExtension::Source),
                mac().prop_map(AddressExtension::Destination),
                (mac(), mac()).prop_map(|(source, destination)| AddressExtension::Both {
                    source,
                    destination
                }),
            ]
        }

        fn flags() -> impl Strategy<Value = u8> {
            any::<u8>().prop_map(|f| f & !AE_MASK)
        }

        fn preq() -> impl Strategy<Value = Preq> {
            let target = (any::<u8>(), mac(), any::<u32>()).prop_map(|(flags, target, seq)| {
                PreqTarget { flags, target, seq }
            });
            (
                (flags(), any::<u8>(), any::<u8>(), any::<u32>()),
                (mac(), any::<u32>(), ext()),
                (any::<u32>(), any::<u32>()),
                prop::collection::vec(target, 1..=PREQ_MAX_TARGETS),
            )
                .prop_map(
                    |(
                        (flags, hop_count, ttl, preq_id),
                        (originator, originator_seq, ext),
                        (lifetime, metric),
                        targets,
                    )| Preq {
                        flags,
                        hop_count,
                        ttl,
                        preq_id,
                        originator,
                        originator_seq,
                        ext,
                        lifetime,
                        metric,
                        targets,
                    },
                )
        }

        fn prep_elem() -> impl Strategy<Value = Prep> {
            (
                (flags(), any::<u8>(), any::<u8>(), mac(), any::<u32>()),
                ext(),
                (any::<u32>(), any::<u32>(), mac(), any::<u32>()),
            )
                .prop_map(
                    |(
                        (flags, hop_count, ttl, target, target_seq),
                        ext,
                        (lifetime, metric, originator, originator_seq),
                    )| Prep {
                        flags,
                        hop_count,
                        ttl,
                        target,
                        target_seq,
                        ext,
                        lifetime,
                        metric,
                        originator,
                        originator_seq,
                    },
                )
        }

        fn perr() -> impl Strategy<Value = Perr> {
            let dest = (
                flags(),
                mac(),
                any::<u32>(),
                proptest::option::of(mac()),
                any::<u16>(),
            )
                .prop_map(|(flags, dest, seq, proxied, reason)| PerrDest {
                    flags,
                    dest,
                    seq,
                    proxied,
                    reason,
                });
            // 19 records with extensions would overflow the length octet
            (any::<u8>(), prop::collection::vec(dest, 1..=12))
                .prop_map(|(ttl, dests)| Perr { ttl, dests })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            #[test]
            fn preq_round_trip(p in preq()) {
                prop_assume!(PREQ_BASE_SIZE + p.ext.wire_len() + p.targets.len() * PREQ_TARGET_SIZE <= 255);
                let e = Element::Preq(p);
                prop_assert_eq!(Element::decode(&e.encode()).unwrap(), e);
            }

            #[test]
            fn prep_round_trip(p in prep_elem()) {
                let e = Element::Prep(p);
                prop_assert_eq!(Element::decode(&e.encode()).unwrap(), e);
            }

            #[test]
            fn perr_round_trip(p in perr()) {
                let e = Element::Perr(p);
                prop_assert_eq!(Element::decode(&e.encode()).unwrap(), e);
            }

            #[test]
            fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..300)) {
                let _ = Element::decode(&bytes);
                for item in ElementIter::new(&bytes) {
                    let _ = item;
                }
            }
        }
    }
}
