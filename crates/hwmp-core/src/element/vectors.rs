//! Known-answer tests against the shared element vectors.

use hwmp_test_vectors::elements;
use hwmp_test_vectors::helpers::{hex_to_bytes, mac_octets};

use super::*;
use crate::types::MacAddr;

fn mac(s: &str) -> MacAddr {
    MacAddr::new(mac_octets(s))
}

fn ext_of(mode: u8, source: &Option<String>, destination: &Option<String>) -> AddressExtension {
    let s = source.as_deref().map(mac);
    let d = destination.as_deref().map(mac);
    match (mode, s, d) {
        (0, None, None) => AddressExtension::None,
        (1, Some(s), None) => AddressExtension::Source(s),
        (2, None, Some(d)) => AddressExtension::Destination(d),
        (3, Some(source), Some(destination)) => AddressExtension::Both {
            source,
            destination,
        },
        other => panic!("inconsistent extension fields in vector: {other:?}"),
    }
}

#[test]
fn test_preq_vectors() {
    let v = elements::load();
    for pv in &v.preq_vectors {
        let raw = hex_to_bytes(&pv.encoded);
        let expected = Element::Preq(Preq {
            flags: pv.flags,
            hop_count: pv.hop_count,
            ttl: pv.ttl,
            preq_id: pv.preq_id,
            originator: mac(&pv.originator),
            originator_seq: pv.originator_seq,
            ext: ext_of(pv.ae_mode, &pv.proxied_source, &pv.proxied_destination),
            lifetime: pv.lifetime,
            metric: pv.metric,
            targets: pv
                .targets
                .iter()
                .map(|t| PreqTarget {
                    flags: t.flags,
                    target: mac(&t.target),
                    seq: t.seq,
                })
                .collect(),
        });
        let decoded = Element::decode(&raw)
            .unwrap_or_else(|e| panic!("decode failed for '{}': {e}", pv.description));
        assert_eq!(decoded, expected, "decode mismatch for: {}", pv.description);
        assert_eq!(expected.encode(), raw, "encode mismatch for: {}", pv.description);
    }
}

#[test]
fn test_prep_vectors() {
    let v = elements::load();
    for pv in &v.prep_vectors {
        let raw = hex_to_bytes(&pv.encoded);
        let expected = Element::Prep(Prep {
            flags: pv.flags,
            hop_count: pv.hop_count,
            ttl: pv.ttl,
            target: mac(&pv.target),
            target_seq: pv.target_seq,
            ext: ext_of(pv.ae_mode, &pv.proxied_source, &pv.proxied_destination),
            lifetime: pv.lifetime,
            metric: pv.metric,
            originator: mac(&pv.originator),
            originator_seq: pv.originator_seq,
        });
        let decoded = Element::decode(&raw)
            .unwrap_or_else(|e| panic!("decode failed for '{}': {e}", pv.description));
        assert_eq!(decoded, expected, "decode mismatch for: {}", pv.description);
        assert_eq!(expected.encode(), raw, "encode mismatch for: {}", pv.description);
    }
}

#[test]
fn test_perr_vectors() {
    let v = elements::load();
    for pv in &v.perr_vectors {
        let raw = hex_to_bytes(&pv.encoded);
        let expected = Element::Perr(Perr {
            ttl: pv.ttl,
            dests: pv
                .dests
                .iter()
                .map(|d| PerrDest {
                    flags: d.flags,
                    dest: mac(&d.dest),
                    seq: d.seq,
                    proxied: d.proxied.as_deref().map(mac),
                    reason: d.reason,
                })
                .collect(),
        });
        assert_eq!(
            Element::decode(&raw).unwrap(),
            expected,
            "decode mismatch for: {}",
            pv.description
        );
        assert_eq!(expected.encode(), raw, "encode mismatch for: {}", pv.description);
    }
}

#[test]
fn test_rann_and_pann_vectors() {
    let v = elements::load();
    for rv in &v.rann_vectors {
        let expected = Element::Rann(Rann {
            flags: rv.flags,
            hop_count: rv.hop_count,
            ttl: rv.ttl,
            root: mac(&rv.root),
            seq: rv.seq,
            metric: rv.metric,
        });
        let raw = hex_to_bytes(&rv.encoded);
        assert_eq!(Element::decode(&raw).unwrap(), expected, "{}", rv.description);
        assert_eq!(expected.encode(), raw, "{}", rv.description);
    }
    for pv in &v.pann_vectors {
        let expected = Element::Pann(Pann {
            flags: pv.flags,
            hop_count: pv.hop_count,
            ttl: pv.ttl,
            portal: mac(&pv.portal),
            seq: pv.seq,
            interval: pv.interval,
        });
        let raw = hex_to_bytes(&pv.encoded);
        assert_eq!(Element::decode(&raw).unwrap(), expected, "{}", pv.description);
        assert_eq!(expected.encode(), raw, "{}", pv.description);
    }
}

#[test]
fn test_meshconf_vectors() {
    let v = elements::load();
    for cv in &v.meshconf_vectors {
        let raw = hex_to_bytes(&cv.encoded);
        let Element::MeshConfig(conf) = Element::decode(&raw).unwrap() else {
            panic!("expected mesh configuration for: {}", cv.description);
        };
        assert_eq!(conf.path_selection as u8, cv.path_selection, "{}", cv.description);
        assert_eq!(conf.path_metric as u8, cv.path_metric, "{}", cv.description);
        assert_eq!(conf.congestion_control as u8, cv.congestion_control, "{}", cv.description);
        assert_eq!(conf.sync as u8, cv.sync, "{}", cv.description);
        assert_eq!(conf.auth as u8, cv.auth, "{}", cv.description);
        assert_eq!(conf.formation, cv.formation, "{}", cv.description);
        assert_eq!(conf.capabilities, cv.capabilities, "{}", cv.description);
        assert_eq!(Element::MeshConfig(conf).encode(), raw, "{}", cv.description);
    }
}

#[test]
fn test_malformed_vectors() {
    let v = elements::load();
    for mv in &v.malformed_vectors {
        let raw = hex_to_bytes(&mv.encoded);
        let err = match Element::decode(&raw) {
            Ok(e) => panic!("'{}' decoded unexpectedly: {e:?}", mv.description),
            Err(err) => err,
        };
        let kind = match err {
            DecodeError::TooShort { .. } => "too_short",
            DecodeError::BadLength { .. } => "bad_length",
            DecodeError::UnknownVersion { .. } => "unknown_version",
            DecodeError::UnknownAddressExtension(_) => "unknown_address_extension",
            DecodeError::UnknownElement(_) => "unknown_element",
            DecodeError::UnknownAction { .. } => "unknown_action",
        };
        assert_eq!(kind, mv.error, "wrong error for '{}': {err}", mv.description);
    }
}
