//! Element identifiers, wire sizes, flag bits, and protocol defaults.

// Element IDs
pub const ELEMID_MESHID: u8 = 114;
pub const ELEMID_MESHCONF: u8 = 113;
pub const ELEMID_MESHLINK: u8 = 115;
pub const ELEMID_MESHCNGST: u8 = 116;
pub const ELEMID_MESHPEER: u8 = 117;
pub const ELEMID_MESHPANN: u8 = 125;
pub const ELEMID_MESHRANN: u8 = 126;
pub const ELEMID_MESHPREQ: u8 = 130;
pub const ELEMID_MESHPREP: u8 = 131;
pub const ELEMID_MESHPERR: u8 = 132;
pub const ELEMID_MESHPXU: u8 = 137;
pub const ELEMID_MESHPXUC: u8 = 138;

/// Element header: id(1) + len(1).
pub const ELEM_HEADER_SIZE: usize = 2;
pub const ADDR_LEN: usize = 6;

/// Maximum Mesh ID length (same bound as an SSID).
pub const MESHID_MAXLEN: usize = 32;

// Mesh Configuration
pub const MESHCONF_BODY_SIZE: usize = 23;
pub const MESHCONF_VERSION: u8 = 1;
/// OUI for IEEE 802.11 registered protocol identifiers.
pub const OUI_IEEE80211: [u8; 3] = [0x00, 0x0f, 0xac];

pub const MESHCONF_CAP_AP: u8 = 0x01;
pub const MESHCONF_CAP_MCCA_SUP: u8 = 0x02;
pub const MESHCONF_CAP_MCCA_EN: u8 = 0x04;
pub const MESHCONF_CAP_FWRD: u8 = 0x08;
pub const MESHCONF_CAP_BTR: u8 = 0x10;
pub const MESHCONF_CAP_TBTT_ADJ: u8 = 0x20;
pub const MESHCONF_CAP_PS: u8 = 0x40;

pub const MESHCONF_FORM_GATE: u8 = 0x01;
pub const MESHCONF_FORM_NEIGHBOR_MASK: u8 = 0x7e;
pub const MESHCONF_FORM_AS: u8 = 0x80;

// Peering management
pub const PEER_PROTO_MPM: u16 = 0x0000;
pub const PEER_PROTO_AMPE: u16 = 0x0001;
pub const PEER_PMK_LEN: usize = 16;

// Link metric report
pub const MESHLINK_BODY_SIZE: usize = 5;
pub const MESHLINK_FLAG_REQUEST: u8 = 0x01;

// Congestion notification: dest(6) + 4 access-category durations(2 each)
pub const MESHCNGST_BODY_SIZE: usize = 14;

// PREQ
pub const PREQ_FLAG_PROACTIVE: u8 = 0x01;
pub const PREQ_FLAG_BROADCAST: u8 = 0x02;
pub const PREQ_FLAG_PROACTIVE_PREP: u8 = 0x04;
/// flags(1) hop(1) ttl(1) preq_id(4) orig(6) orig_seq(4) lifetime(4) metric(4) tcount(1)
pub const PREQ_BASE_SIZE: usize = 26;
pub const PREQ_TARGET_SIZE: usize = 11;
pub const PREQ_MAX_TARGETS: usize = 20;
pub const PREQ_TFLAG_TO: u8 = 0x01;
pub const PREQ_TFLAG_RF: u8 = 0x02;
pub const PREQ_TFLAG_USN: u8 = 0x04;

// PREP
/// flags(1) hop(1) ttl(1) target(6) tseq(4) lifetime(4) metric(4) orig(6) oseq(4)
pub const PREP_BASE_SIZE: usize = 31;

// PERR
/// ttl(1) dcount(1)
pub const PERR_BASE_SIZE: usize = 2;
/// flags(1) dest(6) seq(4) reason(2), plus 6 when a destination extension is present.
pub const PERR_DEST_SIZE: usize = 13;
pub const PERR_MAX_DESTS: usize = 19;
pub const PERR_DFLAG_USN: u8 = 0x01;
pub const PERR_DFLAG_RC: u8 = 0x02;

/// Address-extension mode occupies the two high bits of a flags octet.
pub const AE_SHIFT: u8 = 6;
pub const AE_MASK: u8 = 0xc0;

// RANN
pub const RANN_BODY_SIZE: usize = 17;
pub const RANN_FLAG_PORTAL: u8 = 0x01;

// PANN
/// flags(1) hop(1) ttl(1) portal(6) seq(4) interval(2)
pub const PANN_BODY_SIZE: usize = 15;

// Proxy update
/// flags(1) pu_seq(1) proxy(6) count(1)
pub const PXU_BASE_SIZE: usize = 9;
/// flags(1) station(6) seq(4) lifetime(4)
pub const PXU_RECORD_SIZE: usize = 15;
pub const PXU_FLAG_DELETE: u8 = 0x01;
/// flags(1) pu_seq(1) proxy(6)
pub const PXUC_BODY_SIZE: usize = 8;

// Mesh control header
pub const MESHCTL_BASE_SIZE: usize = 6;
pub const MESHCTL_AE_MASK: u8 = 0x03;

// Reason codes carried in PERR destinations
pub const REASON_MESH_PERR_NO_PROXY: u16 = 61;
pub const REASON_MESH_PERR_NO_FI: u16 = 62;
pub const REASON_MESH_PERR_DEST_UNREACH: u16 = 63;

/// Default mesh TTL for path-selection elements.
pub const MESH_DEFAULT_TTL: u8 = 31;
