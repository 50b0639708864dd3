//! Test vector types for elements.json
//!
//! Encoded PREQ, PREP, PERR, RANN, PANN, and Mesh Configuration elements
//! with their decoded field values, plus malformed inputs and the error kind
//! each must produce.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PreqTargetVector {
    pub flags: u8,
    pub target: String,
    pub seq: u32,
}

#[derive(Debug, Deserialize)]
pub struct PreqVector {
    pub description: String,
    pub flags: u8,
    pub hop_count: u8,
    pub ttl: u8,
    pub preq_id: u32,
    pub originator: String,
    pub originator_seq: u32,
    pub ae_mode: u8,
    #[serde(default)]
    pub proxied_source: Option<String>,
    #[serde(default)]
    pub proxied_destination: Option<String>,
    pub lifetime: u32,
    pub metric: u32,
    pub targets: Vec<PreqTargetVector>,
    pub encoded: String,
}

#[derive(Debug, Deserialize)]
pub struct PrepVector {
    pub description: String,
    pub flags: u8,
    pub hop_count: u8,
    pub ttl: u8,
    pub target: String,
    pub target_seq: u32,
    pub ae_mode: u8,
    #[serde(default)]
    pub proxied_source: Option<String>,
    #[serde(default)]
    pub proxied_destination: Option<String>,
    pub lifetime: u32,
    pub metric: u32,
    pub originator: String,
    pub originator_seq: u32,
    pub encoded: String,
}

#[derive(Debug, Deserialize)]
pub struct PerrDestVector {
    pub flags: u8,
    pub dest: String,
    pub seq: u32,
    #[serde(default)]
    pub proxied: Option<String>,
    pub reason: u16,
}

#[derive(Debug, Deserialize)]
pub struct PerrVector {
    pub description: String,
    pub ttl: u8,
    pub dests: Vec<PerrDestVector>,
    pub encoded: String,
}

#[derive(Debug, Deserialize)]
pub struct RannVector {
    pub description: String,
    pub flags: u8,
    pub hop_count: u8,
    pub ttl: u8,
    pub root: String,
    pub seq: u32,
    pub metric: u32,
    pub encoded: String,
}

#[derive(Debug, Deserialize)]
pub struct PannVector {
    pub description: String,
    pub flags: u8,
    pub hop_count: u8,
    pub ttl: u8,
    pub portal: String,
    pub seq: u32,
    pub interval: u16,
    pub encoded: String,
}

/// Selector IDs under the IEEE 802.11 OUI.
#[derive(Debug, Deserialize)]
pub struct MeshConfVector {
    pub description: String,
    pub path_selection: u8,
    pub path_metric: u8,
    pub congestion_control: u8,
    pub sync: u8,
    pub auth: u8,
    pub formation: u8,
    pub capabilities: u8,
    pub encoded: String,
}

/// `error` is one of `too_short`, `bad_length`, `unknown_version`,
/// `unknown_address_extension`, `unknown_element`.
#[derive(Debug, Deserialize)]
pub struct MalformedVector {
    pub description: String,
    pub encoded: String,
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct ElementsVectors {
    pub description: String,
    pub source: String,
    pub preq_vectors: Vec<PreqVector>,
    pub prep_vectors: Vec<PrepVector>,
    pub perr_vectors: Vec<PerrVector>,
    pub rann_vectors: Vec<RannVector>,
    pub pann_vectors: Vec<PannVector>,
    pub meshconf_vectors: Vec<MeshConfVector>,
    pub malformed_vectors: Vec<MalformedVector>,
}

pub fn load() -> ElementsVectors {
    let json = include_str!("../../../.test-vectors/elements.json");
    serde_json::from_str(json).expect("Failed to deserialize elements.json")
}
