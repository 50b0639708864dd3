//! Shared decoding helpers for vector-driven tests. Enable the `helpers`
//! feature to use them.

/// Decode a hex string into a `Vec<u8>`.
pub fn hex_to_bytes(hex: &str) -> Vec<u8> {
    hex::decode(hex).expect("invalid hex")
}

/// Parse a colon-separated hardware address into its six octets.
pub fn mac_octets(s: &str) -> [u8; 6] {
    let parts: Vec<u8> = s
        .split(':')
        .map(|p| u8::from_str_radix(p, 16).expect("invalid address octet"))
        .collect();
    parts.try_into().expect("address must have 6 octets")
}
