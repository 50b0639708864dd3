//! Error types for the hwmp-core crate.

/// Why an element, header, or frame failed to decode.
///
/// Every variant is recoverable: the receive path drops the offending frame
/// and moves on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("buffer too short: need {need} bytes, have {have}")]
    TooShort { need: usize, have: usize },

    #[error("element {element} has invalid length {len}")]
    BadLength { element: u8, len: usize },

    /// A version octet or OUI+ID selector is not one of the registered values.
    /// `value` is the version, or the 4 selector octets read big-endian.
    #[error("unregistered version or protocol selector {value:#010x} in element {element}")]
    UnknownVersion { element: u8, value: u32 },

    #[error("address extension mode {0:#04b} is not valid here")]
    UnknownAddressExtension(u8),

    #[error("unknown element id {0}")]
    UnknownElement(u8),

    #[error("unknown action category {category} / action {action}")]
    UnknownAction { category: u8, action: u8 },
}
