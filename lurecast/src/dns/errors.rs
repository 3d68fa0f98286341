//! Error types for the DNS/LLMNR wire codec.

/// Reasons an inbound datagram could not be decoded.
///
/// Every variant is scoped to a single datagram: decoding stops for that
/// datagram only, and the capture layer reports it as a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeErrors {
    /// The datagram ended before a field could be read.
    #[error("datagram truncated: needed {needed} byte(s) at offset {offset}, datagram is {len} bytes")]
    Truncated {
        offset: usize,
        needed: usize,
        len: usize,
    },
    /// A label length byte used the reserved `01` or `10` prefix.
    #[error("reserved label type 0x{byte:02x} at offset {offset}")]
    ReservedLabelType { byte: u8, offset: usize },
    /// A compression pointer targets a position outside the datagram.
    #[error("compression pointer at offset {offset} targets {target}, outside the {len}-byte datagram")]
    PointerOutOfRange {
        offset: usize,
        target: usize,
        len: usize,
    },
    /// Pointer chain revisits a target or exceeds the hop limit.
    #[error("compression pointer loop at offset {offset} (target {target})")]
    PointerLoop { offset: usize, target: usize },
    /// The name starting at `offset`, pointers resolved, exceeds 255 encoded bytes.
    #[error("name at offset {offset} exceeds 255 bytes once decoded")]
    NameTooLong { offset: usize },
}

/// Reasons a domain name could not be encoded into wire format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeErrors {
    #[error("label too long (>63 bytes): {0}")]
    LabelTooLong(String),
    #[error("name too long (>255 bytes encoded): {0}")]
    NameTooLong(String),
}
