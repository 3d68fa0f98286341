//! Outbound presence query.
//!
//! A presence broadcast is an ordinary LLMNR question for the decoy's own
//! name (`A`, class `IN`) sent to the multicast group. Hosts on the segment
//! see what looks like a machine checking its name, and poisoning tools that
//! answer it reveal themselves to the capture side.
//!
//! The transaction id is fixed at zero and the flags are all clear: this
//! engine never resolves anything and never matches replies to queries.
use crate::dns::EncodeErrors;
use crate::dns::compressor::LabelCodec;
use crate::dns::message::{DnsHeaderFlags, HeaderSection};

/// Query type for a host address record.
pub const TYPE_A: u16 = 1;
/// Query class for the Internet.
pub const CLASS_IN: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryEncoder;

impl QueryEncoder {
    pub const TRANSACTION_ID: u16 = 0;

    /// Builds the presence query datagram for `machine_name`.
    ///
    /// The length is `12 + encoded name + 4`, fully determined by the name.
    pub fn encode(machine_name: &str) -> Result<Vec<u8>, EncodeErrors> {
        let header = HeaderSection {
            id: Self::TRANSACTION_ID,
            flags: DnsHeaderFlags::default().to_u16(),
            qd_count: 1,
            an_count: 0,
            ns_count: 0,
            ar_count: 0,
        };

        let mut message = Vec::with_capacity(HeaderSection::LEN + machine_name.len() + 6);
        message.extend_from_slice(&header.to_bytes());
        LabelCodec::encode_into(machine_name, &mut message)?;
        message.extend_from_slice(&TYPE_A.to_be_bytes());
        message.extend_from_slice(&CLASS_IN.to_be_bytes());
        Ok(message)
    }
}
