//! # Inbound LLMNR/DNS message decoding
//!
//! LLMNR reuses the RFC1035 message layout unchanged, so a datagram picked up
//! on `224.0.0.252:5355` is decoded exactly like a DNS message:
//!
//! - a fixed 12-byte [`HeaderSection`] (id, flags, four section counts),
//! - `qdcount` questions: name, query type, query class,
//! - `ancount` answers: name, a fixed type/class/ttl/rdlength block and
//!   `rdlength` bytes of record data.
//!
//! Authority and additional records are counted but not parsed.
//!
//! Record data is rendered as dotted decimal octets whatever the declared
//! type. The tools that probe a decoy only ever answer with address records,
//! so the rendering stays cheap and IPv4-shaped.
//!
//! The decoded form is a [`DecodedMessage`]. Its `questions` list is always
//! present, while `answers` is `None` (and omitted when serialized) unless
//! the header announces at least one answer.
//!
//! ```rust
//! use lurecast::dns::message::DecodedMessage;
//!
//! let datagram = [
//!     0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     4, b'w', b'p', b'a', b'd', 0, 0x00, 0x01, 0x00, 0x01,
//! ];
//!
//! let msg = DecodedMessage::decode(&datagram).unwrap();
//! assert_eq!(msg.id, 0x1234);
//! assert_eq!(msg.questions[0].domain_name, vec!["wpad"]);
//! assert!(msg.answers.is_none());
//! ```
use serde::Serialize;

use crate::dns::compressor::LabelCodec;
use crate::dns::{DecodeErrors, wire};

/// Represents the header section of a DNS message (RFC 1035 §4.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSection {
    /// Identifier to match requests and responses.
    pub id: u16,
    /// Flags and control bits for the DNS message.
    /// Use [`DnsHeaderFlags`]
    pub flags: u16,
    /// Number of entries in the question section.
    pub qd_count: u16,
    /// Number of resource records in the answer section.
    pub an_count: u16,
    /// Number of name server records in the authority section.
    pub ns_count: u16,
    /// Number of resource records in the additional section.
    pub ar_count: u16,
}

impl HeaderSection {
    /// Size of the fixed header on the wire.
    pub const LEN: usize = 12;

    /// Converts the header into a 12-byte array suitable for network transmission.
    pub fn to_bytes(&self) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        bytes[0..2].copy_from_slice(&self.id.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.flags.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.qd_count.to_be_bytes());
        bytes[6..8].copy_from_slice(&self.an_count.to_be_bytes());
        bytes[8..10].copy_from_slice(&self.ns_count.to_be_bytes());
        bytes[10..12].copy_from_slice(&self.ar_count.to_be_bytes());
        bytes
    }

    /// Reads the six big-endian header fields at the start of `message`.
    pub fn from_bytes(message: &[u8]) -> Result<Self, DecodeErrors> {
        wire::take(message, 0, Self::LEN)?;

        Ok(Self {
            id: wire::read_u16(message, 0)?,
            flags: wire::read_u16(message, 2)?,
            qd_count: wire::read_u16(message, 4)?,
            an_count: wire::read_u16(message, 6)?,
            ns_count: wire::read_u16(message, 8)?,
            ar_count: wire::read_u16(message, 10)?,
        })
    }
}

/// Represents the 16-bit DNS flags field (RFC 1035 §4.1.1).
///
/// ```text
///   15  14 13 12 11  10   9   8   7   6  5  4   3  2  1  0
/// +---+-----------+---+---+---+---+--------+------------+
/// |QR |  OPCODE   |AA |TC |RD |RA |   Z    |   RCODE    |
/// +---+-----------+---+---+---+---+--------+------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DnsHeaderFlags {
    /// QR: the message is a response.
    pub is_response: bool,
    /// Operation code, 4 bits.
    pub opcode: u8,
    /// AA: Authoritative Answer
    pub is_authoritative: bool,
    /// TC: Truncation flag
    pub is_truncated: bool,
    /// RD: Recursion Desired
    pub recursion_desired: bool,
    /// RA: Recursion Available
    pub recursion_available: bool,
    /// Z: reserved bits, 3 bits.
    pub reserved: u8,
    /// Response code, 4 bits.
    pub response_code: u8,
}

impl DnsHeaderFlags {
    /// Encode the flags into a 16-bit integer.
    pub fn to_u16(self) -> u16 {
        ((self.is_response as u16) << 15)
            | ((self.opcode as u16 & 0b1111) << 11)
            | ((self.is_authoritative as u16) << 10)
            | ((self.is_truncated as u16) << 9)
            | ((self.recursion_desired as u16) << 8)
            | ((self.recursion_available as u16) << 7)
            | ((self.reserved as u16 & 0b111) << 4)
            | (self.response_code as u16 & 0b1111)
    }

    /// Decode from a 16-bit integer into structured flags.
    pub fn from_u16(value: u16) -> Self {
        Self {
            is_response: (value >> 15) & 1 != 0,
            opcode: ((value >> 11) & 0b1111) as u8,
            is_authoritative: (value >> 10) & 1 != 0,
            is_truncated: (value >> 9) & 1 != 0,
            recursion_desired: (value >> 8) & 1 != 0,
            recursion_available: (value >> 7) & 1 != 0,
            reserved: ((value >> 4) & 0b111) as u8,
            response_code: (value & 0b1111) as u8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSection {
    /// Labels of the queried name, in order.
    pub domain_name: Vec<String>,
    /// The type of record being requested (e.g., A, AAAA, ANY).
    pub query_type: u16,
    /// The class of the query (usually IN).
    pub query_class: u16,
}

/// A single answer record. The record data is always rendered as an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerSection {
    /// Labels of the owner name, in order.
    pub domain_name: Vec<String>,
    pub query_type: u16,
    pub query_class: u16,
    /// Time-to-live of the record in seconds.
    pub ttl: u32,
    /// Record data as decimal octets joined by dots.
    pub ip_address: String,
}

/// A fully decoded inbound datagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedMessage {
    pub id: u16,
    #[serde(flatten)]
    pub flags: DnsHeaderFlags,
    pub question_count: u16,
    pub answer_count: u16,
    pub authority_count: u16,
    pub additional_count: u16,
    pub questions: Vec<QuestionSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<AnswerSection>>,
}

/// type(2) + class(2) + ttl(4) + rdlength(2)
const ANSWER_FIXED_LEN: usize = 10;

impl DecodedMessage {
    /// Decodes a raw datagram.
    ///
    /// # Errors
    /// Any truncation or malformed name aborts decoding of this datagram
    /// with a [`DecodeErrors`].
    pub fn decode(message: &[u8]) -> Result<Self, DecodeErrors> {
        let header = HeaderSection::from_bytes(message)?;
        let mut offset = HeaderSection::LEN;

        let mut questions = Vec::new();
        for _ in 0..header.qd_count {
            let (domain_name, next) = LabelCodec::decode(message, offset)?;
            questions.push(QuestionSection {
                domain_name,
                query_type: wire::read_u16(message, next)?,
                query_class: wire::read_u16(message, next + 2)?,
            });
            offset = next + 4;
        }

        let mut answers = Vec::new();
        for _ in 0..header.an_count {
            let (domain_name, next) = LabelCodec::decode(message, offset)?;
            wire::take(message, next, ANSWER_FIXED_LEN)?;
            let rd_length = wire::read_u16(message, next + 8)? as usize;
            let r_data = wire::take(message, next + ANSWER_FIXED_LEN, rd_length)?;

            answers.push(AnswerSection {
                domain_name,
                query_type: wire::read_u16(message, next)?,
                query_class: wire::read_u16(message, next + 2)?,
                ttl: wire::read_u32(message, next + 4)?,
                ip_address: dotted_octets(r_data),
            });
            offset = next + ANSWER_FIXED_LEN + rd_length;
        }

        Ok(DecodedMessage {
            id: header.id,
            flags: DnsHeaderFlags::from_u16(header.flags),
            question_count: header.qd_count,
            answer_count: header.an_count,
            authority_count: header.ns_count,
            additional_count: header.ar_count,
            questions,
            answers: (header.an_count > 0).then_some(answers),
        })
    }
}

fn dotted_octets(r_data: &[u8]) -> String {
    r_data
        .iter()
        .map(|octet| octet.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(id: u16, flags: u16, qd: u16, an: u16) -> Vec<u8> {
        HeaderSection {
            id,
            flags,
            qd_count: qd,
            an_count: an,
            ns_count: 0,
            ar_count: 0,
        }
        .to_bytes()
        .to_vec()
    }

    fn push_answer(message: &mut Vec<u8>, name: &[u8], ttl: u32, r_data: &[u8]) {
        message.extend_from_slice(name);
        message.extend_from_slice(&1u16.to_be_bytes());
        message.extend_from_slice(&1u16.to_be_bytes());
        message.extend_from_slice(&ttl.to_be_bytes());
        message.extend_from_slice(&(r_data.len() as u16).to_be_bytes());
        message.extend_from_slice(r_data);
    }

    #[test]
    fn test_dns_header_flags_encode_decode() {
        let flags = DnsHeaderFlags {
            is_response: true,
            opcode: 2,
            is_authoritative: true,
            is_truncated: false,
            recursion_desired: true,
            recursion_available: false,
            reserved: 3,
            response_code: 5,
        };

        assert_eq!(DnsHeaderFlags::from_u16(flags.to_u16()), flags);
    }

    #[test]
    fn test_flags_0x8180() {
        let flags = DnsHeaderFlags::from_u16(0x8180);

        assert!(flags.is_response);
        assert_eq!(flags.opcode, 0);
        assert!(!flags.is_authoritative);
        assert!(!flags.is_truncated);
        assert!(flags.recursion_desired);
        assert!(flags.recursion_available);
        assert_eq!(flags.reserved, 0);
        assert_eq!(flags.response_code, 0);
    }

    #[test]
    fn test_flags_every_field_isolated() {
        let flags = DnsHeaderFlags::from_u16(0b0111_1010_0111_1001);

        assert!(!flags.is_response);
        assert_eq!(flags.opcode, 0b1111);
        assert!(!flags.is_authoritative);
        assert!(flags.is_truncated);
        assert!(!flags.recursion_desired);
        assert!(!flags.recursion_available);
        assert_eq!(flags.reserved, 0b111);
        assert_eq!(flags.response_code, 0b1001);
    }

    #[test]
    fn test_header_round_trip_bytes() {
        let bytes = header(0xBEEF, 0x0100, 1, 2);
        let parsed = HeaderSection::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.id, 0xBEEF);
        assert_eq!(parsed.flags, 0x0100);
        assert_eq!(parsed.qd_count, 1);
        assert_eq!(parsed.an_count, 2);
    }

    #[test]
    fn test_decode_www_example_com_query() {
        let mut message = header(0x1234, 0x0100, 1, 0);
        message.extend_from_slice(&[3, b'w', b'w', b'w']);
        message.extend_from_slice(&[7, b'e', b'x', b'a', b'm', b'p', b'l', b'e']);
        message.extend_from_slice(&[3, b'c', b'o', b'm', 0]);
        message.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);

        let msg = DecodedMessage::decode(&message).unwrap();

        assert_eq!(msg.id, 0x1234);
        assert_eq!(msg.flags.opcode, 0);
        assert!(msg.flags.recursion_desired);
        assert!(!msg.flags.is_response);
        assert_eq!(msg.question_count, 1);
        assert_eq!(
            msg.questions,
            vec![QuestionSection {
                domain_name: vec!["www".into(), "example".into(), "com".into()],
                query_type: 1,
                query_class: 1,
            }]
        );
        assert!(msg.answers.is_none());
    }

    #[test]
    fn test_answers_absent_when_ancount_zero() {
        let mut message = header(1, 0, 1, 0);
        message.extend_from_slice(&[2, b'p', b'c', 0, 0, 1, 0, 1]);

        let msg = DecodedMessage::decode(&message).unwrap();
        let json = serde_json::to_value(&msg).unwrap();

        assert!(msg.answers.is_none());
        assert!(json.get("answers").is_none());
        assert!(json.get("questions").is_some());
    }

    #[test]
    fn test_questions_present_when_empty() {
        let message = header(1, 0, 0, 0);

        let msg = DecodedMessage::decode(&message).unwrap();
        let json = serde_json::to_value(&msg).unwrap();

        assert!(msg.questions.is_empty());
        assert_eq!(json["questions"], serde_json::json!([]));
    }

    #[test]
    fn test_decode_two_answers_with_compressed_names() {
        let mut message = header(0x0042, 0x8000, 1, 2);
        message.extend_from_slice(&[6, b'd', b'c', b'-', b'0', b'0', b'1', 0, 0, 1, 0, 1]);
        push_answer(&mut message, &[0xC0, 0x0C], 30, &[10, 0, 0, 7]);
        push_answer(&mut message, &[0xC0, 0x0C], 30, &[192, 168, 1, 20]);

        let msg = DecodedMessage::decode(&message).unwrap();
        let answers = msg.answers.expect("answers present");

        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].domain_name, msg.questions[0].domain_name);
        assert_eq!(answers[1].domain_name, msg.questions[0].domain_name);
        assert_eq!(answers[0].ip_address, "10.0.0.7");
        assert_eq!(answers[1].ip_address, "192.168.1.20");
        assert_eq!(answers[0].ttl, 30);
    }

    #[test]
    fn test_answer_rdata_rendered_as_octets_regardless_of_type() {
        let mut message = header(7, 0x8000, 0, 1);
        message.extend_from_slice(&[1, b'x', 0]);
        message.extend_from_slice(&28u16.to_be_bytes());
        message.extend_from_slice(&1u16.to_be_bytes());
        message.extend_from_slice(&60u32.to_be_bytes());
        message.extend_from_slice(&6u16.to_be_bytes());
        message.extend_from_slice(&[254, 128, 0, 0, 0, 1]);

        let msg = DecodedMessage::decode(&message).unwrap();
        let answer = &msg.answers.unwrap()[0];

        assert_eq!(answer.query_type, 28);
        assert_eq!(answer.ip_address, "254.128.0.0.0.1");
    }

    #[test]
    fn test_serialized_keys() {
        let mut message = header(9, 0x8180, 0, 1);
        push_answer(&mut message, &[1, b'h', 0], 5, &[127, 0, 0, 1]);

        let json = serde_json::to_value(DecodedMessage::decode(&message).unwrap()).unwrap();

        assert_eq!(json["id"], 9);
        assert_eq!(json["is_response"], true);
        assert_eq!(json["recursion_available"], true);
        assert_eq!(json["answer_count"], 1);
        assert_eq!(json["answers"][0]["domain_name"], serde_json::json!(["h"]));
        assert_eq!(json["answers"][0]["ip_address"], "127.0.0.1");
    }

    #[test]
    fn test_short_header_is_truncated() {
        assert!(matches!(
            DecodedMessage::decode(&[0x12, 0x34, 0x01]),
            Err(DecodeErrors::Truncated { offset: 0, needed: 12, len: 3 })
        ));
    }

    #[test]
    fn test_missing_question_fields_is_truncated() {
        let mut message = header(1, 0, 1, 0);
        message.extend_from_slice(&[2, b'p', b'c', 0, 0]);

        assert!(matches!(
            DecodedMessage::decode(&message),
            Err(DecodeErrors::Truncated { .. })
        ));
    }

    #[test]
    fn test_count_larger_than_payload_is_truncated() {
        let mut message = header(1, 0, 3, 0);
        message.extend_from_slice(&[2, b'p', b'c', 0, 0, 1, 0, 1]);

        assert!(matches!(
            DecodedMessage::decode(&message),
            Err(DecodeErrors::Truncated { .. })
        ));
    }

    #[test]
    fn test_rdata_shorter_than_rdlength_is_truncated() {
        let mut message = header(1, 0x8000, 0, 1);
        message.extend_from_slice(&[1, b'x', 0, 0, 1, 0, 1, 0, 0, 0, 30, 0, 4, 10, 0]);

        assert!(matches!(
            DecodedMessage::decode(&message),
            Err(DecodeErrors::Truncated { needed: 4, .. })
        ));
    }

    #[test]
    fn test_question_self_pointer_is_rejected() {
        let mut message = header(1, 0, 1, 0);
        message.extend_from_slice(&[0xC0, 0x0C, 0, 1, 0, 1]);

        assert!(matches!(
            DecodedMessage::decode(&message),
            Err(DecodeErrors::PointerLoop { offset: 12, target: 12 })
        ));
    }

    #[test]
    fn test_question_reserved_label_is_rejected() {
        let mut message = header(1, 0, 1, 0);
        message.extend_from_slice(&[0x80, b'x', 0, 0, 1, 0, 1]);

        assert!(matches!(
            DecodedMessage::decode(&message),
            Err(DecodeErrors::ReservedLabelType { byte: 0x80, offset: 12 })
        ));
    }

    fn long_name(labels: usize, fill: u8) -> Vec<u8> {
        let mut name = Vec::new();
        for _ in 0..labels {
            name.push(63);
            name.extend_from_slice(&[fill; 63]);
        }
        name
    }

    #[test]
    fn test_pointer_fan_out_stays_within_name_limit() {
        let fan_out: u16 = 2000;
        let mut message = header(7, 0, fan_out + 1, 0);
        message.extend_from_slice(&long_name(3, b'x'));
        message.extend_from_slice(&[0, 0, 1, 0, 1]);
        for _ in 0..fan_out {
            message.extend_from_slice(&[0xC0, 0x0C, 0, 1, 0, 1]);
        }

        let msg = DecodedMessage::decode(&message).unwrap();
        assert_eq!(msg.questions.len(), fan_out as usize + 1);
        for question in &msg.questions {
            let encoded: usize = question.domain_name.iter().map(|l| l.len() + 1).sum();
            assert!(encoded < 255);
        }
    }

    #[test]
    fn test_pointer_fan_out_past_name_limit_is_rejected() {
        let mut message = header(7, 0, 3, 0);
        message.extend_from_slice(&long_name(3, b'x'));
        message.extend_from_slice(&[0, 0, 1, 0, 1]);
        let second = message.len();
        message.extend_from_slice(&long_name(1, b'y'));
        message.extend_from_slice(&[0xC0, 0x0C, 0, 1, 0, 1]);
        message.extend_from_slice(&[0xC0, 0x0C, 0, 1, 0, 1]);

        assert_eq!(
            DecodedMessage::decode(&message),
            Err(DecodeErrors::NameTooLong { offset: second })
        );
    }
}
