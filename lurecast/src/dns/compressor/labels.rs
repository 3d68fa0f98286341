//! Domain name label codec (RFC1035 §3.1 and §4.1.4)
//!
//! A domain name travels on the wire as a sequence of labels, each one a
//! length octet followed by that many octets, terminated by the zero-length
//! root label. To save space a name, or any suffix of it, may instead end in
//! a two-octet pointer to an earlier occurrence inside the same message.
//!
//! [`LabelCodec::decode`] follows those pointers, including chains where a
//! pointed-to name ends in yet another pointer. Inbound datagrams are
//! attacker controlled, so pointer following is iterative and bounded: a
//! target that was already visited for the current name, or a chain longer
//! than [`MAX_POINTER_HOPS`], is reported as [`DecodeErrors::PointerLoop`].
//! The decoded name is held to [`MAX_NAME_LEN`] encoded bytes, counting
//! labels reached through pointers, so a short pointer cannot expand into
//! an oversized name.
//!
//! [`LabelCodec::encode`] only ever writes literal labels. Outbound queries
//! carry a single name, so there is nothing to compress.
//!
//! # Example
//!
//! ```rust
//! use lurecast::dns::compressor::LabelCodec;
//!
//! let wire = LabelCodec::encode("fileserver.corp").unwrap();
//! let (labels, next) = LabelCodec::decode(&wire, 0).unwrap();
//!
//! assert_eq!(labels, vec!["fileserver", "corp"]);
//! assert_eq!(next, wire.len());
//! ```
use std::collections::HashSet;

use crate::dns::{DecodeErrors, EncodeErrors, wire};

/// Longest label allowed by RFC1035.
pub const MAX_LABEL_LEN: usize = 63;
/// Longest encoded name allowed by RFC1035, root label included.
pub const MAX_NAME_LEN: usize = 255;
/// Upper bound on compression pointers followed while decoding one name.
pub const MAX_POINTER_HOPS: usize = 128;

const POINTER_MASK: u8 = 0b1100_0000;
const OFFSET_MASK: u16 = 0x3FFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelCodec;

impl LabelCodec {
    /// Decodes the name starting at `offset`.
    ///
    /// Returns the labels in order and the offset of the first byte after
    /// the name as it appears at `offset`. A pointer is a 2-byte terminal
    /// construct, so once one is met the returned offset is fixed at the
    /// pointer position + 2, however many labels the target resolves to.
    ///
    /// The pointer takes the form of a two octet sequence:
    ///
    ///   +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    ///   | 1  1|                OFFSET                   |
    ///   +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
    ///
    /// The `01` and `10` prefixes are reserved and rejected. A name longer
    /// than [`MAX_NAME_LEN`] once resolved is [`DecodeErrors::NameTooLong`].
    pub fn decode(message: &[u8], offset: usize) -> Result<(Vec<String>, usize), DecodeErrors> {
        let mut labels = Vec::new();
        let mut cursor = offset;
        let mut resume_at: Option<usize> = None;
        let mut visited: HashSet<usize> = HashSet::new();
        // root label included
        let mut name_len = 1;

        loop {
            let length = wire::read_u8(message, cursor)?;

            match length & POINTER_MASK {
                POINTER_MASK => {
                    let target = (wire::read_u16(message, cursor)? & OFFSET_MASK) as usize;

                    if target >= message.len() {
                        return Err(DecodeErrors::PointerOutOfRange {
                            offset: cursor,
                            target,
                            len: message.len(),
                        });
                    }
                    if visited.len() >= MAX_POINTER_HOPS || !visited.insert(target) {
                        return Err(DecodeErrors::PointerLoop {
                            offset: cursor,
                            target,
                        });
                    }

                    resume_at.get_or_insert(cursor + 2);
                    cursor = target;
                }
                0 => {
                    cursor += 1;

                    if length == 0 {
                        return Ok((labels, resume_at.unwrap_or(cursor)));
                    }

                    name_len += length as usize + 1;
                    if name_len > MAX_NAME_LEN {
                        return Err(DecodeErrors::NameTooLong { offset });
                    }

                    let raw = wire::take(message, cursor, length as usize)?;
                    labels.push(label_text(raw));
                    cursor += length as usize;
                }
                _ => {
                    return Err(DecodeErrors::ReservedLabelType {
                        byte: length,
                        offset: cursor,
                    });
                }
            }
        }
    }

    /// Encodes `name` as literal labels followed by the root label.
    ///
    /// Empty components are skipped, so `"host."`, `".host"` and `"host"`
    /// encode identically, and `""` or `"."` encode to the bare root label.
    pub fn encode(name: &str) -> Result<Vec<u8>, EncodeErrors> {
        let mut message = Vec::with_capacity(name.len() + 2);
        Self::encode_into(name, &mut message)?;
        Ok(message)
    }

    /// Appends the encoded form of `name` to `message`.
    ///
    /// On error `message` is left unchanged.
    pub fn encode_into(name: &str, message: &mut Vec<u8>) -> Result<(), EncodeErrors> {
        let start = message.len();

        for label in name.split('.').filter(|label| !label.is_empty()) {
            if label.len() > MAX_LABEL_LEN {
                message.truncate(start);
                return Err(EncodeErrors::LabelTooLong(label.to_string()));
            }
            message.push(label.len() as u8);
            message.extend_from_slice(label.as_bytes());
        }
        message.push(0);

        if message.len() - start > MAX_NAME_LEN {
            message.truncate(start);
            return Err(EncodeErrors::NameTooLong(name.to_string()));
        }
        Ok(())
    }
}

/// UTF-8 text of a label, or its escaped byte rendering (`b'\xff...'`).
fn label_text(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(text) => text.to_string(),
        Err(_) => bytes_literal(raw),
    }
}

/// Renders `raw` as a bytes literal. Single quotes unless the label holds a
/// `'` and no `"`.
fn bytes_literal(raw: &[u8]) -> String {
    let quote = if raw.contains(&b'\'') && !raw.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };

    let mut out = String::with_capacity(raw.len() + 3);
    out.push('b');
    out.push(quote as char);
    for &byte in raw {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\t' => out.push_str("\\t"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            _ if byte == quote => {
                out.push('\\');
                out.push(byte as char);
            }
            0x20..=0x7E => out.push(byte as char),
            _ => out.push_str(&format!("\\x{byte:02x}")),
        }
    }
    out.push(quote as char);
    out
}
