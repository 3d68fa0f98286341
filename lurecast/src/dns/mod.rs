//! # Lurecast DNS/LLMNR wire codec
//!
//! LLMNR (RFC 4795) carries DNS-format messages over UDP multicast on
//! `224.0.0.252:5355`. This module holds everything needed to read what
//! lateral-movement tooling sends there and to write the decoy's own
//! presence queries. It performs no I/O and needs no async runtime.
//!
//! ## Modules
//!
//! - `compressor` - label sequences and compression pointers ([`compressor::LabelCodec`]).
//! - `message` - header flags and full inbound message decoding ([`message::DecodedMessage`]).
//! - `query` - the outbound presence query ([`query::QueryEncoder`]).
//!
//! ## Errors
//!
//! - [`DecodeErrors`] - malformed or truncated inbound datagram. Always
//!   scoped to one datagram.
//! - [`EncodeErrors`] - a configured name that cannot be put on the wire.
use std::net::Ipv4Addr;

pub mod compressor;
mod errors;
pub mod message;
pub mod query;
mod wire;

pub use self::errors::{DecodeErrors, EncodeErrors};

/// LLMNR IPv4 multicast group.
pub const LLMNR_MULTICAST_V4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 252);
/// LLMNR UDP port.
pub const LLMNR_PORT: u16 = 5355;
