use serde::Serialize;
use std::net::{IpAddr, SocketAddr};

use crate::dns::message::DecodedMessage;

/// What a capture event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A datagram that decoded cleanly.
    Data,
    /// A datagram the decoder rejected.
    ParseError,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Data => "data",
            EventKind::ParseError => "parse_error",
        }
    }
}

/// Addressing of a received datagram: where it arrived and who sent it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransportInfo {
    pub local_ip: IpAddr,
    pub local_port: u16,
    pub peer_ip: IpAddr,
    pub peer_port: u16,
}

impl TransportInfo {
    pub fn new(local: SocketAddr, peer: SocketAddr) -> Self {
        Self {
            local_ip: local.ip(),
            local_port: local.port(),
            peer_ip: peer.ip(),
            peer_port: peer.port(),
        }
    }
}

/// Diagnostic for a datagram that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseFailure {
    pub peer_address: IpAddr,
    pub reason: String,
    /// Size of the offending datagram in bytes.
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPayload {
    Query(DecodedMessage),
    ParseFailure(ParseFailure),
}

/// A record handed to the logging collaborator, one per received datagram.
///
/// Serializes flat: `event`, `protocol`, `kind`, the four transport fields,
/// then either a `query` or a `parse_failure` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureEvent {
    /// `"<protocol>.<kind>"`, e.g. `"llmnr.data"`.
    pub event: String,
    pub protocol: &'static str,
    pub kind: EventKind,
    #[serde(flatten)]
    pub transport: TransportInfo,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl CaptureEvent {
    pub fn data(protocol: &'static str, transport: TransportInfo, message: DecodedMessage) -> Self {
        Self::new(protocol, EventKind::Data, transport, EventPayload::Query(message))
    }

    pub fn parse_failure(
        protocol: &'static str,
        transport: TransportInfo,
        failure: ParseFailure,
    ) -> Self {
        Self::new(
            protocol,
            EventKind::ParseError,
            transport,
            EventPayload::ParseFailure(failure),
        )
    }

    fn new(
        protocol: &'static str,
        kind: EventKind,
        transport: TransportInfo,
        payload: EventPayload,
    ) -> Self {
        Self {
            event: format!("{}.{}", protocol, kind.as_str()),
            protocol,
            kind,
            transport,
            payload,
        }
    }
}
