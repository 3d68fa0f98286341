//! # Capture sink
//!
//! Turns every datagram that reaches the honeypot into exactly one
//! [`CaptureEvent`] for the logging collaborator ([`EventLogger`]):
//!
//! ```text
//! datagram + (local, peer) ──► DecodedMessage::decode ──┬─ Ok  ──► "llmnr.data"
//!                                                        └─ Err ──► "llmnr.parse_error"
//!                                                                        │
//!                                                            EventLogger::log(&event)
//! ```
//!
//! The sink sits directly on attacker-controlled input. Decode failures end
//! here as a parse-failure event carrying the peer address and the decoder's
//! reason; nothing propagates back into the receive loop.
//!
//! ## Loggers
//!
//! - [`TracingLogger`] - events as `tracing` records (JSON payload field).
//! - [`ChannelLogger`] (`tokio-dep`) - events formatted by a [`LogFormatter`]
//!   and published on a broadcast channel for any number of consumers.
//!
//! ## Formatters
//!
//! - [`StructuredFormatter`] - the [`CaptureEvent`] itself.
//! - [`JsonFormatter`] - one JSON object per event:
//!
//! ```text
//! {"event":"llmnr.data","protocol":"llmnr","kind":"data",
//!  "local_ip":"224.0.0.252","local_port":5355,"peer_ip":"10.0.4.17","peer_port":61022,
//!  "query":{"id":4660,"is_response":false,"opcode":0,...,"questions":[...]}}
//! ```
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::debug;

use crate::dns::message::DecodedMessage;

mod event;
pub use event::{CaptureEvent, EventKind, EventPayload, ParseFailure, TransportInfo};
pub mod formatter;
pub use formatter::{JsonFormatter, LogFormatter, StructuredFormatter};
mod logger;
pub use logger::{EventLogger, TracingLogger};
#[cfg(feature = "tokio-dep")]
pub use logger::{ChannelLogger, EventStream};

/// Protocol name stamped on LLMNR capture events.
pub const LLMNR_PROTOCOL: &str = "llmnr";

/// Decodes inbound datagrams and hands the resulting events to a logger.
#[derive(Clone)]
pub struct CaptureSink {
    protocol: &'static str,
    logger: Arc<dyn EventLogger>,
}

impl CaptureSink {
    pub fn new(protocol: &'static str, logger: Arc<dyn EventLogger>) -> Self {
        Self { protocol, logger }
    }

    pub fn protocol(&self) -> &'static str {
        self.protocol
    }

    /// Decodes `data` received on `local` from `peer` and logs one event.
    ///
    /// Never fails; returns the kind of event that was emitted.
    pub fn on_datagram(&self, data: &[u8], local: SocketAddr, peer: SocketAddr) -> EventKind {
        let transport = TransportInfo::new(local, peer);

        let event = match DecodedMessage::decode(data) {
            Ok(message) => CaptureEvent::data(self.protocol, transport, message),
            Err(e) => {
                debug!(%peer, len = data.len(), error = %e, "undecodable datagram");
                CaptureEvent::parse_failure(
                    self.protocol,
                    transport,
                    ParseFailure {
                        peer_address: peer.ip(),
                        reason: e.to_string(),
                        length: data.len(),
                    },
                )
            }
        };

        let kind = event.kind;
        self.logger.log(&event);
        kind
    }
}
