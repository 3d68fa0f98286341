//! # Presence broadcast
//!
//! A live Windows host periodically asks the segment who owns its own name.
//! The decoy imitates that: [`BroadcastScheduler`] sends an LLMNR query for
//! the configured machine name to `224.0.0.252:5355` right away, then again
//! after every `interval ± jitter` pause, until it is cancelled.
//!
//! ```text
//!  start ──► send ──► sleep(next_delay) ──► send ──► sleep ──► ...
//!              │              │
//!              │              └── token cancelled ──► Stopped (Ok(Cancelled))
//!              └── transport closed ──► Stopped (Err(TransportClosed))
//! ```
//!
//! ## Failure handling
//!
//! Every send error is classified by [`SendErrors`]:
//!
//! - `Transient` (unreachable network, interface down, buffer full) is
//!   logged at `WARN` and the next cycle happens on schedule.
//! - `Closed` (`NotConnected`, `BrokenPipe`, `ConnectionAborted`, `EBADF`)
//!   ends the run with [`BroadcastErrors::TransportClosed`].
//!
//! Anything else, including a panic in the loop, is not absorbed: it
//! resumes on whoever calls [`BroadcastScheduler::stop`].
//!
//! ## Configuration
//!
//! [`BroadcastConfig`] is built and validated once. The query bytes are
//! encoded at that point and reused for every send.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt, io};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::dns::EncodeErrors;
use crate::dns::query::QueryEncoder;

mod delay;
pub use delay::next_delay;
mod scheduler;
pub use scheduler::{BroadcastExit, BroadcastScheduler, BroadcastState};
mod sender;
pub use sender::{DatagramSender, SendErrors};
pub(crate) use sender::is_transport_closed;

/// Immutable settings of one presence broadcast.
#[derive(Clone, PartialEq, Eq)]
pub struct BroadcastConfig {
    machine_name: String,
    interval: Duration,
    jitter: Duration,
    query: Vec<u8>,
}

impl BroadcastConfig {
    /// Validates `machine_name` by encoding the presence query for it.
    ///
    /// # Errors
    /// Returns [`EncodeErrors`] if the name cannot be represented on the wire.
    pub fn new(
        machine_name: impl Into<String>,
        interval: Duration,
        jitter: Duration,
    ) -> Result<Self, EncodeErrors> {
        let machine_name = machine_name.into();
        let query = QueryEncoder::encode(&machine_name)?;

        Ok(Self {
            machine_name,
            interval,
            jitter,
            query,
        })
    }

    pub fn machine_name(&self) -> &str {
        &self.machine_name
    }

    /// Base pause between two queries.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Maximum deviation applied to `interval`, in both directions.
    pub fn jitter(&self) -> Duration {
        self.jitter
    }

    /// The encoded query datagram.
    pub fn query(&self) -> &[u8] {
        &self.query
    }
}

impl fmt::Debug for BroadcastConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastConfig")
            .field("machine_name", &self.machine_name)
            .field("interval", &self.interval)
            .field("jitter", &self.jitter)
            .field("query_len", &self.query.len())
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum BroadcastErrors {
    #[error("presence broadcast is already running")]
    AlreadyRunning,
    #[error("transport closed during presence broadcast: {0}")]
    TransportClosed(#[source] io::Error),
}
