//! # Lurecast
//!
//! An LLMNR deception engine. A decoy host sits on a network segment and
//! waits for the name-resolution traffic that lateral-movement tooling
//! produces (LLMNR poisoners, relay kits, discovery scanners). Every datagram
//! sent to the LLMNR group is decoded and logged, and the decoy periodically
//! announces a fake machine name so it looks like a live workstation.
//!
//! The engine never answers and never resolves anything: it observes and
//! impersonates.
//!
//! ## Features
//!
//! (always available)
//! - **DNS/LLMNR wire codec** - RFC1035 header, label sequences with
//!   compression pointers, full inbound message decoding
//! - **Presence query encoder** - the decoy's outbound LLMNR question
//! - **Capture events** - one structured record per inbound datagram, with
//!   JSON and structured formatters
//! - **Configuration** - TOML file plus command-line overrides
//!
//! ("tokio-dep" feature, on by default)
//! - **Presence broadcast** - cancellable, jittered periodic send loop
//! - **LLMNR module** - multicast socket, receive loop and broadcast task
//!   joined at shutdown
//! - **Channel logger** - capture events streamed to any number of consumers
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! lurecast = { version = "0.1.0" }
//! lurecast = { version = "0.1.0", default-features = false }
//! ```
//!
//! ### Decoding a captured datagram
//!
//! ```rust
//! use lurecast::dns::message::DecodedMessage;
//! use lurecast::dns::query::QueryEncoder;
//!
//! let datagram = QueryEncoder::encode("wpad").unwrap();
//! let msg = DecodedMessage::decode(&datagram).unwrap();
//!
//! assert_eq!(msg.questions[0].domain_name, vec!["wpad"]);
//! assert!(!msg.flags.is_response);
//! ```
//!
//! ### Running the decoy
//!
//! ```rust,no_run
//! # #[cfg(feature = "tokio-dep")]
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use lurecast::capture::TracingLogger;
//! use lurecast::config::{CliOverrides, Config};
//! use lurecast::service::LlmnrHoneypot;
//!
//! let config = Config::load(None, CliOverrides::default())?;
//! config.validate()?;
//!
//! let shutdown = CancellationToken::new();
//! let honeypot = LlmnrHoneypot::new(config.llmnr, Arc::new(TracingLogger))?;
//! honeypot.run(shutdown.clone()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! inbound datagram ──► dns::message ──► capture::CaptureSink ──► EventLogger
//! timer ──► broadcast::BroadcastScheduler ──► dns::query bytes ──► socket
//! ```
//!
//! - **`dns`** - wire codec, no I/O
//! - **`capture`** - datagram to event, loggers and formatters
//! - **`broadcast`** - presence broadcast scheduler
//! - **`service`** - the LLMNR module wiring both halves to a socket
//! - **`config`** - configuration loading and validation
//!
//! ## Error Handling
//!
//! Nothing an attacker sends can stop the module: decode errors end as a
//! `llmnr.parse_error` event and transient send failures are retried on the
//! next cycle. Only a closed socket ends the module, reported as an `Err`.
//!
//! ## License
//!
//! This project is licensed under the MIT License.

pub mod capture;

pub mod config;

pub mod dns;

cfg_if::cfg_if! {
    if #[cfg(feature = "tokio-dep")] {
        pub mod broadcast;
        pub mod service;
    }
}
