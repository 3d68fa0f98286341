//! # LLMNR honeypot module
//!
//! Runs the two halves of the decoy on one UDP socket:
//!
//! - a receive loop that hands every datagram to a [`CaptureSink`],
//! - a [`BroadcastScheduler`] announcing the decoy's machine name.
//!
//! The socket is bound to `(bind_address, port)` with address reuse, joined
//! to `224.0.0.252` on the configured interface, with multicast loopback off
//! so the decoy does not capture its own presence queries.
//!
//! Shutdown is driven by a [`CancellationToken`]. The module first waits for
//! the broadcast task to finish, then leaves the receive loop and only then
//! drops the socket, so no send can race the close.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use lurecast::capture::TracingLogger;
//! use lurecast::config::LlmnrConfig;
//! use lurecast::service::LlmnrHoneypot;
//!
//! # async fn run() -> Result<(), lurecast::service::ServiceErrors> {
//! let honeypot = LlmnrHoneypot::new(LlmnrConfig::default(), Arc::new(TracingLogger))?;
//! let shutdown = CancellationToken::new();
//!
//! honeypot.run(shutdown.clone()).await?;
//! # Ok(())
//! # }
//! ```
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::broadcast::{
    BroadcastConfig, BroadcastErrors, BroadcastScheduler, DatagramSender, is_transport_closed,
};
use crate::capture::{CaptureSink, EventLogger, LLMNR_PROTOCOL};
use crate::config::{ConfigErrors, LlmnrConfig};
use crate::dns::LLMNR_MULTICAST_V4;

/// Largest UDP payload; anything longer is truncated by the kernel.
const MAX_DATAGRAM: usize = 65_535;

#[derive(Debug, Error)]
pub enum ServiceErrors {
    #[error("invalid LLMNR configuration: {0}")]
    Config(#[from] ConfigErrors),
    #[error("failed to open LLMNR socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Broadcast(#[from] BroadcastErrors),
    #[error("LLMNR socket closed: {0}")]
    ReceiveClosed(#[source] io::Error),
}

/// The LLMNR decoy: capture plus presence broadcast.
pub struct LlmnrHoneypot {
    config: LlmnrConfig,
    broadcast: BroadcastConfig,
    sink: CaptureSink,
}

impl LlmnrHoneypot {
    /// Checks the addresses and encodes the presence query up front.
    pub fn new(config: LlmnrConfig, logger: Arc<dyn EventLogger>) -> Result<Self, ServiceErrors> {
        config.bind_ip()?;
        config.interface_ip()?;
        let broadcast = config.broadcast_config()?;

        Ok(Self {
            config,
            broadcast,
            sink: CaptureSink::new(LLMNR_PROTOCOL, logger),
        })
    }

    pub fn config(&self) -> &LlmnrConfig {
        &self.config
    }

    /// Opens the multicast socket and serves until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ServiceErrors> {
        let bind = SocketAddrV4::new(self.config.bind_ip()?, self.config.port);
        let interface = self.config.interface_ip()?;

        let socket = create_multicast_socket(bind, interface)
            .and_then(UdpSocket::from_std)
            .map_err(|source| ServiceErrors::Bind {
                addr: SocketAddr::V4(bind),
                source,
            })?;

        info!(
            bind_address = %bind,
            group = %LLMNR_MULTICAST_V4,
            interface = %interface,
            "LLMNR module listening"
        );

        let target = SocketAddr::from((LLMNR_MULTICAST_V4, self.config.port));
        self.serve(Arc::new(socket), target, shutdown).await
    }

    /// Serves on an already opened socket, sending presence queries to
    /// `broadcast_target`.
    ///
    /// # Errors
    /// - [`ServiceErrors::Broadcast`] if the broadcast ended on a closed
    ///   transport.
    /// - [`ServiceErrors::ReceiveClosed`] if the socket stopped delivering.
    pub async fn serve(
        self,
        socket: Arc<UdpSocket>,
        broadcast_target: SocketAddr,
        shutdown: CancellationToken,
    ) -> Result<(), ServiceErrors> {
        let sender: Arc<dyn DatagramSender> = socket.clone();
        self.serve_with(sender, socket, broadcast_target, shutdown).await
    }

    /// Like [`serve`](Self::serve), with presence queries going out through
    /// `sender` while datagrams are read from `socket`.
    pub async fn serve_with(
        self,
        sender: Arc<dyn DatagramSender>,
        socket: Arc<UdpSocket>,
        broadcast_target: SocketAddr,
        shutdown: CancellationToken,
    ) -> Result<(), ServiceErrors> {
        let local = socket.local_addr().map_err(ServiceErrors::ReceiveClosed)?;

        let scheduler = BroadcastScheduler::new(self.broadcast, sender, broadcast_target);
        scheduler.start(&shutdown)?;

        let mut buf = vec![0u8; MAX_DATAGRAM];

        let received: Result<(), ServiceErrors> = loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break Ok(()),
                _ = scheduler.finished() => {
                    break scheduler.stop().await.map(|_| ()).map_err(ServiceErrors::from);
                }
                res = socket.recv_from(&mut buf) => match res {
                    Ok((len, peer)) => {
                        self.sink.on_datagram(&buf[..len], local, peer);
                    }
                    Err(e) if is_transport_closed(&e) => {
                        error!(%local, error = %e, "LLMNR socket closed");
                        break Err(ServiceErrors::ReceiveClosed(e));
                    }
                    Err(e) => {
                        warn!(%local, error = %e, "LLMNR receive failed");
                    }
                },
            }
        };

        let stopped = scheduler.stop().await;
        drop(scheduler);
        drop(socket);
        debug!(%local, "LLMNR socket released");

        match (received, stopped) {
            (Err(e), _) => Err(e),
            (Ok(()), Err(e)) => Err(e.into()),
            (Ok(()), Ok(_)) => {
                info!(%local, "LLMNR module stopped");
                Ok(())
            }
        }
    }
}

/// Creates a non-blocking UDP socket bound to `bind` and joined to the
/// LLMNR group on `interface`.
pub fn create_multicast_socket(
    bind: SocketAddrV4,
    interface: Ipv4Addr,
) -> io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddr::V4(bind).into())?;
    socket.join_multicast_v4(&LLMNR_MULTICAST_V4, &interface)?;
    socket.set_multicast_loop_v4(false)?;
    socket.set_multicast_if_v4(&interface)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}
