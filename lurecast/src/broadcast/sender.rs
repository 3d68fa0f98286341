use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::UdpSocket;

/// `EBADF` on every unix the crate targets.
#[cfg(unix)]
const EBADF: i32 = 9;

/// Outbound half of a datagram transport.
///
/// The scheduler only ever writes; implementing this for a test double is
/// enough to drive it without a network.
#[async_trait]
pub trait DatagramSender: Send + Sync + 'static {
    async fn send_to(&self, datagram: &[u8], target: SocketAddr) -> io::Result<usize>;
}

#[async_trait]
impl DatagramSender for UdpSocket {
    async fn send_to(&self, datagram: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, datagram, target).await
    }
}

/// A failed send, split by whether the transport can still be used.
#[derive(Debug, Error)]
pub enum SendErrors {
    /// Retried on the next scheduled cycle.
    #[error("transient send failure: {0}")]
    Transient(#[source] io::Error),
    /// The socket is gone; nothing more can be sent on it.
    #[error("transport closed: {0}")]
    Closed(#[source] io::Error),
}

impl SendErrors {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SendErrors::Closed(_))
    }
}

impl From<io::Error> for SendErrors {
    fn from(err: io::Error) -> Self {
        if is_transport_closed(&err) {
            SendErrors::Closed(err)
        } else {
            SendErrors::Transient(err)
        }
    }
}

/// Whether `err` means the socket can no longer be used.
pub(crate) fn is_transport_closed(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::NotConnected | io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionAborted
    ) {
        return true;
    }

    #[cfg(unix)]
    if err.raw_os_error() == Some(EBADF) {
        return true;
    }

    false
}
