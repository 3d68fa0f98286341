use super::*;
use tracing::{info, warn};

/// The logging collaborator that receives every capture event.
///
/// Implementations must not block: `log` is called inline on the receive
/// path, once per datagram.
pub trait EventLogger: Send + Sync + 'static {
    fn log(&self, event: &CaptureEvent);
}

/// Emits events through `tracing`, rendered as JSON in the `payload` field.
///
/// Decoded datagrams are logged at `INFO`, parse failures at `WARN`, both
/// under the `lurecast::events` target so they can be filtered separately
/// from operational logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl EventLogger for TracingLogger {
    fn log(&self, event: &CaptureEvent) {
        let payload = JsonFormatter.format(event);
        let peer = SocketAddr::new(event.transport.peer_ip, event.transport.peer_port);

        match event.kind {
            EventKind::Data => {
                info!(target: "lurecast::events", event = %event.event, %peer, %payload, "datagram captured");
            }
            EventKind::ParseError => {
                warn!(target: "lurecast::events", event = %event.event, %peer, %payload, "datagram rejected");
            }
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "tokio-dep")] {
        use parking_lot::Mutex;
        use tokio::sync::broadcast;
        use tokio_stream::{StreamExt, wrappers::BroadcastStream};

        /// Publishes formatted events on a `tokio::broadcast` channel.
        ///
        /// Any number of consumers can [`subscribe`](Self::subscribe). A
        /// consumer that falls behind by more than the channel capacity skips
        /// the events it missed. [`close`](Self::close) ends every stream once
        /// the buffered events are drained.
        ///
        /// # Example
        /// ```rust,no_run
        /// use std::sync::Arc;
        /// use lurecast::capture::{CaptureSink, ChannelLogger, JsonFormatter};
        ///
        /// # async fn run() {
        /// let logger = Arc::new(ChannelLogger::<JsonFormatter>::new(1024));
        /// let mut events = logger.subscribe().unwrap();
        /// let sink = CaptureSink::new("llmnr", logger.clone());
        ///
        /// tokio::spawn(async move {
        ///     while let Some(line) = events.next().await {
        ///         println!("{line}");
        ///     }
        /// });
        /// # }
        /// ```
        pub struct ChannelLogger<F>
        where
            F: LogFormatter,
        {
            sender: Mutex<Option<broadcast::Sender<F::Output>>>,
            formatter: F,
        }

        impl<F> ChannelLogger<F>
        where
            F: LogFormatter + Default,
        {
            pub fn new(capacity: usize) -> Self {
                let (sender, _) = broadcast::channel::<F::Output>(capacity);

                Self {
                    sender: Mutex::new(Some(sender)),
                    formatter: F::default(),
                }
            }
        }

        impl<F> ChannelLogger<F>
        where
            F: LogFormatter,
        {
            /// Returns a stream of formatted events, or `None` once closed.
            pub fn subscribe(&self) -> Option<EventStream<F::Output>> {
                self.sender
                    .lock()
                    .as_ref()
                    .map(|sender| EventStream::new(sender.subscribe()))
            }

            /// Drops the sender; streams end after draining what they hold.
            pub fn close(&self) {
                self.sender.lock().take();
            }
        }

        impl<F> EventLogger for ChannelLogger<F>
        where
            F: LogFormatter,
        {
            fn log(&self, event: &CaptureEvent) {
                if let Some(sender) = self.sender.lock().as_ref() {
                    // No subscribers is not an error for a honeypot.
                    sender.send(self.formatter.format(event)).ok();
                }
            }
        }

        /// Stream of events returned by [`ChannelLogger::subscribe`].
        pub struct EventStream<T> {
            inner: BroadcastStream<T>,
        }

        impl<T: Clone + Send + Sync + 'static> EventStream<T> {
            pub fn new(rx: broadcast::Receiver<T>) -> Self {
                Self {
                    inner: BroadcastStream::new(rx),
                }
            }

            /// Next event, skipping over any lagged gap. `None` once closed.
            pub async fn next(&mut self) -> Option<T> {
                while let Some(msg) = self.inner.next().await {
                    match msg {
                        Ok(val) => return Some(val),
                        Err(_) => continue,
                    }
                }
                None
            }
        }
    }
}
