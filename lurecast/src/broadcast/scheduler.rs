use super::*;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::panic;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle of a [`BroadcastScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastState {
    Running,
    Stopped,
}

/// How a broadcast run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastExit {
    /// The cancellation token fired.
    Cancelled,
    /// [`stop`](BroadcastScheduler::stop) was called on a scheduler that
    /// was never started.
    NotStarted,
}

type BroadcastOutcome = Result<BroadcastExit, BroadcastErrors>;

struct RunningTask {
    token: CancellationToken,
    /// Cancelled by the task itself when it exits, for any reason.
    done: CancellationToken,
    handle: JoinHandle<BroadcastOutcome>,
}

/// Periodically sends the decoy's presence query to a target address.
///
/// One query goes out as soon as the scheduler starts, then one after every
/// [`next_delay`] pause. The loop ends when its cancellation token fires or
/// when the transport reports it is closed. Transient send failures are
/// logged and the next cycle proceeds on schedule.
///
/// # Example
/// ```rust,no_run
/// use std::{sync::Arc, time::Duration};
/// use tokio::net::UdpSocket;
/// use tokio_util::sync::CancellationToken;
/// use lurecast::broadcast::{BroadcastConfig, BroadcastScheduler};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
/// let config = BroadcastConfig::new(
///     "FILESRV02",
///     Duration::from_secs(7200),
///     Duration::from_secs(1200),
/// )?;
///
/// let scheduler = BroadcastScheduler::new(config, socket, "224.0.0.252:5355".parse()?);
/// let shutdown = CancellationToken::new();
/// scheduler.start(&shutdown)?;
///
/// // ...
/// scheduler.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct BroadcastScheduler {
    config: Arc<BroadcastConfig>,
    sender: Arc<dyn DatagramSender>,
    target: SocketAddr,
    task: Mutex<Option<RunningTask>>,
}

impl BroadcastScheduler {
    pub fn new(config: BroadcastConfig, sender: Arc<dyn DatagramSender>, target: SocketAddr) -> Self {
        Self {
            config: Arc::new(config),
            sender,
            target,
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BroadcastConfig {
        &self.config
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn state(&self) -> BroadcastState {
        match self.task.lock().as_ref() {
            Some(task) if !task.done.is_cancelled() => BroadcastState::Running,
            _ => BroadcastState::Stopped,
        }
    }

    /// Spawns the send loop on the current runtime.
    ///
    /// The loop observes a child of `shutdown`, so cancelling the caller's
    /// token stops it as well. A previous run that already ended on its own
    /// and was never [`stop`](Self::stop)ped is discarded.
    ///
    /// # Errors
    /// [`BroadcastErrors::AlreadyRunning`] if a run is still in progress.
    pub fn start(&self, shutdown: &CancellationToken) -> Result<(), BroadcastErrors> {
        let mut task = self.task.lock();

        if let Some(previous) = task.as_ref() {
            if !previous.done.is_cancelled() {
                return Err(BroadcastErrors::AlreadyRunning);
            }
            debug!("discarding finished broadcast run");
        }

        let token = shutdown.child_token();
        let done = CancellationToken::new();

        let handle = tokio::spawn(run(
            self.config.clone(),
            self.sender.clone(),
            self.target,
            token.clone(),
            done.clone(),
        ));

        *task = Some(RunningTask {
            token,
            done,
            handle,
        });

        Ok(())
    }

    /// Resolves once the current run has ended, whether cancelled, closed
    /// or panicked. Pending forever if the scheduler was never started.
    pub async fn finished(&self) {
        let done = self.task.lock().as_ref().map(|task| task.done.clone());

        match done {
            Some(done) => done.cancelled().await,
            None => std::future::pending().await,
        }
    }

    /// Cancels the run and waits for the task to complete.
    ///
    /// Once this returns no further datagram will be sent, so the transport
    /// can be closed. A panic inside the send loop resumes on the caller.
    ///
    /// # Errors
    /// [`BroadcastErrors::TransportClosed`] if the run had already ended on a
    /// closed transport.
    pub async fn stop(&self) -> Result<BroadcastExit, BroadcastErrors> {
        let task = self.task.lock().take();
        let Some(task) = task else {
            return Ok(BroadcastExit::NotStarted);
        };

        task.token.cancel();

        match task.handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
            Err(_) => Ok(BroadcastExit::Cancelled),
        }
    }
}

async fn run(
    config: Arc<BroadcastConfig>,
    sender: Arc<dyn DatagramSender>,
    target: SocketAddr,
    token: CancellationToken,
    done: CancellationToken,
) -> BroadcastOutcome {
    let _done = done.drop_guard();
    let mut rng = SmallRng::from_rng(&mut rand::rng());

    info!(
        machine_name = config.machine_name(),
        %target,
        interval_secs = config.interval().as_secs(),
        jitter_secs = config.jitter().as_secs(),
        "presence broadcast started"
    );

    loop {
        if token.is_cancelled() {
            break;
        }

        match sender.send_to(config.query(), target).await.map_err(SendErrors::from) {
            Ok(_) => debug!(%target, "presence query sent"),
            Err(SendErrors::Transient(e)) => {
                warn!(%target, error = %e, "presence query failed, retrying next cycle");
            }
            Err(SendErrors::Closed(e)) => {
                error!(%target, error = %e, "transport closed, presence broadcast stopped");
                return Err(BroadcastErrors::TransportClosed(e));
            }
        }

        let delay = next_delay(config.interval(), config.jitter(), &mut rng);
        debug!(delay_secs = delay.as_secs(), "next presence query scheduled");

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    info!("presence broadcast cancelled");
    Ok(BroadcastExit::Cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io;
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Default)]
    struct MockSender {
        sent: Mutex<Vec<(Instant, Vec<u8>, SocketAddr)>>,
        failures: Mutex<VecDeque<io::ErrorKind>>,
    }

    impl MockSender {
        fn failing(kinds: &[io::ErrorKind]) -> Self {
            Self {
                failures: Mutex::new(kinds.iter().copied().collect()),
                ..Default::default()
            }
        }

        fn count(&self) -> usize {
            self.sent.lock().len()
        }
    }

    #[async_trait]
    impl DatagramSender for MockSender {
        async fn send_to(&self, datagram: &[u8], target: SocketAddr) -> io::Result<usize> {
            self.sent
                .lock()
                .push((Instant::now(), datagram.to_vec(), target));

            match self.failures.lock().pop_front() {
                Some(kind) => Err(io::Error::from(kind)),
                None => Ok(datagram.len()),
            }
        }
    }

    struct PanickingSender;

    #[async_trait]
    impl DatagramSender for PanickingSender {
        async fn send_to(&self, _datagram: &[u8], _target: SocketAddr) -> io::Result<usize> {
            panic!("sender exploded");
        }
    }

    fn target() -> SocketAddr {
        "224.0.0.252:5355".parse().unwrap()
    }

    fn scheduler(
        sender: Arc<MockSender>,
        interval: Duration,
        jitter: Duration,
    ) -> BroadcastScheduler {
        let config = BroadcastConfig::new("FILESRV02", interval, jitter).unwrap();
        BroadcastScheduler::new(config, sender, target())
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_query_is_immediate_and_exact() {
        let sender = Arc::new(MockSender::default());
        let scheduler = scheduler(sender.clone(), Duration::from_secs(60), Duration::ZERO);
        let start = Instant::now();

        scheduler.start(&CancellationToken::new()).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let sent = sender.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, start);
        assert_eq!(sent[0].1, QueryEncoder::encode("FILESRV02").unwrap());
        assert_eq!(sent[0].2, target());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_on_schedule() {
        let sender = Arc::new(MockSender::default());
        let scheduler = scheduler(sender.clone(), Duration::from_secs(10), Duration::ZERO);
        let start = Instant::now();

        scheduler.start(&CancellationToken::new()).unwrap();
        tokio::time::sleep(Duration::from_secs(35)).await;

        let offsets: Vec<u64> = sender
            .sent
            .lock()
            .iter()
            .map(|(at, _, _)| (*at - start).as_secs())
            .collect();
        assert_eq!(offsets, vec![0, 10, 20, 30]);
        assert_eq!(scheduler.state(), BroadcastState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jittered_gaps_stay_in_window() {
        let sender = Arc::new(MockSender::default());
        let scheduler = scheduler(sender.clone(), Duration::from_secs(100), Duration::from_secs(20));

        scheduler.start(&CancellationToken::new()).unwrap();
        tokio::time::sleep(Duration::from_secs(2_000)).await;

        let sent = sender.sent.lock();
        assert!(sent.len() >= 16);
        for pair in sent.windows(2) {
            let gap = pair[1].0 - pair[0].0;
            // Timer deadlines round up to the next millisecond.
            assert!(gap >= Duration::from_secs(80));
            assert!(gap <= Duration::from_secs(120) + Duration::from_millis(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_sleep_stops_sending() {
        let sender = Arc::new(MockSender::default());
        let scheduler = scheduler(sender.clone(), Duration::from_secs(7200), Duration::from_secs(1200));
        let shutdown = CancellationToken::new();

        scheduler.start(&shutdown).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sender.count(), 1);

        shutdown.cancel();
        scheduler.finished().await;
        tokio::time::sleep(Duration::from_secs(20_000)).await;

        assert_eq!(sender.count(), 1);
        assert_eq!(scheduler.state(), BroadcastState::Stopped);
        assert_eq!(scheduler.stop().await.unwrap(), BroadcastExit::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_exit() {
        let sender = Arc::new(MockSender::default());
        let scheduler = scheduler(sender.clone(), Duration::from_secs(30), Duration::from_secs(5));

        scheduler.start(&CancellationToken::new()).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(scheduler.stop().await.unwrap(), BroadcastExit::Cancelled);
        assert_eq!(scheduler.state(), BroadcastState::Stopped);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(sender.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_sends_nothing() {
        let sender = Arc::new(MockSender::default());
        let scheduler = scheduler(sender.clone(), Duration::from_secs(10), Duration::ZERO);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        scheduler.start(&shutdown).unwrap();

        assert_eq!(scheduler.stop().await.unwrap(), BroadcastExit::Cancelled);
        assert_eq!(sender.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_keeps_schedule() {
        let sender = Arc::new(MockSender::failing(&[
            io::ErrorKind::TimedOut,
            io::ErrorKind::Other,
        ]));
        let scheduler = scheduler(sender.clone(), Duration::from_secs(10), Duration::ZERO);

        scheduler.start(&CancellationToken::new()).unwrap();
        tokio::time::sleep(Duration::from_secs(25)).await;

        assert_eq!(sender.count(), 3);
        assert_eq!(scheduler.state(), BroadcastState::Running);
        assert_eq!(scheduler.stop().await.unwrap(), BroadcastExit::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_transport_ends_run() {
        let sender = Arc::new(MockSender::failing(&[io::ErrorKind::BrokenPipe]));
        let scheduler = scheduler(sender.clone(), Duration::from_secs(10), Duration::ZERO);

        scheduler.start(&CancellationToken::new()).unwrap();
        scheduler.finished().await;

        assert_eq!(scheduler.state(), BroadcastState::Stopped);
        assert!(matches!(
            scheduler.stop().await,
            Err(BroadcastErrors::TransportClosed(_))
        ));

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(sender.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_rejected() {
        let sender = Arc::new(MockSender::default());
        let scheduler = scheduler(sender, Duration::from_secs(10), Duration::ZERO);
        let shutdown = CancellationToken::new();

        scheduler.start(&shutdown).unwrap();

        assert!(matches!(
            scheduler.start(&shutdown),
            Err(BroadcastErrors::AlreadyRunning)
        ));
        scheduler.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop() {
        let sender = Arc::new(MockSender::default());
        let scheduler = scheduler(sender.clone(), Duration::from_secs(10), Duration::ZERO);
        let shutdown = CancellationToken::new();

        scheduler.start(&shutdown).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        scheduler.stop().await.unwrap();

        scheduler.start(&shutdown).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(sender.count(), 2);
        assert_eq!(scheduler.state(), BroadcastState::Running);
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let scheduler = scheduler(
            Arc::new(MockSender::default()),
            Duration::from_secs(10),
            Duration::ZERO,
        );

        assert_eq!(scheduler.state(), BroadcastState::Stopped);
        assert_eq!(scheduler.stop().await.unwrap(), BroadcastExit::NotStarted);
    }

    #[tokio::test]
    #[should_panic(expected = "sender exploded")]
    async fn test_panic_in_loop_reaches_caller() {
        let config = BroadcastConfig::new("FILESRV02", Duration::from_secs(10), Duration::ZERO)
            .unwrap();
        let scheduler = BroadcastScheduler::new(config, Arc::new(PanickingSender), target());

        scheduler.start(&CancellationToken::new()).unwrap();
        scheduler.finished().await;
        let _ = scheduler.stop().await;
    }
}
