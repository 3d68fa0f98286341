use anyhow::Context;
use clap::{Parser, ValueEnum};
use lurecast::capture::{ChannelLogger, EventLogger, JsonFormatter, TracingLogger};
use lurecast::config::{CliOverrides, EventOutput, LogFormat};
use lurecast::service::LlmnrHoneypot;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod bootstrap;

#[derive(Parser)]
#[command(name = "lurecast")]
#[command(version)]
#[command(about = "LLMNR deception engine - captures name-resolution probes and announces a decoy host")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Local address of the capture socket
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Interface address used to join the LLMNR group
    #[arg(short = 'i', long)]
    interface: Option<String>,

    /// UDP port (LLMNR uses 5355)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Machine name announced by the decoy
    #[arg(short = 'n', long)]
    machine_name: Option<String>,

    /// Base pause between presence queries, in seconds
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,

    /// Maximum deviation from the base pause, in seconds
    #[arg(long, value_name = "SECS")]
    jitter: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<FormatArg>,

    /// Where capture events are written
    #[arg(long, value_enum)]
    events: Option<EventsArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Compact,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum EventsArg {
    Tracing,
    Stdout,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            bind_address: self.bind.clone(),
            interface_address: self.interface.clone(),
            port: self.port,
            machine_name: self.machine_name.clone(),
            broadcast_interval_secs: self.interval,
            broadcast_jitter_secs: self.jitter,
            log_level: self.log_level.clone(),
            log_format: self.log_format.map(|f| match f {
                FormatArg::Compact => LogFormat::Compact,
                FormatArg::Json => LogFormat::Json,
            }),
            events: self.events.map(|e| match e {
                EventsArg::Tracing => EventOutput::Tracing,
                EventsArg::Stdout => EventOutput::Stdout,
            }),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = bootstrap::load_config(cli.config.as_deref(), cli.overrides())?;
    bootstrap::init_logging(&config.logging);
    bootstrap::print_banner();

    info!("Starting lurecast v{}", env!("CARGO_PKG_VERSION"));

    if !config.llmnr.enabled {
        warn!("LLMNR module disabled in configuration, nothing to run");
        return Ok(());
    }

    let mut event_channel = None;
    let mut printer = None;
    let logger: Arc<dyn EventLogger> = match config.logging.events {
        EventOutput::Tracing => Arc::new(TracingLogger),
        EventOutput::Stdout => {
            let channel = Arc::new(ChannelLogger::<JsonFormatter>::new(1024));
            let mut events = channel
                .subscribe()
                .context("event channel closed before start")?;

            printer = Some(tokio::spawn(async move {
                while let Some(line) = events.next().await {
                    println!("{line}");
                }
            }));
            event_channel = Some(channel.clone());
            channel
        }
    };

    let shutdown = CancellationToken::new();
    let honeypot = LlmnrHoneypot::new(config.llmnr.clone(), logger)?;
    let mut module = tokio::spawn(honeypot.run(shutdown.clone()));

    let outcome = tokio::select! {
        res = &mut module => res,
        sig = tokio::signal::ctrl_c() => {
            sig.context("failed to listen for Ctrl-C")?;
            info!("Shutdown requested");
            shutdown.cancel();
            module.await
        }
    };

    if let Some(channel) = event_channel {
        channel.close();
    }
    if let Some(printer) = printer {
        printer.await.ok();
    }

    match outcome.context("LLMNR module task failed")? {
        Ok(()) => {
            info!("lurecast stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "LLMNR module stopped with an error");
            Err(e.into())
        }
    }
}
