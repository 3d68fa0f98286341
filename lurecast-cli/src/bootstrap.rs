use anyhow::Context;
use lurecast::config::{CliOverrides, Config, LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

pub fn load_config(path: Option<&str>, overrides: CliOverrides) -> anyhow::Result<Config> {
    let config = Config::load(path, overrides).context("failed to load configuration")?;
    config.validate()?;
    Ok(config)
}

/// Operational logs go to stderr; stdout is left to the event stream.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let initialized = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    if let Err(e) = initialized {
        eprintln!("tracing subscriber not installed: {e}");
        return;
    }
    tracing::debug!(format = ?logging.format, "tracing initialized");
}

pub fn print_banner() {
    eprintln!("------------------------------------------------------------");
    eprintln!("██      ██    ██ ██████  ███████  ██████  █████  ███████ ████████");
    eprintln!("██      ██    ██ ██   ██ ██      ██      ██   ██ ██         ██   ");
    eprintln!("██      ██    ██ ██████  █████   ██      ███████ ███████    ██   ");
    eprintln!("██      ██    ██ ██   ██ ██      ██      ██   ██      ██    ██   ");
    eprintln!("███████  ██████  ██   ██ ███████  ██████ ██   ██ ███████    ██   ");
    eprintln!("                  LLMNR DECEPTION ENGINE");
    eprintln!("                     VERSION:  {}", env!("CARGO_PKG_VERSION"));
    eprintln!("------------------------------------------------------------");
}
