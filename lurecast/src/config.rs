//! File and command-line configuration.
//!
//! Lookup order:
//! 1. an explicitly provided path
//! 2. `lurecast.toml` in the working directory
//! 3. `/etc/lurecast/config.toml`
//! 4. built-in defaults
//!
//! Command-line overrides are applied on top, then [`Config::validate`]
//! checks the result once before anything is started.
//!
//! ```toml
//! [llmnr]
//! enabled = true
//! bind_address = "0.0.0.0"
//! interface_address = "0.0.0.0"
//! machine_name = "FILESRV01"
//! broadcast_interval_secs = 7200
//! broadcast_jitter_secs = 1200
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! events = "tracing"
//! ```
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use crate::dns::LLMNR_PORT;
use crate::dns::query::QueryEncoder;

const LOCAL_CONFIG_PATH: &str = "lurecast.toml";
const SYSTEM_CONFIG_PATH: &str = "/etc/lurecast/config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llmnr: LlmnrConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LlmnrConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Local address the capture socket binds to.
    #[serde(default = "default_any_address")]
    pub bind_address: String,
    /// Interface used to join the multicast group.
    #[serde(default = "default_any_address")]
    pub interface_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Name the decoy announces in its presence queries.
    #[serde(default = "default_machine_name")]
    pub machine_name: String,
    #[serde(default = "default_broadcast_interval_secs")]
    pub broadcast_interval_secs: u64,
    #[serde(default = "default_broadcast_jitter_secs")]
    pub broadcast_jitter_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub events: EventOutput,
}

/// Rendering of operational logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Where capture events go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutput {
    /// Through the `tracing` subscriber, alongside operational logs.
    #[default]
    Tracing,
    /// One JSON object per line on standard output.
    Stdout,
}

fn default_true() -> bool {
    true
}
fn default_any_address() -> String {
    Ipv4Addr::UNSPECIFIED.to_string()
}
fn default_port() -> u16 {
    LLMNR_PORT
}
fn default_machine_name() -> String {
    "FILESRV01".to_string()
}
fn default_broadcast_interval_secs() -> u64 {
    7200
}
fn default_broadcast_jitter_secs() -> u64 {
    1200
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LlmnrConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            bind_address: default_any_address(),
            interface_address: default_any_address(),
            port: default_port(),
            machine_name: default_machine_name(),
            broadcast_interval_secs: default_broadcast_interval_secs(),
            broadcast_jitter_secs: default_broadcast_jitter_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            events: EventOutput::default(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults, then apply overrides.
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigErrors> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if Path::new(LOCAL_CONFIG_PATH).exists() {
            Self::from_file(LOCAL_CONFIG_PATH)?
        } else if Path::new(SYSTEM_CONFIG_PATH).exists() {
            Self::from_file(SYSTEM_CONFIG_PATH)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigErrors> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigErrors::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigErrors::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(bind) = overrides.bind_address {
            self.llmnr.bind_address = bind;
        }
        if let Some(interface) = overrides.interface_address {
            self.llmnr.interface_address = interface;
        }
        if let Some(port) = overrides.port {
            self.llmnr.port = port;
        }
        if let Some(name) = overrides.machine_name {
            self.llmnr.machine_name = name;
        }
        if let Some(interval) = overrides.broadcast_interval_secs {
            self.llmnr.broadcast_interval_secs = interval;
        }
        if let Some(jitter) = overrides.broadcast_jitter_secs {
            self.llmnr.broadcast_jitter_secs = jitter;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
        if let Some(events) = overrides.events {
            self.logging.events = events;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigErrors> {
        let llmnr = &self.llmnr;

        llmnr.bind_ip()?;
        llmnr.interface_ip()?;

        if llmnr.port == 0 {
            return Err(ConfigErrors::Validation("LLMNR port cannot be 0".to_string()));
        }
        if llmnr.machine_name.trim_matches('.').is_empty() {
            return Err(ConfigErrors::Validation("machine name cannot be empty".to_string()));
        }
        QueryEncoder::encode(&llmnr.machine_name)
            .map_err(|e| ConfigErrors::Validation(format!("machine name: {}", e)))?;
        if llmnr.broadcast_interval_secs == 0 {
            return Err(ConfigErrors::Validation(
                "broadcast interval must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }
}

impl LlmnrConfig {
    pub fn bind_ip(&self) -> Result<Ipv4Addr, ConfigErrors> {
        parse_ipv4("bind_address", &self.bind_address)
    }

    pub fn interface_ip(&self) -> Result<Ipv4Addr, ConfigErrors> {
        parse_ipv4("interface_address", &self.interface_address)
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_secs(self.broadcast_interval_secs)
    }

    pub fn broadcast_jitter(&self) -> Duration {
        Duration::from_secs(self.broadcast_jitter_secs)
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "tokio-dep")] {
        use crate::broadcast::BroadcastConfig;

        impl LlmnrConfig {
            /// Settings for the presence broadcast of this module.
            pub fn broadcast_config(&self) -> Result<BroadcastConfig, ConfigErrors> {
                if self.machine_name.trim_matches('.').is_empty() {
                    return Err(ConfigErrors::Validation("machine name cannot be empty".to_string()));
                }
                BroadcastConfig::new(
                    self.machine_name.clone(),
                    self.broadcast_interval(),
                    self.broadcast_jitter(),
                )
                .map_err(|e| ConfigErrors::Validation(format!("machine name: {}", e)))
            }
        }
    }
}

fn parse_ipv4(field: &str, value: &str) -> Result<Ipv4Addr, ConfigErrors> {
    value
        .parse()
        .map_err(|_| ConfigErrors::Validation(format!("{} '{}' is not an IPv4 address", field, value)))
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub bind_address: Option<String>,
    pub interface_address: Option<String>,
    pub port: Option<u16>,
    pub machine_name: Option<String>,
    pub broadcast_interval_secs: Option<u64>,
    pub broadcast_jitter_secs: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub events: Option<EventOutput>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigErrors {
    #[error("Failed to read config file {0}: {1}")]
    FileRead(String, String),
    #[error("Failed to parse config: {0}")]
    Parse(String),
    #[error("Configuration validation error: {0}")]
    Validation(String),
}
