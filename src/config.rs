//! Monitor configuration
//!
//! TOML-backed settings for the presentation shell. The path comes from the
//! `PQM_CONFIG` environment variable, defaulting to `pqm-monitor.toml` in
//! the working directory. Every field has a default, so a missing file runs
//! the monitor against the default endpoint (falling back to simulation
//! when no meter answers there). Unknown keys are rejected.
//!
//! ```toml
//! poll_interval_secs = 5
//!
//! [meter]
//! host = "192.168.1.100"
//! port = 502
//! unit_id = 1
//! base_address = 0
//! register_count = 6
//! connect_timeout_ms = 5000
//! response_timeout_ms = 5000
//!
//! [store]
//! path = "pqm_data.csv"
//! ```

use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs, io};

use serde::Deserialize;
use tracing::info;

use crate::constants::{
    DEFAULT_BASE_ADDRESS, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_REGISTER_COUNT, DEFAULT_RESPONSE_TIMEOUT_MS, DEFAULT_TCP_PORT, DEFAULT_UNIT_ID,
};
use crate::link::LinkConfig;

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "PQM_CONFIG";

/// Configuration file name used when the variable is unset
pub const DEFAULT_CONFIG_PATH: &str = "pqm-monitor.toml";

/// Meter endpoint settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeterSection {
    /// Device host name or address
    pub host: String,
    /// Device TCP port
    pub port: u16,
    /// Modbus unit identifier
    pub unit_id: u8,
    /// First register of the electrical quantities block
    pub base_address: u16,
    /// Registers read per cycle
    pub register_count: u16,
    /// Connect budget, milliseconds
    pub connect_timeout_ms: u64,
    /// Response budget, milliseconds
    pub response_timeout_ms: u64,
}

impl Default for MeterSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_TCP_PORT,
            unit_id: DEFAULT_UNIT_ID,
            base_address: DEFAULT_BASE_ADDRESS,
            register_count: DEFAULT_REGISTER_COUNT,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
        }
    }
}

/// Sample store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    /// Location of the append-only sample log
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("pqm_data.csv"),
        }
    }
}

/// Top-level monitor configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Meter endpoint settings
    pub meter: MeterSection,
    /// Sample store settings
    pub store: StoreSection,
    /// Seconds between acquisition cycles
    pub poll_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            meter: MeterSection::default(),
            store: StoreSection::default(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from the conventional location.
    ///
    /// A missing file yields the defaults; an unreadable or invalid file is
    /// an error.
    pub fn load() -> anyhow::Result<Self> {
        let path = env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let config: Self = toml::from_str(&contents)?;
                info!(path = %path, "configuration loaded");
                Ok(config)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(path = %path, "no configuration file, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The link configuration this monitor configuration describes
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig::new(format!("{}:{}", self.meter.host, self.meter.port))
            .with_unit_id(self.meter.unit_id)
            .with_base_address(self.meter.base_address)
            .with_register_count(self.meter.register_count)
            .with_connect_timeout(Duration::from_millis(self.meter.connect_timeout_ms))
            .with_response_timeout(Duration::from_millis(self.meter.response_timeout_ms))
    }

    /// Delay between acquisition cycles
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
