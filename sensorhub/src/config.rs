//! Configuration for sensorhubd.
//!
//! Settings come from an optional JSON file named by `SENSORHUB_CONFIG`,
//! then from individual `SENSORHUB_*` environment variables, which win over
//! the file. Anything left unset keeps its default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::peripheral::{ina3221, tca9548a, SelectPolicy};
use crate::tracing::prelude::*;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_PATH_VAR: &str = "SENSORHUB_CONFIG";

/// Main configuration structure for the daemon.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Physical bus
    pub bus: BusConfig,

    /// Multiplexer in front of the downstream devices
    pub mux: MuxConfig,

    /// INA3221 polled by the daemon
    pub power_monitor: PowerMonitorConfig,

    /// Delay between polls, in milliseconds
    pub poll_interval_ms: u64,
}

/// Physical bus configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BusConfig {
    /// i2c-dev character device
    pub device: PathBuf,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/i2c-3"),
        }
    }
}

/// TCA9548A configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MuxConfig {
    pub address: u8,
    pub policy: SelectPolicy,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            address: tca9548a::DEFAULT_ADDRESS,
            policy: SelectPolicy::default(),
        }
    }
}

/// INA3221 configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PowerMonitorConfig {
    pub address: u8,

    /// Mux channel the monitor sits behind; `None` when wired directly
    pub mux_channel: Option<u8>,

    /// Sensor channel to poll (1-3)
    pub channel: u8,

    /// Shunt resistance on that channel
    pub shunt_ohms: f32,
}

impl Default for PowerMonitorConfig {
    fn default() -> Self {
        Self {
            address: ina3221::DEFAULT_ADDRESS,
            mux_channel: Some(0),
            channel: 1,
            shunt_ohms: 0.1,
        }
    }
}

impl Config {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

    /// Load configuration from the file named by `SENSORHUB_CONFIG` (if
    /// any), apply environment overrides and validate the result.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_VAR) {
            Some(path) => Self::load_from(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific JSON file, without environment
    /// overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Reading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Apply `SENSORHUB_*` overrides looked up through `lookup`.
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(device) = lookup("SENSORHUB_I2C_DEVICE") {
            self.bus.device = PathBuf::from(device);
        }
        if let Some(v) = lookup("SENSORHUB_MUX_ADDRESS") {
            self.mux.address = parse_u8("SENSORHUB_MUX_ADDRESS", &v)?;
        }
        if let Some(v) = lookup("SENSORHUB_MUX_POLICY") {
            self.mux.policy = match v.to_ascii_lowercase().as_str() {
                "rewrite" => SelectPolicy::Rewrite,
                "verify" => SelectPolicy::Verify,
                _ => {
                    return Err(Error::Config(format!(
                        "SENSORHUB_MUX_POLICY: unknown policy {v:?}"
                    )))
                }
            };
        }
        if let Some(v) = lookup("SENSORHUB_INA_ADDRESS") {
            self.power_monitor.address = parse_u8("SENSORHUB_INA_ADDRESS", &v)?;
        }
        if let Some(v) = lookup("SENSORHUB_INA_MUX_CHANNEL") {
            // "none" wires the monitor directly to the bus
            self.power_monitor.mux_channel = if v.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(parse_u8("SENSORHUB_INA_MUX_CHANNEL", &v)?)
            };
        }
        if let Some(v) = lookup("SENSORHUB_INA_CHANNEL") {
            self.power_monitor.channel = parse_u8("SENSORHUB_INA_CHANNEL", &v)?;
        }
        if let Some(v) = lookup("SENSORHUB_SHUNT_OHMS") {
            self.power_monitor.shunt_ohms = v
                .trim()
                .parse()
                .map_err(|_| {
                    Error::Config(format!("SENSORHUB_SHUNT_OHMS: not a number: {v:?}"))
                })?;
        }
        if let Some(v) = lookup("SENSORHUB_POLL_INTERVAL_MS") {
            self.poll_interval_ms = v
                .trim()
                .parse()
                .map_err(|_| {
                    Error::Config(format!("SENSORHUB_POLL_INTERVAL_MS: not a number: {v:?}"))
                })?;
        }
        Ok(())
    }

    /// Reject settings the drivers would refuse at run time.
    pub fn validate(&self) -> Result<()> {
        for (name, address) in [
            ("mux.address", self.mux.address),
            ("power_monitor.address", self.power_monitor.address),
        ] {
            if address > 0x7f {
                return Err(Error::Config(format!(
                    "{name}: 0x{address:02x} is not a 7-bit address"
                )));
            }
        }
        if let Some(channel) = self.power_monitor.mux_channel {
            if channel >= tca9548a::CHANNELS {
                return Err(Error::InvalidChannel {
                    channel,
                    min: 0,
                    max: tca9548a::CHANNELS - 1,
                });
            }
        }
        ina3221::Channel::try_from(self.power_monitor.channel)?;
        ina3221::check_shunt(self.power_monitor.shunt_ohms)?;
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be positive".into()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bus: BusConfig::default(),
            mux: MuxConfig::default(),
            power_monitor: PowerMonitorConfig::default(),
            poll_interval_ms: Self::DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

/// Parse a decimal or `0x`-prefixed hex byte.
fn parse_u8(name: &str, value: &str) -> Result<u8> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| Error::Config(format!("{name}: not a byte: {value:?}")))
}
