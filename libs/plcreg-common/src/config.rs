//! Gateway configuration
//!
//! Sources are layered with figment. Priority (highest to lowest):
//! 1. Environment variables prefixed `PLCREG_`, `__` separating sections
//!    (e.g. `PLCREG_MODBUS__REQUEST_TIMEOUT_MS=3000`)
//! 2. Explicit config file passed by the caller
//! 3. `config/plcreg.{toml,yaml,json}`
//! 4. Built-in defaults

use crate::logging::LoggingConfig;
use crate::{Error, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "PLCREG_";

/// Smallest PDU an S7 CPU negotiates
pub const MIN_S7_PDU_LENGTH: u16 = 240;

/// Largest PDU an S7 CPU negotiates
pub const MAX_S7_PDU_LENGTH: u16 = 960;

/// Modbus TCP session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModbusSettings {
    /// Port used when a request carries none
    pub default_port: u16,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for ModbusSettings {
    fn default() -> Self {
        Self {
            default_port: 502,
            connect_timeout_ms: 5_000,
            request_timeout_ms: 10_000,
        }
    }
}

impl ModbusSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// S7 session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S7Settings {
    pub rack: u16,
    pub slot: u16,
    pub pdu_length: u16,
    /// Data block backing the V area
    pub db_number: u16,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for S7Settings {
    fn default() -> Self {
        Self {
            rack: 0,
            slot: 1,
            pdu_length: MAX_S7_PDU_LENGTH,
            db_number: 1,
            connect_timeout_ms: 5_000,
            request_timeout_ms: 10_000,
        }
    }
}

impl S7Settings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Top-level gateway configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub modbus: ModbusSettings,
    pub s7: S7Settings,
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Build the layered figment without extracting it
    pub fn figment(explicit_file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(GatewayConfig::default()))
            .merge(Toml::file("config/plcreg.toml"))
            .merge(Yaml::file("config/plcreg.yaml"))
            .merge(Json::file("config/plcreg.json"));

        if let Some(path) = explicit_file {
            figment = figment.merge(file_provider(path)?);
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate configuration from all sources
    pub fn load(explicit_file: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(explicit_file)?)
    }

    /// Extract and validate from a prepared figment
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: GatewayConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no session could run with
    pub fn validate(&self) -> Result<()> {
        let timeouts = [
            ("modbus.connect_timeout_ms", self.modbus.connect_timeout_ms),
            ("modbus.request_timeout_ms", self.modbus.request_timeout_ms),
            ("s7.connect_timeout_ms", self.s7.connect_timeout_ms),
            ("s7.request_timeout_ms", self.s7.request_timeout_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(Error::config(format!("{} must be greater than 0", name)));
            }
        }

        if !(MIN_S7_PDU_LENGTH..=MAX_S7_PDU_LENGTH).contains(&self.s7.pdu_length) {
            return Err(Error::config(format!(
                "s7.pdu_length must be within {}..={}, got {}",
                MIN_S7_PDU_LENGTH, MAX_S7_PDU_LENGTH, self.s7.pdu_length
            )));
        }

        if self.modbus.default_port == 0 {
            return Err(Error::config("modbus.default_port must not be 0"));
        }

        Ok(())
    }
}

fn file_provider(path: &Path) -> Result<Figment> {
    if !path.exists() {
        return Err(Error::config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::config("Config file must have an extension"))?;

    match extension {
        "toml" => Ok(Figment::from(Toml::file(path))),
        "yaml" | "yml" => Ok(Figment::from(Yaml::file(path))),
        "json" => Ok(Figment::from(Json::file(path))),
        _ => Err(Error::config(format!(
            "Unsupported config file format: {}",
            extension
        ))),
    }
}
