use crate::core::models::DataUnit;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub daemon: DaemonSettings,
    pub polling: PollingSettings,
    pub price_source: PriceSourceSettings,
    pub data_unit: DataUnit,
    pub host_pricing_pins: BTreeMap<String, PriceEntry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            daemon: DaemonSettings::default(),
            polling: PollingSettings::default(),
            price_source: PriceSourceSettings::default(),
            data_unit: DataUnit::default(),
            host_pricing_pins: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    pub api_addr: String,
    pub api_agent: String,
    pub api_password: Option<String>,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            api_addr: "localhost:9980".to_string(),
            api_agent: "Sia-Agent".to_string(),
            api_password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub short_secs: u64,
    pub long_secs: u64,
    pub price_secs: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            short_secs: 5,
            long_secs: 300,
            price_secs: 900,
        }
    }
}

impl PollingSettings {
    pub fn short(&self) -> Duration {
        Duration::from_secs(self.short_secs)
    }

    pub fn long(&self) -> Duration {
        Duration::from_secs(self.long_secs)
    }

    pub fn price(&self) -> Duration {
        Duration::from_secs(self.price_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceSourceSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for PriceSourceSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.siacentral.com/v2".to_string(),
            timeout_secs: 30,
        }
    }
}

/// A price pin value; anything but a string is kept so it can be reported
/// and skipped instead of failing the whole config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PinValue {
    Text(String),
    Other(toml::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    #[serde(default)]
    pub value: Option<PinValue>,
    #[serde(default = "default_pin_currency")]
    pub currency: String,
}

fn default_pin_currency() -> String {
    "sc".to_string()
}

impl PriceEntry {
    #[cfg(test)]
    pub fn new(value: &str, currency: &str) -> Self {
        Self {
            value: Some(PinValue::Text(value.to_string())),
            currency: currency.to_string(),
        }
    }

    /// The pinned amount, or `None` when the pin is malformed.
    pub fn amount(&self) -> Option<&str> {
        match &self.value {
            Some(PinValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sia-host-monitor").join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path().context("Could not determine config directory")?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(?path, pins = settings.host_pricing_pins.len(), "Loaded config");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.daemon.api_addr.trim().is_empty() {
            anyhow::bail!("daemon.api_addr must not be empty");
        }

        for (name, secs) in [
            ("short_secs", self.polling.short_secs),
            ("long_secs", self.polling.long_secs),
            ("price_secs", self.polling.price_secs),
        ] {
            if secs == 0 {
                anyhow::bail!("polling.{} must be greater than zero", name);
            }
        }

        if self.price_source.base_url.trim().is_empty() {
            anyhow::bail!("price_source.base_url must not be empty");
        }

        Ok(())
    }
}
