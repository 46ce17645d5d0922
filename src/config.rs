use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::devices::{PortSelector, UsbId, GPS_USB_ID, NEXSTAR_USB_ID};
use crate::gps::DEFAULT_MAX_HDOP;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid duration {value:?}: {message}")]
    Duration { value: String, message: String },
    #[error("max_hdop must be positive, got {0}")]
    MaxHdop(f32),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub gps: DeviceConfig,
    pub controller: DeviceConfig,
    pub acquisition: AcquisitionConfig,
}

/// Serial settings for one device. Unset fields take the device's defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Fixed port path; skips USB discovery when set.
    pub port: Option<String>,
    pub usb_id: Option<UsbId>,
    pub baud_rate: Option<u32>,
    pub read_timeout: Option<String>,
}

/// Fully resolved serial settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub selector: PortSelector,
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

struct DeviceDefaults {
    usb_id: UsbId,
    baud_rate: u32,
    read_timeout: Duration,
}

const GPS_DEFAULTS: DeviceDefaults = DeviceDefaults {
    usb_id: GPS_USB_ID,
    baud_rate: 9600,
    // Also how often an operator abort is noticed while waiting for a fix.
    read_timeout: Duration::from_millis(500),
};

const CONTROLLER_DEFAULTS: DeviceDefaults = DeviceDefaults {
    usb_id: NEXSTAR_USB_ID,
    baud_rate: 9600,
    read_timeout: Duration::from_secs(3),
};

impl DeviceConfig {
    fn resolve(&self, defaults: &DeviceDefaults) -> Result<SerialSettings, ConfigError> {
        let selector = match &self.port {
            Some(path) => PortSelector::Path(path.clone()),
            None => PortSelector::Usb(self.usb_id.unwrap_or(defaults.usb_id)),
        };
        let read_timeout = match &self.read_timeout {
            Some(s) => parse_duration(s)?,
            None => defaults.read_timeout,
        };
        Ok(SerialSettings {
            selector,
            baud_rate: self.baud_rate.unwrap_or(defaults.baud_rate),
            read_timeout,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcquisitionConfig {
    #[serde(default = "default_max_hdop")]
    pub max_hdop: f32,
    /// Give up waiting for a fix after this long; unset waits forever.
    #[serde(default)]
    pub timeout: Option<String>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            max_hdop: default_max_hdop(),
            timeout: None,
        }
    }
}

impl AcquisitionConfig {
    pub fn timeout(&self) -> Result<Option<Duration>, ConfigError> {
        self.timeout.as_deref().map(parse_duration).transpose()
    }
}

fn default_max_hdop() -> f32 {
    DEFAULT_MAX_HDOP
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_hdop = self.acquisition.max_hdop;
        if max_hdop.is_nan() || max_hdop <= 0.0 {
            return Err(ConfigError::MaxHdop(max_hdop));
        }
        self.gps()?;
        self.controller()?;
        self.acquisition.timeout()?;
        Ok(())
    }

    pub fn gps(&self) -> Result<SerialSettings, ConfigError> {
        self.gps.resolve(&GPS_DEFAULTS)
    }

    pub fn controller(&self) -> Result<SerialSettings, ConfigError> {
        self.controller.resolve(&CONTROLLER_DEFAULTS)
    }
}

pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(s.trim()).map_err(|e| ConfigError::Duration {
        value: s.to_string(),
        message: e.to_string(),
    })
}
