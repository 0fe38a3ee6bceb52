//! Settings loaded from `power-log.toml`
//!
//! Every key is optional. Command-line flags override whatever the file
//! provides.

use crate::error::ConfigError;
use crate::serial::port::{DEFAULT_BAUD, DEFAULT_READ_TIMEOUT, DEFAULT_SETTLE_DELAY};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "power-log.toml";

/// Top-level configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub toolchain: ToolchainSettings,
    pub serial: SerialSettings,
    pub capture: CaptureSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Toolchain executable
    pub cli: String,
    /// Fully-qualified board name of the measurement MCU
    pub fqbn: String,
    /// Sketch directory or .ino file
    pub sketch: PathBuf,
    /// Board under measurement, passed to the firmware as `-DBOARD_<name>`
    pub target_board: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub settle_delay_ms: u64,
    pub read_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Directory relative output names are placed in
    pub log_dir: PathBuf,
    /// Segment output on `#START`/`#STOP` markers
    pub ext_trigger: bool,
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            cli: "arduino-cli".to_string(),
            fqbn: "arduino:mbed:nano33ble".to_string(),
            sketch: PathBuf::from("./src/src.ino"),
            target_board: "ZCU106".to_string(),
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD,
            settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            read_timeout_ms: DEFAULT_READ_TIMEOUT.as_millis() as u64,
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            ext_trigger: false,
        }
    }
}

impl SerialSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Settings {
    /// Parse settings from TOML text
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load an explicit config file, or `power-log.toml` if it exists,
    /// or fall back to defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::ConfigRead {
            path: path.clone(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Self::parse(&content, &path)
    }
}
