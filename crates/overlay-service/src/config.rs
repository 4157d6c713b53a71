//! Overlay configuration, loaded from YAML or JSON.
//!
//! Every section defaults field by field, so a file only needs to name the
//! values it changes. The configuration is read once at start-up and stays
//! immutable while the loops run.

use racing_overlay_standings::{RelativeConfig, StandingsConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_DATA_DIR: &str = "data/consumption";
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 20;
pub const DEFAULT_IDLE_UPDATE_INTERVAL_MS: u64 = 400;
pub const DEFAULT_MINIMUM_UPDATE_INTERVAL_MS: u64 = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {path:?}: {source}")]
    InvalidYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid JSON in {path:?}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported config format for {path:?}, expected .yaml, .yml or .json")]
    UnsupportedFormat { path: PathBuf },
}

/// Effective sleep durations of one polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub active: Duration,
    pub idle: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    pub enable: bool,
    pub update_interval_ms: u64,
    pub idle_update_interval_ms: u64,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            enable: true,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            idle_update_interval_ms: DEFAULT_IDLE_UPDATE_INTERVAL_MS,
        }
    }
}

impl ModuleConfig {
    /// Active interval is never below `minimum_ms`; idle is never below active.
    pub fn intervals(&self, minimum_ms: u64) -> PollIntervals {
        let active = self.update_interval_ms.max(minimum_ms);
        let idle = self.idle_update_interval_ms.max(active);
        PollIntervals {
            active: Duration::from_millis(active),
            idle: Duration::from_millis(idle),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatibilityConfig {
    pub minimum_update_interval_ms: u64,
}

impl Default for CompatibilityConfig {
    fn default() -> Self {
        Self {
            minimum_update_interval_ms: DEFAULT_MINIMUM_UPDATE_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelativeModuleConfig {
    #[serde(flatten)]
    pub module: ModuleConfig,
    #[serde(flatten)]
    pub layout: RelativeConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandingsModuleConfig {
    #[serde(flatten)]
    pub module: ModuleConfig,
    #[serde(flatten)]
    pub layout: StandingsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub storage: StorageConfig,
    pub compatibility: CompatibilityConfig,
    pub fuel: ModuleConfig,
    pub energy: ModuleConfig,
    pub relative: RelativeModuleConfig,
    pub standings: StandingsModuleConfig,
}

impl OverlayConfig {
    /// Loads a config file, choosing the format by extension.
    ///
    /// `.yaml` and `.yml` files are read as YAML and `.json` files as JSON,
    /// ignoring case. Missing sections and fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadFailed`] when the file cannot be read,
    /// [`ConfigError::InvalidYaml`] or [`ConfigError::InvalidJson`] when the
    /// content does not parse, and [`ConfigError::UnsupportedFormat`] for any
    /// other extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let config = match extension.as_deref() {
            Some("yaml" | "yml") => Self::from_yaml(&content).map_err(|source| {
                ConfigError::InvalidYaml {
                    path: path.to_path_buf(),
                    source,
                }
            })?,
            Some("json") => Self::from_json(&content).map_err(|source| ConfigError::InvalidJson {
                path: path.to_path_buf(),
                source,
            })?,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
        };

        debug!(path = ?path, "Loaded overlay config");
        Ok(config)
    }

    /// Parses a YAML document.
    ///
    /// # Errors
    ///
    /// Returns the parser error for malformed YAML or mistyped fields.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns the parser error for malformed JSON or mistyped fields.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn minimum_interval_ms(&self) -> u64 {
        self.compatibility.minimum_update_interval_ms
    }
}
