// crates/habitkit/src/config/file.rs
// File-based configuration from ~/.habitkit/config.toml

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Top-level config structure
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct HabitkitConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Storage section
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Database file location
    pub path: Option<PathBuf>,
}

/// Logging section
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// One of error, warn, info, debug, trace
    pub level: Option<String>,
}

impl HabitkitConfig {
    /// Load config from ~/.habitkit/config.toml
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from an explicit path. A missing or malformed file
    /// yields defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded config from file");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse config file");
                    Self::default()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
        }
    }

    /// Directory holding the config file and the default database
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".habitkit")
    }

    /// Get the config file path
    fn config_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }
}
