// crates/habitkit/src/config/env.rs
// Environment-based configuration - single source of truth for all env vars

use std::path::PathBuf;
use tracing::debug;

/// Settings read from HABITKIT_* environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// Database file override (HABITKIT_DB)
    pub db_path: Option<PathBuf>,
    /// Log level override (HABITKIT_LOG)
    pub log_level: Option<String>,
}

impl EnvConfig {
    /// Load configuration from the process environment
    pub fn load() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary lookup so tests never touch the real environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let config = Self {
            db_path: read("HABITKIT_DB").map(PathBuf::from),
            log_level: read("HABITKIT_LOG").map(|v| v.trim().to_lowercase()),
        };
        debug!(
            db_override = config.db_path.is_some(),
            log_override = config.log_level.is_some(),
            "Environment config loaded"
        );
        config
    }
}
