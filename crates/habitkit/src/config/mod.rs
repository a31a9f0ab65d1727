// crates/habitkit/src/config/mod.rs
// Configuration: CLI flags > environment > config file > defaults

pub mod env;
pub mod file;

pub use env::EnvConfig;
pub use file::HabitkitConfig;

use std::path::PathBuf;
use tracing::Level;

/// Default database file name inside ~/.habitkit
pub const DEFAULT_DB_FILE: &str = "habitkit.db";

/// Effective settings after layering every source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub log_level: Level,
}

impl Settings {
    /// Layer the sources. `cli_db` and `verbose` come from command-line flags.
    pub fn resolve(
        cli_db: Option<PathBuf>,
        verbose: bool,
        env: &EnvConfig,
        file: &HabitkitConfig,
    ) -> Self {
        let db_path = cli_db
            .or_else(|| env.db_path.clone())
            .or_else(|| file.storage.path.clone())
            .unwrap_or_else(|| HabitkitConfig::home_dir().join(DEFAULT_DB_FILE));

        let log_level = if verbose {
            Level::DEBUG
        } else {
            env.log_level
                .as_deref()
                .or(file.log.level.as_deref())
                .and_then(parse_level)
                .unwrap_or(Level::WARN)
        };

        Self { db_path, log_level }
    }

    /// Load env and file config, then resolve against the CLI flags.
    pub fn load(cli_db: Option<PathBuf>, verbose: bool) -> Self {
        Self::resolve(cli_db, verbose, &EnvConfig::load(), &HabitkitConfig::load())
    }
}

fn parse_level(s: &str) -> Option<Level> {
    s.trim().parse().ok()
}
