// crates/habitkit/src/db/schema/mod.rs
// Versioned schema migrations tracked by PRAGMA user_version

use crate::error::{HabitError, Result};
use rusqlite::Connection;

mod habits;

/// One forward-only schema step.
///
/// `up` must be safe to re-run against a partially applied schema: guarded
/// `CREATE ... IF NOT EXISTS`, column checks before `ALTER TABLE`, and
/// `INSERT OR IGNORE` for seed data.
#[derive(Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub up: fn(&Connection) -> anyhow::Result<()>,
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .field("name", &self.name)
            .finish()
    }
}

/// Every known migration, oldest first.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        up: habits::migrate_initial_schema,
    },
    Migration {
        version: 2,
        name: "add_archive_fields",
        up: habits::migrate_archive_fields,
    },
];

/// Newest schema version this build knows about.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Persisted schema version (0 for a fresh database).
pub fn current_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}

/// Bring the database up to the newest known schema.
///
/// Called during pool creation, before the store is reachable.
pub fn run_all_migrations(conn: &Connection) -> Result<u32> {
    run_migrations(conn, MIGRATIONS)
}

/// Apply every migration newer than the persisted version, in order.
///
/// Each step runs in its own transaction together with the version bump, so
/// a crash between steps resumes at the first unapplied migration. Returns
/// the persisted version afterwards.
pub fn run_migrations(conn: &Connection, migrations: &[Migration]) -> Result<u32> {
    validate_order(migrations)?;

    let mut version = current_version(conn)?;
    let newest = migrations.last().map(|m| m.version).unwrap_or(0);
    if version > newest {
        tracing::warn!(
            persisted = version,
            newest,
            "Database schema is newer than this build; opening without changes"
        );
        return Ok(version);
    }

    let start = version;
    for migration in migrations.iter().filter(|m| m.version > start) {
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        apply(conn, migration).map_err(|e| HabitError::MigrationFailed {
            version: migration.version,
            name: migration.name,
            reason: format!("{e:#}"),
        })?;
        version = migration.version;
    }

    Ok(version)
}

fn apply(conn: &Connection, migration: &Migration) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    (migration.up)(&tx)?;
    // PRAGMA does not accept bound parameters
    tx.execute_batch(&format!("PRAGMA user_version = {}", migration.version))?;
    tx.commit()?;
    Ok(())
}

fn validate_order(migrations: &[Migration]) -> Result<()> {
    let mut previous = 0u32;
    for migration in migrations {
        if migration.version <= previous {
            return Err(HabitError::MigrationFailed {
                version: migration.version,
                name: migration.name,
                reason: format!(
                    "migration versions must be strictly increasing (v{} follows v{})",
                    migration.version, previous
                ),
            });
        }
        previous = migration.version;
    }
    Ok(())
}
