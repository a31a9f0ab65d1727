// crates/habitkit/src/db/schema/habits.rs
// Habit tracker tables

use crate::db::achievements::seed_default_achievements_sync;
use crate::db::migration_helpers::{add_column_if_missing, table_exists};
use anyhow::{Context, Result};
use rusqlite::Connection;

/// v1: habits, completions, achievements, the user_stats singleton, and the
/// default achievement catalog.
pub fn migrate_initial_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(INITIAL_SCHEMA)
        .context("creating base tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO user_stats (id, total_points, total_completions, current_streak, longest_streak)
         VALUES (1, 0, 0, 0, 0)",
        [],
    )?;

    let seeded = seed_default_achievements_sync(conn).context("seeding achievements")?;
    if seeded > 0 {
        tracing::info!(seeded, "Seeded default achievement catalog");
    }
    Ok(())
}

/// v2: archive flag and timestamp on habits.
pub fn migrate_archive_fields(conn: &Connection) -> Result<()> {
    if !table_exists(conn, "habits")? {
        anyhow::bail!("habits table missing");
    }

    add_column_if_missing(conn, "habits", "is_archived", "INTEGER NOT NULL DEFAULT 0")?;
    add_column_if_missing(conn, "habits", "archived_at", "INTEGER")?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_habits_archived ON habits(is_archived)",
        [],
    )?;
    Ok(())
}

const INITIAL_SCHEMA: &str = r#"
-- =======================================
-- HABITS
-- =======================================
CREATE TABLE IF NOT EXISTS habits (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    color TEXT NOT NULL,
    icon TEXT NOT NULL,
    target_frequency INTEGER NOT NULL DEFAULT 7,
    points INTEGER NOT NULL DEFAULT 10 CHECK (points >= 0),
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL
);

-- =======================================
-- COMPLETIONS
-- =======================================
-- No ON DELETE CASCADE: habits with history are only soft-deleted
CREATE TABLE IF NOT EXISTS completions (
    id TEXT PRIMARY KEY,
    habit_id TEXT NOT NULL REFERENCES habits(id),
    date TEXT NOT NULL,
    points INTEGER NOT NULL CHECK (points >= 0),
    completed_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_completions_habit ON completions(habit_id);
CREATE INDEX IF NOT EXISTS idx_completions_date ON completions(date);
CREATE UNIQUE INDEX IF NOT EXISTS idx_completions_habit_date ON completions(habit_id, date);

-- =======================================
-- ACHIEVEMENTS
-- =======================================
CREATE TABLE IF NOT EXISTS achievements (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    icon TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('total_completions', 'streak', 'points', 'consistency')),
    requirement INTEGER NOT NULL,
    points INTEGER NOT NULL DEFAULT 0,
    unlocked_at INTEGER
);

-- =======================================
-- USER STATS (singleton)
-- =======================================
CREATE TABLE IF NOT EXISTS user_stats (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    total_points INTEGER NOT NULL DEFAULT 0 CHECK (total_points >= 0),
    total_completions INTEGER NOT NULL DEFAULT 0 CHECK (total_completions >= 0),
    current_streak INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    last_completion_date TEXT,
    CHECK (longest_streak >= current_streak)
);
"#;
