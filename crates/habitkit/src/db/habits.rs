// db/habits.rs
// Habit database operations

use crate::error::{HabitError, Result};
use habitkit_types::{Habit, HabitPatch, NewHabit};
use rusqlite::{Connection, OptionalExtension, params};

const HABIT_COLUMNS: &str = "id, name, description, color, icon, target_frequency, points, \
                             is_active, is_archived, archived_at, created_at";

/// Parse Habit from a rusqlite Row with standard column order:
/// (id, name, description, color, icon, target_frequency, points,
///  is_active, is_archived, archived_at, created_at)
pub fn parse_habit_row(row: &rusqlite::Row) -> rusqlite::Result<Habit> {
    Ok(Habit {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        color: row.get(3)?,
        icon: row.get(4)?,
        target_frequency: row.get(5)?,
        points: row.get(6)?,
        is_active: row.get(7)?,
        is_archived: row.get(8)?,
        archived_at: row.get(9)?,
        created_at: row.get(10)?,
    })
}

// Sync functions for pool.run() / pool.write() usage

/// Insert a new habit and return the stored row.
pub fn create_habit_sync(
    conn: &Connection,
    id: &str,
    input: &NewHabit,
    created_at: i64,
) -> Result<Habit> {
    conn.execute(
        "INSERT INTO habits (id, name, description, color, icon, target_frequency, points, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            input.name,
            input.description,
            input.color,
            input.icon,
            input.target_frequency,
            input.points,
            created_at
        ],
    )?;
    require_habit_sync(conn, id)
}

/// Get a habit by ID regardless of its active/archived state.
pub fn get_habit_sync(conn: &Connection, id: &str) -> Result<Option<Habit>> {
    let sql = format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?");
    conn.query_row(&sql, [id], parse_habit_row)
        .optional()
        .map_err(Into::into)
}

/// Get a habit that must exist (soft-deleted habits still resolve here).
pub fn require_habit_sync(conn: &Connection, id: &str) -> Result<Habit> {
    get_habit_sync(conn, id)?.ok_or_else(|| HabitError::HabitNotFound(id.to_string()))
}

/// Get an active habit; removed habits are reported as not found.
pub fn get_active_habit_sync(conn: &Connection, id: &str) -> Result<Habit> {
    match get_habit_sync(conn, id)? {
        Some(habit) if habit.is_active => Ok(habit),
        _ => Err(HabitError::HabitNotFound(id.to_string())),
    }
}

/// Active, non-archived habits, newest first.
pub fn list_habits_sync(conn: &Connection) -> Result<Vec<Habit>> {
    let sql = format!(
        "SELECT {HABIT_COLUMNS} FROM habits WHERE is_active = 1 AND is_archived = 0 \
         ORDER BY created_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], parse_habit_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Active, archived habits, most recently archived first.
pub fn list_archived_habits_sync(conn: &Connection) -> Result<Vec<Habit>> {
    let sql = format!(
        "SELECT {HABIT_COLUMNS} FROM habits WHERE is_active = 1 AND is_archived = 1 \
         ORDER BY archived_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], parse_habit_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Apply a typed partial update. Absent fields keep their stored value.
///
/// The description uses a tri-state: `None` keeps it, `Some(None)` clears
/// it, `Some(Some(text))` replaces it.
pub fn update_habit_sync(conn: &Connection, id: &str, patch: &HabitPatch) -> Result<Habit> {
    let (touch_description, description) = match &patch.description {
        None => (false, None),
        Some(value) => (true, value.as_deref()),
    };

    let updated = conn.execute(
        "UPDATE habits SET
             name = COALESCE(?2, name),
             description = CASE WHEN ?3 THEN ?4 ELSE description END,
             color = COALESCE(?5, color),
             icon = COALESCE(?6, icon),
             target_frequency = COALESCE(?7, target_frequency),
             points = COALESCE(?8, points)
         WHERE id = ?1 AND is_active = 1",
        params![
            id,
            patch.name,
            touch_description,
            description,
            patch.color,
            patch.icon,
            patch.target_frequency,
            patch.points
        ],
    )?;
    if updated == 0 {
        return Err(HabitError::HabitNotFound(id.to_string()));
    }
    require_habit_sync(conn, id)
}

/// Set or clear the archive flag. `archived_at` is stamped on archive and
/// cleared on unarchive.
pub fn set_archived_sync(
    conn: &Connection,
    id: &str,
    archived: bool,
    now: i64,
) -> Result<Habit> {
    let archived_at = archived.then_some(now);
    let updated = conn.execute(
        "UPDATE habits SET is_archived = ?2, archived_at = ?3 WHERE id = ?1 AND is_active = 1",
        params![id, archived, archived_at],
    )?;
    if updated == 0 {
        return Err(HabitError::HabitNotFound(id.to_string()));
    }
    require_habit_sync(conn, id)
}

/// Soft-delete a habit. Its completions stay in place.
pub fn deactivate_habit_sync(conn: &Connection, id: &str) -> Result<()> {
    let updated = conn.execute(
        "UPDATE habits SET is_active = 0 WHERE id = ?1 AND is_active = 1",
        [id],
    )?;
    if updated == 0 {
        return Err(HabitError::HabitNotFound(id.to_string()));
    }
    Ok(())
}
