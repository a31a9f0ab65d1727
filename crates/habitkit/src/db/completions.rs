// db/completions.rs
// Completion database operations

use crate::error::{HabitError, Result};
use habitkit_types::{Completion, DailyTotal};
use rusqlite::{Connection, OptionalExtension, params};

const COMPLETION_COLUMNS: &str = "id, habit_id, date, points, completed_at";

/// Parse Completion from a rusqlite Row with standard column order:
/// (id, habit_id, date, points, completed_at)
pub fn parse_completion_row(row: &rusqlite::Row) -> rusqlite::Result<Completion> {
    Ok(Completion {
        id: row.get(0)?,
        habit_id: row.get(1)?,
        date: row.get(2)?,
        points: row.get(3)?,
        completed_at: row.get(4)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

// Sync functions for pool.run() / pool.write() usage

/// Get the completion for (habit_id, date), if any.
pub fn get_completion_sync(
    conn: &Connection,
    habit_id: &str,
    date: &str,
) -> Result<Option<Completion>> {
    let sql = format!("SELECT {COMPLETION_COLUMNS} FROM completions WHERE habit_id = ?1 AND date = ?2");
    conn.query_row(&sql, params![habit_id, date], parse_completion_row)
        .optional()
        .map_err(Into::into)
}

/// Record a completion.
///
/// Checks for an existing row first; the unique index on (habit_id, date)
/// backs that up and its violation maps to the same error.
pub fn insert_completion_sync(conn: &Connection, completion: &Completion) -> Result<()> {
    let duplicate = || HabitError::DuplicateCompletion {
        habit_id: completion.habit_id.clone(),
        date: completion.date.clone(),
    };

    if get_completion_sync(conn, &completion.habit_id, &completion.date)?.is_some() {
        return Err(duplicate());
    }

    conn.execute(
        "INSERT INTO completions (id, habit_id, date, points, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            completion.id,
            completion.habit_id,
            completion.date,
            completion.points,
            completion.completed_at
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            duplicate()
        } else {
            e.into()
        }
    })?;
    Ok(())
}

/// Delete the completion for (habit_id, date) and return what was removed.
pub fn delete_completion_sync(
    conn: &Connection,
    habit_id: &str,
    date: &str,
) -> Result<Option<Completion>> {
    let Some(existing) = get_completion_sync(conn, habit_id, date)? else {
        return Ok(None);
    };
    conn.execute("DELETE FROM completions WHERE id = ?1", [&existing.id])?;
    Ok(Some(existing))
}

/// All completions recorded for one day, in completion order.
pub fn completions_for_date_sync(conn: &Connection, date: &str) -> Result<Vec<Completion>> {
    let sql = format!(
        "SELECT {COMPLETION_COLUMNS} FROM completions WHERE date = ?1 ORDER BY completed_at ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([date], parse_completion_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Completions with `start <= date <= end`, oldest day first.
pub fn completions_in_range_sync(
    conn: &Connection,
    start: &str,
    end: &str,
) -> Result<Vec<Completion>> {
    let sql = format!(
        "SELECT {COMPLETION_COLUMNS} FROM completions WHERE date BETWEEN ?1 AND ?2 \
         ORDER BY date ASC, completed_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![start, end], parse_completion_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Per-day completion counts in `[start, end]`. Days without completions
/// are omitted.
pub fn daily_totals_sync(conn: &Connection, start: &str, end: &str) -> Result<Vec<DailyTotal>> {
    let mut stmt = conn.prepare(
        "SELECT date, COUNT(*) FROM completions WHERE date BETWEEN ?1 AND ?2 \
         GROUP BY date ORDER BY date ASC",
    )?;
    let rows = stmt.query_map(params![start, end], |row| {
        Ok(DailyTotal {
            date: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// One habit's completions on or after `since`, newest day first.
pub fn habit_history_sync(conn: &Connection, habit_id: &str, since: &str) -> Result<Vec<Completion>> {
    let sql = format!(
        "SELECT {COMPLETION_COLUMNS} FROM completions WHERE habit_id = ?1 AND date >= ?2 \
         ORDER BY date DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![habit_id, since], parse_completion_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Every distinct day with at least one completion, newest first.
pub fn distinct_completion_dates_sync(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT date FROM completions ORDER BY date DESC")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect::<rusqlite::Result<Vec<String>>>().map_err(Into::into)
}

/// Row count and summed points across every completion.
pub fn completion_totals_sync(conn: &Connection) -> Result<(i64, i64)> {
    conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(points), 0) FROM completions",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .map_err(Into::into)
}
