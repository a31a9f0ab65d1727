// db/stats.rs
// UserStats singleton access

use crate::error::Result;
use habitkit_types::UserStats;
use rusqlite::{Connection, OptionalExtension, params};

/// The singleton always lives at id 1.
const STATS_ID: i64 = 1;

fn parse_user_stats_row(row: &rusqlite::Row) -> rusqlite::Result<UserStats> {
    Ok(UserStats {
        total_points: row.get(0)?,
        total_completions: row.get(1)?,
        current_streak: row.get(2)?,
        longest_streak: row.get(3)?,
        last_completion_date: row.get(4)?,
    })
}

/// Read the stats row, creating it with zero defaults if it is missing.
pub fn get_or_create_user_stats_sync(conn: &Connection) -> Result<UserStats> {
    let existing = conn
        .query_row(
            "SELECT total_points, total_completions, current_streak, longest_streak, last_completion_date
             FROM user_stats WHERE id = ?1",
            [STATS_ID],
            parse_user_stats_row,
        )
        .optional()?;

    match existing {
        Some(stats) => Ok(stats),
        None => {
            conn.execute(
                "INSERT OR IGNORE INTO user_stats (id, total_points, total_completions, current_streak, longest_streak)
                 VALUES (?1, 0, 0, 0, 0)",
                [STATS_ID],
            )?;
            Ok(UserStats::default())
        }
    }
}

/// Overwrite the stats row with a new snapshot.
pub fn save_user_stats_sync(conn: &Connection, stats: &UserStats) -> Result<()> {
    conn.execute(
        "INSERT INTO user_stats (id, total_points, total_completions, current_streak, longest_streak, last_completion_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
             total_points = excluded.total_points,
             total_completions = excluded.total_completions,
             current_streak = excluded.current_streak,
             longest_streak = excluded.longest_streak,
             last_completion_date = excluded.last_completion_date",
        params![
            STATS_ID,
            stats.total_points,
            stats.total_completions,
            stats.current_streak,
            stats.longest_streak,
            stats.last_completion_date
        ],
    )?;
    Ok(())
}
