// db/achievements.rs
// Achievement catalog and unlock persistence

use crate::error::Result;
use habitkit_types::{Achievement, AchievementKind};
use rusqlite::{Connection, params};

/// Catalog entry seeded into an empty achievements table.
struct SeedAchievement {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    kind: AchievementKind,
    requirement: i64,
    points: i64,
}

const DEFAULT_CATALOG: &[SeedAchievement] = &[
    SeedAchievement {
        id: "first_step",
        name: "First Step",
        description: "Complete your first habit",
        icon: "👣",
        kind: AchievementKind::TotalCompletions,
        requirement: 1,
        points: 10,
    },
    SeedAchievement {
        id: "getting_started",
        name: "Getting Started",
        description: "Complete 5 habits",
        icon: "🌱",
        kind: AchievementKind::TotalCompletions,
        requirement: 5,
        points: 25,
    },
    SeedAchievement {
        id: "habit_builder",
        name: "Habit Builder",
        description: "Complete 25 habits",
        icon: "🏗️",
        kind: AchievementKind::TotalCompletions,
        requirement: 25,
        points: 100,
    },
    SeedAchievement {
        id: "century_club",
        name: "Century Club",
        description: "Complete 100 habits",
        icon: "💯",
        kind: AchievementKind::TotalCompletions,
        requirement: 100,
        points: 500,
    },
    SeedAchievement {
        id: "on_fire",
        name: "On Fire!",
        description: "Maintain a 3-day streak",
        icon: "🔥",
        kind: AchievementKind::Streak,
        requirement: 3,
        points: 50,
    },
    SeedAchievement {
        id: "week_warrior",
        name: "Week Warrior",
        description: "Maintain a 7-day streak",
        icon: "⚔️",
        kind: AchievementKind::Streak,
        requirement: 7,
        points: 100,
    },
    SeedAchievement {
        id: "consistency_king",
        name: "Consistency King",
        description: "Maintain a 30-day streak",
        icon: "👑",
        kind: AchievementKind::Streak,
        requirement: 30,
        points: 1000,
    },
    SeedAchievement {
        id: "point_collector",
        name: "Point Collector",
        description: "Earn 100 points",
        icon: "⭐",
        kind: AchievementKind::Points,
        requirement: 100,
        points: 50,
    },
    SeedAchievement {
        id: "point_master",
        name: "Point Master",
        description: "Earn 1000 points",
        icon: "🌟",
        kind: AchievementKind::Points,
        requirement: 1000,
        points: 200,
    },
];

const ACHIEVEMENT_COLUMNS: &str = "id, name, description, icon, kind, requirement, points, unlocked_at";

/// Parse Achievement from a rusqlite Row with standard column order:
/// (id, name, description, icon, kind, requirement, points, unlocked_at)
pub fn parse_achievement_row(row: &rusqlite::Row) -> rusqlite::Result<Achievement> {
    let kind: String = row.get(4)?;
    let kind = kind.parse::<AchievementKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Achievement {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        kind,
        requirement: row.get(5)?,
        points: row.get(6)?,
        unlocked_at: row.get(7)?,
    })
}

/// Seed the default catalog if the table is empty. Returns rows inserted.
pub fn seed_default_achievements_sync(conn: &Connection) -> Result<usize> {
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM achievements", [], |r| r.get(0))?;
    if existing > 0 {
        return Ok(0);
    }

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO achievements (id, name, description, icon, kind, requirement, points)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    let mut inserted = 0;
    for seed in DEFAULT_CATALOG {
        inserted += stmt.execute(params![
            seed.id,
            seed.name,
            seed.description,
            seed.icon,
            seed.kind.as_str(),
            seed.requirement,
            seed.points
        ])?;
    }
    Ok(inserted)
}

/// Full catalog, lowest requirement first.
pub fn list_achievements_sync(conn: &Connection) -> Result<Vec<Achievement>> {
    let sql = format!("SELECT {ACHIEVEMENT_COLUMNS} FROM achievements ORDER BY requirement ASC, id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], parse_achievement_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Achievements still waiting to unlock, lowest requirement first.
pub fn locked_achievements_sync(conn: &Connection) -> Result<Vec<Achievement>> {
    let sql = format!(
        "SELECT {ACHIEVEMENT_COLUMNS} FROM achievements WHERE unlocked_at IS NULL \
         ORDER BY requirement ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], parse_achievement_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Stamp an achievement as unlocked. Returns false if it was already
/// unlocked (or does not exist), so unlocks stay one-shot.
pub fn unlock_achievement_sync(conn: &Connection, id: &str, unlocked_at: i64) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE achievements SET unlocked_at = ?2 WHERE id = ?1 AND unlocked_at IS NULL",
        params![id, unlocked_at],
    )?;
    Ok(updated > 0)
}

/// Sum of bonus points from every unlocked achievement.
pub fn unlocked_bonus_total_sync(conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT COALESCE(SUM(points), 0) FROM achievements WHERE unlocked_at IS NOT NULL",
        [],
        |row| row.get(0),
    )
    .map_err(Into::into)
}
