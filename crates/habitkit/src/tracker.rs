// crates/habitkit/src/tracker.rs
// HabitTracker: the capability surface over the store and engine
//
// The tracker is explicitly constructed and owns its lifecycle. Nothing is
// reachable until `open()` has run the migrations; after `close()` every
// call fails with `NotInitialized` again.

use crate::calendar::{Clock, SystemClock, format_day, parse_day};
use crate::db::{self, DatabasePool};
use crate::engine;
use crate::error::{HabitError, Result};
use chrono::{Days, NaiveDate};
use habitkit_types::{
    Achievement, Completion, CompletionReceipt, DailyTotal, Habit, HabitPatch, NewHabit,
    UndoReceipt, UserStats,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Where the store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    InMemory,
}

/// Allowed range for a habit's weekly target.
const TARGET_FREQUENCY_RANGE: std::ops::RangeInclusive<i64> = 1..=7;

pub struct HabitTracker {
    location: StoreLocation,
    clock: Arc<dyn Clock>,
    pool: RwLock<Option<Arc<DatabasePool>>>,
}

impl HabitTracker {
    pub fn new(location: StoreLocation, clock: Arc<dyn Clock>) -> Self {
        Self {
            location,
            clock,
            pool: RwLock::new(None),
        }
    }

    /// File-backed tracker on the system clock.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self::new(StoreLocation::File(path.into()), Arc::new(SystemClock))
    }

    /// Open the store and run migrations. Calling it again is a no-op.
    pub async fn open(&self) -> Result<()> {
        let mut guard = self.pool.write().await;
        if guard.is_some() {
            return Ok(());
        }

        let pool = match &self.location {
            StoreLocation::File(path) => DatabasePool::open(path).await?,
            StoreLocation::InMemory => DatabasePool::open_in_memory().await?,
        };
        tracing::info!(location = ?self.location, "Habit store opened");
        *guard = Some(Arc::new(pool));
        Ok(())
    }

    /// Close the store. Later calls fail with `NotInitialized` until reopened.
    pub async fn close(&self) {
        if let Some(pool) = self.pool.write().await.take() {
            pool.close();
            tracing::info!("Habit store closed");
        }
    }

    pub async fn is_open(&self) -> bool {
        self.pool.read().await.is_some()
    }

    /// Database file path, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            StoreLocation::File(path) => Some(path),
            StoreLocation::InMemory => None,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    async fn pool(&self) -> Result<Arc<DatabasePool>> {
        self.pool
            .read()
            .await
            .clone()
            .ok_or(HabitError::NotInitialized)
    }

    /// Persisted schema version.
    pub async fn schema_version(&self) -> Result<u32> {
        self.pool()
            .await?
            .run_with_retry(|conn| db::schema::current_version(conn))
            .await
    }

    // ═══════════════════════════════════════
    // Habits
    // ═══════════════════════════════════════

    /// Active, non-archived habits, newest first.
    pub async fn list_habits(&self) -> Result<Vec<Habit>> {
        self.pool().await?.run_with_retry(|conn| db::list_habits_sync(conn)).await
    }

    pub async fn list_archived_habits(&self) -> Result<Vec<Habit>> {
        self.pool()
            .await?
            .run_with_retry(|conn| db::list_archived_habits_sync(conn))
            .await
    }

    pub async fn get_habit(&self, id: &str) -> Result<Option<Habit>> {
        let id = id.to_string();
        self.pool()
            .await?
            .run_with_retry(move |conn| db::get_habit_sync(conn, &id))
            .await
    }

    pub async fn create_habit(&self, input: NewHabit) -> Result<Habit> {
        validate_new_habit(&input)?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = self.clock.now_millis();
        let habit = self
            .pool()
            .await?
            .write(move |tx| db::create_habit_sync(tx, &id, &input, now))
            .await?;
        tracing::info!(id = %habit.id, name = %habit.name, "Habit created");
        Ok(habit)
    }

    pub async fn update_habit(&self, id: &str, patch: HabitPatch) -> Result<Habit> {
        validate_patch(&patch)?;
        let id = id.to_string();
        self.pool()
            .await?
            .write(move |tx| db::update_habit_sync(tx, &id, &patch))
            .await
    }

    pub async fn archive_habit(&self, id: &str) -> Result<Habit> {
        self.set_archived(id, true).await
    }

    pub async fn unarchive_habit(&self, id: &str) -> Result<Habit> {
        self.set_archived(id, false).await
    }

    async fn set_archived(&self, id: &str, archived: bool) -> Result<Habit> {
        let id = id.to_string();
        let now = self.clock.now_millis();
        let habit = self
            .pool()
            .await?
            .write(move |tx| db::set_archived_sync(tx, &id, archived, now))
            .await?;
        tracing::info!(id = %habit.id, archived, "Habit archive flag changed");
        Ok(habit)
    }

    /// Soft-delete. Completions and stats are kept.
    pub async fn remove_habit(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.pool()
            .await?
            .write(move |tx| db::deactivate_habit_sync(tx, &id))
            .await
    }

    // ═══════════════════════════════════════
    // Completions
    // ═══════════════════════════════════════

    /// Record a completion for `date` (`YYYY-MM-DD`) and update derived state.
    pub async fn complete_habit(&self, habit_id: &str, date: &str) -> Result<CompletionReceipt> {
        let day = parse_day(date)?;
        let habit_id = habit_id.to_string();
        let now = self.clock.now_millis();
        // Generated once so a contention retry reuses the same id
        let completion_id = uuid::Uuid::new_v4().to_string();
        self.pool()
            .await?
            .write(move |tx| engine::complete_habit_sync(tx, &habit_id, day, now, &completion_id))
            .await
    }

    /// Remove the completion row only. Pair with [`rollback_stats`](Self::rollback_stats).
    pub async fn undo_completion(&self, habit_id: &str, date: &str) -> Result<Option<Completion>> {
        let day = parse_day(date)?;
        let habit_id = habit_id.to_string();
        self.pool()
            .await?
            .write(move |tx| engine::undo_completion_sync(tx, &habit_id, day))
            .await
    }

    /// Compensate the stats for a removed completion worth `points` on `date`.
    pub async fn rollback_stats(&self, points: i64, date: &str) -> Result<UserStats> {
        let day = parse_day(date)?;
        let today = self.clock.today();
        self.pool()
            .await?
            .write(move |tx| engine::rollback_stats_sync(tx, points, day, today))
            .await
    }

    /// Remove a completion and compensate the stats in one transaction.
    pub async fn undo_and_rollback(&self, habit_id: &str, date: &str) -> Result<Option<UndoReceipt>> {
        let day = parse_day(date)?;
        let habit_id = habit_id.to_string();
        let today = self.clock.today();
        self.pool()
            .await?
            .write(move |tx| engine::undo_and_rollback_sync(tx, &habit_id, day, today))
            .await
    }

    pub async fn completions_for_date(&self, date: &str) -> Result<Vec<Completion>> {
        let date = format_day(parse_day(date)?);
        self.pool()
            .await?
            .run_with_retry(move |conn| db::completions_for_date_sync(conn, &date))
            .await
    }

    pub async fn today_completions(&self) -> Result<Vec<Completion>> {
        let today = format_day(self.clock.today());
        self.pool()
            .await?
            .run_with_retry(move |conn| db::completions_for_date_sync(conn, &today))
            .await
    }

    /// Completions of one habit over the last `days` days, today included,
    /// newest first.
    pub async fn habit_history(&self, habit_id: &str, days: u32) -> Result<Vec<Completion>> {
        if days == 0 {
            return Err(HabitError::InvalidInput("days must be at least 1".to_string()));
        }
        let since = self
            .clock
            .today()
            .checked_sub_days(Days::new(u64::from(days) - 1))
            .unwrap_or(NaiveDate::MIN);
        let since = format_day(since);
        let habit_id = habit_id.to_string();
        self.pool()
            .await?
            .run_with_retry(move |conn| db::habit_history_sync(conn, &habit_id, &since))
            .await
    }

    /// Per-day completion counts in `[start, end]`.
    pub async fn get_weekly_progress(&self, start: &str, end: &str) -> Result<Vec<DailyTotal>> {
        let (start_day, end_day) = (parse_day(start)?, parse_day(end)?);
        if start_day > end_day {
            return Err(HabitError::InvalidInput(format!(
                "range start {start} is after end {end}"
            )));
        }
        let (start, end) = (format_day(start_day), format_day(end_day));
        self.pool()
            .await?
            .run_with_retry(move |conn| db::daily_totals_sync(conn, &start, &end))
            .await
    }

    // ═══════════════════════════════════════
    // Stats & achievements
    // ═══════════════════════════════════════

    pub async fn get_user_stats(&self) -> Result<UserStats> {
        // Lazily creating the row is a write
        self.pool()
            .await?
            .write(|tx| db::get_or_create_user_stats_sync(tx))
            .await
    }

    pub async fn list_achievements(&self) -> Result<Vec<Achievement>> {
        self.pool()
            .await?
            .run_with_retry(|conn| db::list_achievements_sync(conn))
            .await
    }

    /// Run the evaluator against the stored stats; returns new unlocks.
    pub async fn evaluate_achievements(&self) -> Result<Vec<Achievement>> {
        let now = self.clock.now_millis();
        self.pool()
            .await?
            .write(move |tx| engine::evaluate_achievements_sync(tx, now))
            .await
    }

    /// Rebuild the stats from the stored completions and unlocked bonuses.
    pub async fn reconcile_stats(&self) -> Result<UserStats> {
        let today = self.clock.today();
        self.pool()
            .await?
            .write(move |tx| engine::reconcile_stats_sync(tx, today))
            .await
    }
}

fn validate_new_habit(input: &NewHabit) -> Result<()> {
    validate_name(&input.name)?;
    validate_points(input.points)?;
    validate_target_frequency(input.target_frequency)
}

fn validate_patch(patch: &HabitPatch) -> Result<()> {
    if let Some(name) = &patch.name {
        validate_name(name)?;
    }
    if let Some(points) = patch.points {
        validate_points(points)?;
    }
    if let Some(target) = patch.target_frequency {
        validate_target_frequency(target)?;
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(HabitError::InvalidInput("habit name must not be empty".to_string()));
    }
    Ok(())
}

fn validate_points(points: i64) -> Result<()> {
    if points < 0 {
        return Err(HabitError::InvalidInput(format!(
            "points must be non-negative, got {points}"
        )));
    }
    Ok(())
}

fn validate_target_frequency(target: i64) -> Result<()> {
    if !TARGET_FREQUENCY_RANGE.contains(&target) {
        return Err(HabitError::InvalidInput(format!(
            "target frequency must be between 1 and 7 days per week, got {target}"
        )));
    }
    Ok(())
}
