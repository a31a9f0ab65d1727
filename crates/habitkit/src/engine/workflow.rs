// crates/habitkit/src/engine/workflow.rs
// Completion workflow and its compensating undo path
//
// Each function here expects to run inside one write transaction
// (`DatabasePool::write`). A failure at any step returns an error and the
// caller's transaction rolls back every earlier step.

use super::aggregation::{add_points, apply_completion, recompute, rollback_completion};
use super::evaluator::evaluate;
use crate::calendar::{format_day, parse_day};
use crate::db::{
    completion_totals_sync, delete_completion_sync, distinct_completion_dates_sync,
    get_active_habit_sync, get_completion_sync, get_or_create_user_stats_sync,
    insert_completion_sync, locked_achievements_sync, save_user_stats_sync,
    unlock_achievement_sync, unlocked_bonus_total_sync,
};
use crate::error::{HabitError, Result};
use chrono::NaiveDate;
use habitkit_types::{Achievement, Completion, CompletionReceipt, UndoReceipt, UserStats};
use rusqlite::Connection;
use std::fmt;

/// Stages a completion request moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    Requested,
    Validated,
    Recorded,
    Aggregated,
    Evaluated,
    Done,
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowStep::Requested => "requested",
            WorkflowStep::Validated => "validated",
            WorkflowStep::Recorded => "recorded",
            WorkflowStep::Aggregated => "aggregated",
            WorkflowStep::Evaluated => "evaluated",
            WorkflowStep::Done => "done",
        };
        f.write_str(name)
    }
}

fn step(habit_id: &str, day: &str, step: WorkflowStep) {
    tracing::debug!(habit_id, day, %step, "Completion workflow");
}

/// Record a completion of `habit_id` on `day` and bring derived state along.
///
/// Validates the habit and the (habit, day) pair, inserts the completion
/// with the habit's current points, folds it into the stats, then runs the
/// achievement evaluator against the new snapshot.
pub fn complete_habit_sync(
    conn: &Connection,
    habit_id: &str,
    day: NaiveDate,
    now: i64,
    completion_id: &str,
) -> Result<CompletionReceipt> {
    let date = format_day(day);
    step(habit_id, &date, WorkflowStep::Requested);

    let habit = get_active_habit_sync(conn, habit_id)?;
    if get_completion_sync(conn, habit_id, &date)?.is_some() {
        return Err(HabitError::DuplicateCompletion {
            habit_id: habit_id.to_string(),
            date,
        });
    }
    step(habit_id, &date, WorkflowStep::Validated);

    let completion = Completion {
        id: completion_id.to_string(),
        habit_id: habit.id.clone(),
        date: date.clone(),
        points: habit.points,
        completed_at: now,
    };
    insert_completion_sync(conn, &completion)?;
    step(habit_id, &date, WorkflowStep::Recorded);

    let prev = get_or_create_user_stats_sync(conn)?;
    let stats = apply_completion(&prev, day, habit.points)?;
    save_user_stats_sync(conn, &stats)?;
    step(habit_id, &date, WorkflowStep::Aggregated);

    let newly_unlocked = evaluate_with_sync(conn, &stats, now)?;
    step(habit_id, &date, WorkflowStep::Evaluated);

    tracing::info!(
        habit_id,
        date = %date,
        points = habit.points,
        streak = stats.current_streak,
        unlocked = newly_unlocked.len(),
        "Habit completed"
    );
    step(habit_id, &date, WorkflowStep::Done);

    Ok(CompletionReceipt {
        completion_id: completion.id,
        newly_unlocked,
    })
}

/// Run the evaluator against the stored stats snapshot.
pub fn evaluate_achievements_sync(conn: &Connection, now: i64) -> Result<Vec<Achievement>> {
    let stats = get_or_create_user_stats_sync(conn)?;
    evaluate_with_sync(conn, &stats, now)
}

fn evaluate_with_sync(conn: &Connection, stats: &UserStats, now: i64) -> Result<Vec<Achievement>> {
    let locked = locked_achievements_sync(conn)?;
    let evaluation = evaluate(stats, &locked, now)?;
    if evaluation.unlocked.is_empty() {
        return Ok(Vec::new());
    }

    let mut awarded = Vec::with_capacity(evaluation.unlocked.len());
    let mut bonus_stats = stats.clone();
    for achievement in evaluation.unlocked {
        // Guarded by unlocked_at IS NULL; a concurrent unlock is skipped
        if unlock_achievement_sync(conn, &achievement.id, now)? {
            bonus_stats.total_points = add_points(bonus_stats.total_points, achievement.points)?;
            tracing::info!(
                id = %achievement.id,
                name = %achievement.name,
                bonus = achievement.points,
                "Achievement unlocked"
            );
            awarded.push(achievement);
        }
    }
    save_user_stats_sync(conn, &bonus_stats)?;
    Ok(awarded)
}

/// Remove the completion row for (habit_id, day). Stats are untouched;
/// pair with [`rollback_stats_sync`].
pub fn undo_completion_sync(
    conn: &Connection,
    habit_id: &str,
    day: NaiveDate,
) -> Result<Option<Completion>> {
    let date = format_day(day);
    let removed = delete_completion_sync(conn, habit_id, &date)?;
    match &removed {
        Some(c) => tracing::info!(habit_id, date = %date, points = c.points, "Completion removed"),
        None => tracing::debug!(habit_id, date = %date, "No completion to remove"),
    }
    Ok(removed)
}

/// Compensate the stats for a removed completion worth `points`.
///
/// `day` is only logged. The result depends on `points`, the remaining
/// completion rows and `today`, not on which day was removed. The current
/// streak is rescanned from `today` over the remaining rows; the longest
/// streak and unlocked achievements stay as they are.
pub fn rollback_stats_sync(
    conn: &Connection,
    points: i64,
    day: NaiveDate,
    today: NaiveDate,
) -> Result<UserStats> {
    if points < 0 {
        return Err(HabitError::InvalidInput(format!(
            "rollback points must be non-negative, got {points}"
        )));
    }

    let prev = get_or_create_user_stats_sync(conn)?;
    let remaining = remaining_dates_sync(conn)?;
    let stats = rollback_completion(&prev, points, &remaining, today);
    save_user_stats_sync(conn, &stats)?;

    tracing::info!(
        day = %day,
        points,
        streak = stats.current_streak,
        "Stats rolled back"
    );
    Ok(stats)
}

/// Remove a completion and compensate the stats in one step.
pub fn undo_and_rollback_sync(
    conn: &Connection,
    habit_id: &str,
    day: NaiveDate,
    today: NaiveDate,
) -> Result<Option<UndoReceipt>> {
    let Some(removed) = undo_completion_sync(conn, habit_id, day)? else {
        return Ok(None);
    };
    let stats = rollback_stats_sync(conn, removed.points, day, today)?;
    Ok(Some(UndoReceipt { removed, stats }))
}

/// Rebuild the stats snapshot from the completion rows and unlocked bonuses.
pub fn reconcile_stats_sync(conn: &Connection, today: NaiveDate) -> Result<UserStats> {
    let prev = get_or_create_user_stats_sync(conn)?;
    let (count, points) = completion_totals_sync(conn)?;
    let bonus = unlocked_bonus_total_sync(conn)?;
    let dates = remaining_dates_sync(conn)?;

    let stats = recompute(&prev, count, points, bonus, &dates, today)?;
    save_user_stats_sync(conn, &stats)?;

    if stats != prev {
        tracing::warn!(
            before = ?prev,
            after = ?stats,
            "Stats drifted from completion history; reconciled"
        );
    }
    Ok(stats)
}

/// Distinct completion days, newest first.
fn remaining_dates_sync(conn: &Connection) -> Result<Vec<NaiveDate>> {
    distinct_completion_dates_sync(conn)?
        .iter()
        .map(|d| parse_day(d))
        .collect()
}
