// crates/habitkit/src/engine/aggregation.rs
// Derived UserStats: incremental updates, rollback, and full recomputation
//
// Everything here is pure. Callers load the inputs inside a transaction and
// persist the returned snapshot in the same transaction.

use crate::calendar::{days_between, format_day, parse_day};
use crate::error::{HabitError, Result};
use chrono::NaiveDate;
use habitkit_types::UserStats;

/// Add `points` to a running total, refusing to overflow.
pub fn add_points(total: i64, points: i64) -> Result<i64> {
    total.checked_add(points).ok_or_else(|| {
        HabitError::InvalidInput(format!(
            "point total would overflow ({total} + {points})"
        ))
    })
}

/// Fold one new completion on `day` into the previous snapshot.
///
/// Gaps are measured from `last_completion_date`: same day keeps the
/// streak, the next day extends it, anything later restarts it at 1. A
/// backfilled day (earlier than the last completion) counts toward the
/// totals but leaves the streak and last date alone.
pub fn apply_completion(prev: &UserStats, day: NaiveDate, points: i64) -> Result<UserStats> {
    let mut next = prev.clone();
    next.total_points = add_points(prev.total_points, points)?;
    next.total_completions = add_points(prev.total_completions, 1)?;

    let last = prev.last_completion_date.as_deref().map(parse_day).transpose()?;
    match last {
        None => {
            next.current_streak = 1;
            next.last_completion_date = Some(format_day(day));
        }
        Some(last) => {
            let gap = days_between(last, day);
            if gap < 0 {
                tracing::debug!(
                    day = %day,
                    last = %last,
                    "Backfilled completion; streak unchanged"
                );
                return Ok(next);
            }
            match gap {
                0 => {}
                1 => next.current_streak += 1,
                _ => next.current_streak = 1,
            }
            next.last_completion_date = Some(format_day(day));
        }
    }

    next.longest_streak = next.longest_streak.max(next.current_streak);
    Ok(next)
}

/// Length of the run of consecutive days ending exactly at `today`.
///
/// `dates` must be distinct and sorted newest first. Returns 0 when there is
/// no completion on `today`.
pub fn streak_ending_at(dates: &[NaiveDate], today: NaiveDate) -> i64 {
    let mut expected = today;
    let mut streak = 0;
    for &day in dates {
        if day > expected {
            // Future-dated rows do not break the scan
            continue;
        }
        if day != expected {
            break;
        }
        streak += 1;
        match expected.pred_opt() {
            Some(prev) => expected = prev,
            None => break,
        }
    }
    streak
}

/// Longest run of consecutive days anywhere in `dates` (any order,
/// duplicates allowed).
pub fn longest_run(dates: &[NaiveDate]) -> i64 {
    let mut sorted = dates.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut best = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for day in sorted {
        run = match previous {
            Some(p) if days_between(p, day) == 1 => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(day);
    }
    best
}

/// Compensate for a removed completion worth `points`.
///
/// `remaining` holds the distinct days still on record, newest first. The
/// current streak is rescanned from `today`; `longest_streak` never drops.
pub fn rollback_completion(
    prev: &UserStats,
    points: i64,
    remaining: &[NaiveDate],
    today: NaiveDate,
) -> UserStats {
    let current_streak = streak_ending_at(remaining, today);
    UserStats {
        total_points: (prev.total_points - points).max(0),
        total_completions: (prev.total_completions - 1).max(0),
        current_streak,
        longest_streak: prev.longest_streak.max(current_streak),
        last_completion_date: remaining.first().map(|d| format_day(*d)),
    }
}

/// Rebuild the snapshot from stored rows.
///
/// Totals come from the completion rows plus unlocked bonuses; the current
/// streak is rescanned from `today`; `longest_streak` keeps the previous
/// high-water mark.
pub fn recompute(
    prev: &UserStats,
    completion_count: i64,
    completion_points: i64,
    bonus_points: i64,
    dates: &[NaiveDate],
    today: NaiveDate,
) -> Result<UserStats> {
    let mut newest_first = dates.to_vec();
    newest_first.sort_unstable_by(|a, b| b.cmp(a));
    newest_first.dedup();

    let current_streak = streak_ending_at(&newest_first, today);
    let longest_streak = prev
        .longest_streak
        .max(longest_run(&newest_first))
        .max(current_streak);

    Ok(UserStats {
        total_points: add_points(completion_points, bonus_points)?,
        total_completions: completion_count,
        current_streak,
        longest_streak,
        last_completion_date: newest_first.first().map(|d| format_day(*d)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_day(s).unwrap()
    }

    fn days(list: &[&str]) -> Vec<NaiveDate> {
        list.iter().map(|s| d(s)).collect()
    }

    // ============================================================================
    // apply_completion tests
    // ============================================================================

    #[test]
    fn test_first_completion_starts_streak() {
        let stats = apply_completion(&UserStats::default(), d("2024-01-01"), 10).unwrap();
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 1);
        assert_eq!(stats.total_points, 10);
        assert_eq!(stats.total_completions, 1);
        assert_eq!(stats.last_completion_date.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn test_consecutive_days_extend_streak() {
        let mut stats = UserStats::default();
        let mut streaks = Vec::new();
        for day in ["2024-01-01", "2024-01-02", "2024-01-03"] {
            stats = apply_completion(&stats, d(day), 10).unwrap();
            streaks.push(stats.current_streak);
        }
        assert_eq!(streaks, [1, 2, 3]);
        assert_eq!(stats.longest_streak, 3);
        assert_eq!(stats.total_points, 30);
    }

    #[test]
    fn test_same_day_keeps_streak() {
        let stats = apply_completion(&UserStats::default(), d("2024-01-01"), 10).unwrap();
        let stats = apply_completion(&stats, d("2024-01-01"), 5).unwrap();
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.total_completions, 2);
        assert_eq!(stats.total_points, 15);
    }

    #[test]
    fn test_gap_resets_streak() {
        let stats = apply_completion(&UserStats::default(), d("2024-01-01"), 10).unwrap();
        let stats = apply_completion(&stats, d("2024-01-06"), 10).unwrap();
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 1);
    }

    #[test]
    fn test_streak_across_month_boundary() {
        let stats = apply_completion(&UserStats::default(), d("2024-02-29"), 1).unwrap();
        let stats = apply_completion(&stats, d("2024-03-01"), 1).unwrap();
        assert_eq!(stats.current_streak, 2);
    }

    #[test]
    fn test_longest_streak_never_drops() {
        let mut stats = UserStats::default();
        for day in ["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-10"] {
            stats = apply_completion(&stats, d(day), 1).unwrap();
        }
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 3);
    }

    #[test]
    fn test_backfill_keeps_streak_and_last_date() {
        let stats = apply_completion(&UserStats::default(), d("2024-01-05"), 10).unwrap();
        let stats = apply_completion(&stats, d("2024-01-02"), 10).unwrap();
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.last_completion_date.as_deref(), Some("2024-01-05"));
        assert_eq!(stats.total_completions, 2);
        assert_eq!(stats.total_points, 20);
    }

    #[test]
    fn test_point_overflow_is_an_error() {
        let prev = UserStats {
            total_points: i64::MAX - 5,
            ..Default::default()
        };
        let err = apply_completion(&prev, d("2024-01-01"), 10).unwrap_err();
        assert!(matches!(err, HabitError::InvalidInput(_)));

        let stats = apply_completion(&prev, d("2024-01-01"), 5).unwrap();
        assert_eq!(stats.total_points, i64::MAX);
    }

    #[test]
    fn test_recompute_rejects_overflowing_bonus() {
        let err = recompute(&UserStats::default(), 1, i64::MAX, 1, &[], d("2024-01-01")).unwrap_err();
        assert!(matches!(err, HabitError::InvalidInput(_)));
    }

    #[test]
    fn test_corrupt_last_date_is_an_error() {
        let prev = UserStats {
            last_completion_date: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(apply_completion(&prev, d("2024-01-01"), 1).is_err());
    }

    // ============================================================================
    // streak scan tests
    // ============================================================================

    #[test]
    fn test_streak_ending_at_today() {
        let dates = days(&["2024-01-03", "2024-01-02", "2024-01-01"]);
        assert_eq!(streak_ending_at(&dates, d("2024-01-03")), 3);
        assert_eq!(streak_ending_at(&dates, d("2024-01-02")), 2);
        // Nothing on "today" means no active streak
        assert_eq!(streak_ending_at(&dates, d("2024-01-04")), 0);
    }

    #[test]
    fn test_streak_stops_at_first_gap() {
        let dates = days(&["2024-01-05", "2024-01-04", "2024-01-02", "2024-01-01"]);
        assert_eq!(streak_ending_at(&dates, d("2024-01-05")), 2);
        assert_eq!(streak_ending_at(&[], d("2024-01-05")), 0);
    }

    #[test]
    fn test_longest_run() {
        let dates = days(&["2024-01-10", "2024-01-01", "2024-01-02", "2024-01-03", "2024-01-02"]);
        assert_eq!(longest_run(&dates), 3);
        assert_eq!(longest_run(&[]), 0);
    }

    // ============================================================================
    // rollback tests
    // ============================================================================

    #[test]
    fn test_rollback_rescans_from_today() {
        let prev = UserStats {
            total_points: 30,
            total_completions: 3,
            current_streak: 3,
            longest_streak: 3,
            last_completion_date: Some("2024-01-03".to_string()),
        };
        let remaining = days(&["2024-01-02", "2024-01-01"]);

        let on_second = rollback_completion(&prev, 10, &remaining, d("2024-01-02"));
        assert_eq!(on_second.total_points, 20);
        assert_eq!(on_second.total_completions, 2);
        assert_eq!(on_second.current_streak, 2);
        assert_eq!(on_second.longest_streak, 3);
        assert_eq!(on_second.last_completion_date.as_deref(), Some("2024-01-02"));

        let later = rollback_completion(&prev, 10, &remaining, d("2024-01-03"));
        assert_eq!(later.current_streak, 0);
        assert_eq!(later.longest_streak, 3);
    }

    #[test]
    fn test_rollback_floors_at_zero() {
        let prev = UserStats {
            total_points: 5,
            ..Default::default()
        };
        let stats = rollback_completion(&prev, 10, &[], d("2024-01-01"));
        assert_eq!(stats.total_points, 0);
        assert_eq!(stats.total_completions, 0);
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.last_completion_date, None);
    }

    // ============================================================================
    // recompute tests
    // ============================================================================

    #[test]
    fn test_recompute_from_rows() {
        let prev = UserStats {
            total_points: 999,
            total_completions: 42,
            current_streak: 9,
            longest_streak: 9,
            last_completion_date: Some("2023-12-01".to_string()),
        };
        let dates = days(&["2024-01-01", "2024-01-02", "2024-01-02", "2024-01-03"]);

        let stats = recompute(&prev, 4, 40, 10, &dates, d("2024-01-03")).unwrap();
        assert_eq!(stats.total_completions, 4);
        assert_eq!(stats.total_points, 50);
        assert_eq!(stats.current_streak, 3);
        assert_eq!(stats.longest_streak, 9);
        assert_eq!(stats.last_completion_date.as_deref(), Some("2024-01-03"));
    }

    #[test]
    fn test_recompute_raises_longest_from_history() {
        let dates = days(&["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"]);
        let stats = recompute(&UserStats::default(), 4, 4, 0, &dates, d("2024-02-01")).unwrap();
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.longest_streak, 4);
    }
}
