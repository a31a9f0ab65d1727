// crates/habitkit/src/db/habits_tests.rs
// Tests for habit database operations

use super::test_support::{
    db, insert_raw_completion, new_habit, setup_test_pool, setup_test_pool_with_habit,
};
use super::{
    create_habit_sync, deactivate_habit_sync, get_active_habit_sync, get_habit_sync,
    list_archived_habits_sync, list_habits_sync, set_archived_sync, update_habit_sync,
};
use crate::error::HabitError;
use habitkit_types::HabitPatch;

#[cfg(test)]
mod tests {
    use super::*;

    // ═══════════════════════════════════════
    // create / get Tests
    // ═══════════════════════════════════════

    #[tokio::test]
    async fn test_create_habit_defaults() {
        let (pool, habit) = setup_test_pool_with_habit(10).await;

        assert_eq!(habit.id, "habit-1");
        assert_eq!(habit.name, "Read");
        assert_eq!(habit.points, 10);
        assert!(habit.is_active);
        assert!(!habit.is_archived);
        assert_eq!(habit.archived_at, None);
        assert_eq!(habit.created_at, 1_000);

        let fetched = db!(pool, |conn| get_habit_sync(conn, "habit-1")).unwrap();
        assert_eq!(fetched, habit);
    }

    #[tokio::test]
    async fn test_get_missing_habit() {
        let pool = setup_test_pool().await;
        assert!(db!(pool, |conn| get_habit_sync(conn, "nope")).is_none());

        let err = pool
            .run(|conn| get_active_habit_sync(conn, "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, HabitError::HabitNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_list_habits_newest_first() {
        let pool = setup_test_pool().await;
        pool.write(|tx| {
            create_habit_sync(tx, "a", &new_habit("Older", 5), 1)?;
            create_habit_sync(tx, "b", &new_habit("Newer", 5), 2)?;
            Ok(())
        })
        .await
        .unwrap();

        let habits = db!(pool, |conn| list_habits_sync(conn));
        let names: Vec<_> = habits.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["Newer", "Older"]);
    }

    // ═══════════════════════════════════════
    // update Tests
    // ═══════════════════════════════════════

    #[tokio::test]
    async fn test_update_habit_partial() {
        let (pool, _) = setup_test_pool_with_habit(10).await;

        let patch = HabitPatch {
            name: Some("Read more".to_string()),
            description: Some(Some("20 pages".to_string())),
            points: Some(15),
            ..Default::default()
        };
        let updated = pool
            .write(move |tx| update_habit_sync(tx, "habit-1", &patch))
            .await
            .unwrap();

        assert_eq!(updated.name, "Read more");
        assert_eq!(updated.description.as_deref(), Some("20 pages"));
        assert_eq!(updated.points, 15);
        // Untouched fields survive
        assert_eq!(updated.color, "#4caf50");
        assert_eq!(updated.target_frequency, 7);
    }

    #[tokio::test]
    async fn test_update_habit_clears_description() {
        let (pool, _) = setup_test_pool_with_habit(10).await;
        let set = HabitPatch {
            description: Some(Some("temp".to_string())),
            ..Default::default()
        };
        pool.write(move |tx| update_habit_sync(tx, "habit-1", &set))
            .await
            .unwrap();

        let clear = HabitPatch {
            description: Some(None),
            ..Default::default()
        };
        let updated = pool
            .write(move |tx| update_habit_sync(tx, "habit-1", &clear))
            .await
            .unwrap();
        assert_eq!(updated.description, None);
    }

    #[tokio::test]
    async fn test_update_missing_habit() {
        let pool = setup_test_pool().await;
        let err = pool
            .write(|tx| update_habit_sync(tx, "ghost", &HabitPatch::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, HabitError::HabitNotFound(_)));
    }

    // ═══════════════════════════════════════
    // archive / remove Tests
    // ═══════════════════════════════════════

    #[tokio::test]
    async fn test_archive_and_unarchive() {
        let (pool, _) = setup_test_pool_with_habit(10).await;

        let archived = pool
            .write(|tx| set_archived_sync(tx, "habit-1", true, 5_000))
            .await
            .unwrap();
        assert!(archived.is_archived);
        assert_eq!(archived.archived_at, Some(5_000));
        assert!(db!(pool, |conn| list_habits_sync(conn)).is_empty());
        assert_eq!(db!(pool, |conn| list_archived_habits_sync(conn)).len(), 1);

        let restored = pool
            .write(|tx| set_archived_sync(tx, "habit-1", false, 6_000))
            .await
            .unwrap();
        assert!(!restored.is_archived);
        assert_eq!(restored.archived_at, None);
        assert_eq!(db!(pool, |conn| list_habits_sync(conn)).len(), 1);
        assert!(db!(pool, |conn| list_archived_habits_sync(conn)).is_empty());
    }

    #[tokio::test]
    async fn test_deactivate_is_soft() {
        let (pool, _) = setup_test_pool_with_habit(10).await;

        pool.write(|tx| deactivate_habit_sync(tx, "habit-1"))
            .await
            .unwrap();

        assert!(db!(pool, |conn| list_habits_sync(conn)).is_empty());
        let row = db!(pool, |conn| get_habit_sync(conn, "habit-1")).unwrap();
        assert!(!row.is_active);

        let err = pool
            .run(|conn| get_active_habit_sync(conn, "habit-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, HabitError::HabitNotFound(_)));

        // Removing twice reports the habit as gone
        let err = pool
            .write(|tx| deactivate_habit_sync(tx, "habit-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, HabitError::HabitNotFound(_)));
    }

    #[tokio::test]
    async fn test_hard_delete_blocked_by_completions() {
        let (pool, _) = setup_test_pool_with_habit(10).await;
        insert_raw_completion(&pool, "habit-1", "2024-01-01", 10).await;

        let result = pool
            .write(|tx| {
                tx.execute("DELETE FROM habits WHERE id = 'habit-1'", [])?;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(HabitError::Db(_))));
    }
}
