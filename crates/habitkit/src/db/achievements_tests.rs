// crates/habitkit/src/db/achievements_tests.rs
// Tests for achievement catalog and user stats persistence

use super::test_support::{db, setup_test_pool, setup_test_pool_without_catalog};
use super::{
    get_or_create_user_stats_sync, list_achievements_sync, locked_achievements_sync,
    save_user_stats_sync, seed_default_achievements_sync, unlock_achievement_sync,
    unlocked_bonus_total_sync,
};
use habitkit_types::{AchievementKind, UserStats};

#[cfg(test)]
mod tests {
    use super::*;

    // ═══════════════════════════════════════
    // catalog Tests
    // ═══════════════════════════════════════

    #[tokio::test]
    async fn test_default_catalog_seeded_once() {
        let pool = setup_test_pool().await;

        let catalog = db!(pool, |conn| list_achievements_sync(conn));
        assert_eq!(catalog.len(), 9);
        assert!(catalog.iter().all(|a| !a.is_unlocked()));
        // Ascending requirement
        assert!(catalog.windows(2).all(|w| w[0].requirement <= w[1].requirement));

        let first = catalog.iter().find(|a| a.id == "first_step").unwrap();
        assert_eq!(first.kind, AchievementKind::TotalCompletions);
        assert_eq!(first.requirement, 1);
        assert_eq!(first.points, 10);

        let inserted = pool
            .write(|tx| seed_default_achievements_sync(tx))
            .await
            .unwrap();
        assert_eq!(inserted, 0);
    }

    #[tokio::test]
    async fn test_empty_catalog_reseeds_only_on_request() {
        let pool = setup_test_pool_without_catalog().await;
        assert!(db!(pool, |conn| list_achievements_sync(conn)).is_empty());

        let inserted = pool
            .write(|tx| seed_default_achievements_sync(tx))
            .await
            .unwrap();
        assert_eq!(inserted, 9);
    }

    #[tokio::test]
    async fn test_unlock_is_one_shot() {
        let pool = setup_test_pool().await;

        let first = pool
            .write(|tx| unlock_achievement_sync(tx, "on_fire", 100))
            .await
            .unwrap();
        assert!(first);

        let second = pool
            .write(|tx| unlock_achievement_sync(tx, "on_fire", 200))
            .await
            .unwrap();
        assert!(!second);

        let catalog = db!(pool, |conn| list_achievements_sync(conn));
        let on_fire = catalog.iter().find(|a| a.id == "on_fire").unwrap();
        assert_eq!(on_fire.unlocked_at, Some(100));

        let locked = db!(pool, |conn| locked_achievements_sync(conn));
        assert_eq!(locked.len(), 8);
        assert!(locked.iter().all(|a| a.id != "on_fire"));

        assert_eq!(db!(pool, |conn| unlocked_bonus_total_sync(conn)), 50);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_a_conversion_error() {
        let pool = setup_test_pool_without_catalog().await;
        // Slip past the CHECK constraint to simulate a corrupt row
        pool.write(|tx| {
            tx.execute_batch(
                "PRAGMA ignore_check_constraints = ON;
                 INSERT INTO achievements (id, name, description, icon, kind, requirement, points)
                 VALUES ('x', 'X', 'x', 'x', 'weekly', 1, 0);
                 PRAGMA ignore_check_constraints = OFF;",
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let result = pool.run(|conn| list_achievements_sync(conn)).await;
        assert!(result.is_err());
    }

    // ═══════════════════════════════════════
    // user_stats Tests
    // ═══════════════════════════════════════

    #[tokio::test]
    async fn test_user_stats_lazily_created() {
        let pool = setup_test_pool().await;
        pool.write(|tx| {
            tx.execute("DELETE FROM user_stats", [])?;
            Ok(())
        })
        .await
        .unwrap();

        let stats = pool
            .write(|tx| get_or_create_user_stats_sync(tx))
            .await
            .unwrap();
        assert_eq!(stats, UserStats::default());

        let rows: i64 = db!(pool, |conn| Ok(conn.query_row(
            "SELECT COUNT(*) FROM user_stats",
            [],
            |r| r.get(0)
        )?));
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_save_user_stats_round_trip() {
        let pool = setup_test_pool().await;
        let stats = UserStats {
            total_points: 30,
            total_completions: 3,
            current_streak: 3,
            longest_streak: 5,
            last_completion_date: Some("2024-01-03".to_string()),
        };
        let to_save = stats.clone();
        pool.write(move |tx| save_user_stats_sync(tx, &to_save))
            .await
            .unwrap();

        assert_eq!(db!(pool, |conn| get_or_create_user_stats_sync(conn)), stats);
    }

    #[tokio::test]
    async fn test_stats_check_constraints() {
        let pool = setup_test_pool().await;
        let bad = UserStats {
            current_streak: 4,
            longest_streak: 2,
            ..Default::default()
        };
        let result = pool.write(move |tx| save_user_stats_sync(tx, &bad)).await;
        assert!(result.is_err());

        let negative = UserStats {
            total_points: -1,
            ..Default::default()
        };
        let result = pool.write(move |tx| save_user_stats_sync(tx, &negative)).await;
        assert!(result.is_err());
    }
}
