// db/test_support.rs
// Shared test helpers for database tests

use super::pool::DatabasePool;
use super::{create_habit_sync, insert_completion_sync};
use habitkit_types::{Completion, Habit, NewHabit};
use std::sync::Arc;

/// Run a closure on a pooled connection and unwrap the result.
macro_rules! db {
    ($pool:expr, $f:expr) => {
        $pool.run($f).await.expect("db operation failed")
    };
}
pub(crate) use db;

/// Create a test pool (in-memory DB, migrated, catalog seeded)
pub async fn setup_test_pool() -> Arc<DatabasePool> {
    Arc::new(
        DatabasePool::open_in_memory()
            .await
            .expect("Failed to open in-memory pool"),
    )
}

/// Create a test pool whose achievement catalog is empty
pub async fn setup_test_pool_without_catalog() -> Arc<DatabasePool> {
    let pool = setup_test_pool().await;
    pool.write(|tx| {
        tx.execute("DELETE FROM achievements", [])?;
        Ok(())
    })
    .await
    .expect("Failed to clear catalog");
    pool
}

pub fn new_habit(name: &str, points: i64) -> NewHabit {
    NewHabit {
        name: name.to_string(),
        description: None,
        color: "#4caf50".to_string(),
        icon: "✅".to_string(),
        target_frequency: 7,
        points,
    }
}

/// Create a test pool with one habit worth `points`
pub async fn setup_test_pool_with_habit(points: i64) -> (Arc<DatabasePool>, Habit) {
    let pool = setup_test_pool().await;
    let habit = pool
        .write(move |tx| create_habit_sync(tx, "habit-1", &new_habit("Read", points), 1_000))
        .await
        .expect("Failed to create habit");
    (pool, habit)
}

/// Insert a completion row directly, bypassing the workflow
pub async fn insert_raw_completion(pool: &DatabasePool, habit_id: &str, date: &str, points: i64) {
    let completion = Completion {
        id: format!("c-{habit_id}-{date}"),
        habit_id: habit_id.to_string(),
        date: date.to_string(),
        points,
        completed_at: 0,
    };
    pool.write(move |tx| insert_completion_sync(tx, &completion))
        .await
        .expect("Failed to insert completion");
}
