// db/mod.rs
// Entity store: pooled SQLite access plus typed sync operations
//
// Every `*_sync` function takes a `&Connection` and is meant to run inside
// `DatabasePool::run` (reads) or `DatabasePool::write` (writes). A
// `rusqlite::Transaction` derefs to `Connection`, so the same functions
// compose into one transaction.

mod achievements;
mod completions;
mod habits;
pub mod migration_helpers;
pub mod pool;
pub mod schema;
mod stats;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod achievements_tests;
#[cfg(test)]
mod habits_tests;

pub use achievements::{
    list_achievements_sync, locked_achievements_sync, parse_achievement_row,
    seed_default_achievements_sync, unlock_achievement_sync, unlocked_bonus_total_sync,
};
pub use completions::{
    completion_totals_sync, completions_for_date_sync, completions_in_range_sync,
    daily_totals_sync, delete_completion_sync, distinct_completion_dates_sync,
    get_completion_sync, habit_history_sync, insert_completion_sync, parse_completion_row,
};
pub use habits::{
    create_habit_sync, deactivate_habit_sync, get_active_habit_sync, get_habit_sync,
    list_archived_habits_sync, list_habits_sync, parse_habit_row, require_habit_sync,
    set_archived_sync, update_habit_sync,
};
pub use pool::DatabasePool;
pub use stats::{get_or_create_user_stats_sync, save_user_stats_sync};
