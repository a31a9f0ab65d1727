// crates/habitkit/src/engine/mod.rs
// Derived-state engine: aggregation, achievement evaluation, and the
// completion / undo workflows built on top of them

pub mod aggregation;
pub mod evaluator;
pub mod workflow;

pub use workflow::{
    WorkflowStep, complete_habit_sync, evaluate_achievements_sync, reconcile_stats_sync,
    rollback_stats_sync, undo_and_rollback_sync, undo_completion_sync,
};
