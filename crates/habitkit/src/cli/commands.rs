// crates/habitkit/src/cli/commands.rs
// Command handlers: each maps one subcommand onto the tracker and returns
// the JSON value printed on stdout

use super::Commands;
use crate::calendar::format_day;
use crate::error::{HabitError, Result};
use crate::tracker::HabitTracker;
use chrono::Days;
use habitkit_types::{HabitPatch, NewHabit};
use serde_json::{Value, json};

/// Execute one subcommand against an opened tracker.
pub async fn run_command(tracker: &HabitTracker, command: Commands) -> Result<Value> {
    let today = format_day(tracker.today());

    let value = match command {
        Commands::Habits { archived } => {
            let habits = if archived {
                tracker.list_archived_habits().await?
            } else {
                tracker.list_habits().await?
            };
            serde_json::to_value(habits)?
        }

        Commands::Add {
            name,
            description,
            color,
            icon,
            target,
            points,
        } => {
            let habit = tracker
                .create_habit(NewHabit {
                    name,
                    description,
                    color,
                    icon,
                    target_frequency: target,
                    points,
                })
                .await?;
            serde_json::to_value(habit)?
        }

        Commands::Edit {
            id,
            name,
            description,
            clear_description,
            color,
            icon,
            target,
            points,
        } => {
            let patch = HabitPatch {
                name,
                description: if clear_description {
                    Some(None)
                } else {
                    description.map(Some)
                },
                color,
                icon,
                target_frequency: target,
                points,
            };
            if patch.is_empty() {
                return Err(HabitError::InvalidInput(
                    "nothing to update; pass at least one field".to_string(),
                ));
            }
            serde_json::to_value(tracker.update_habit(&id, patch).await?)?
        }

        Commands::Archive { id } => serde_json::to_value(tracker.archive_habit(&id).await?)?,

        Commands::Unarchive { id } => serde_json::to_value(tracker.unarchive_habit(&id).await?)?,

        Commands::Remove { id } => {
            tracker.remove_habit(&id).await?;
            json!({ "removed": id })
        }

        Commands::Complete { id, date } => {
            let date = date.unwrap_or_else(|| today.clone());
            let receipt = tracker.complete_habit(&id, &date).await?;
            let stats = tracker.get_user_stats().await?;
            json!({ "receipt": receipt, "stats": stats })
        }

        Commands::Undo { id, date } => {
            let date = date.unwrap_or_else(|| today.clone());
            match tracker.undo_and_rollback(&id, &date).await? {
                Some(receipt) => serde_json::to_value(receipt)?,
                None => json!({ "removed": null, "date": date }),
            }
        }

        Commands::Stats => serde_json::to_value(tracker.get_user_stats().await?)?,

        Commands::Week { start, end } => {
            let end = end.unwrap_or_else(|| today.clone());
            let start = match start {
                Some(start) => start,
                None => {
                    let end_day = crate::calendar::parse_day(&end)?;
                    format_day(end_day.checked_sub_days(Days::new(6)).unwrap_or(end_day))
                }
            };
            let totals = tracker.get_weekly_progress(&start, &end).await?;
            json!({ "start": start, "end": end, "days": totals })
        }

        Commands::History { id, days } => {
            serde_json::to_value(tracker.habit_history(&id, days).await?)?
        }

        Commands::Achievements => serde_json::to_value(tracker.list_achievements().await?)?,

        Commands::Reconcile => serde_json::to_value(tracker.reconcile_stats().await?)?,

        Commands::Migrate => {
            let version = tracker.schema_version().await?;
            json!({
                "schemaVersion": version,
                "path": tracker.path().map(|p| p.display().to_string()),
            })
        }
    };

    Ok(value)
}
