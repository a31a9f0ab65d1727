// crates/habitkit-types/src/lib.rs
// Shared types for habitkit (native + WASM compatible)
// No native-only dependencies allowed here

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ═══════════════════════════════════════
// HABITS
// ═══════════════════════════════════════

/// A user-defined recurring task.
///
/// Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
    /// Target completions per week
    pub target_frequency: i64,
    /// Points awarded per completion
    pub points: i64,
    pub is_active: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub archived_at: Option<i64>,
    pub created_at: i64,
}

/// Input for creating a habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewHabit {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
    pub target_frequency: i64,
    pub points: i64,
}

/// Typed partial update for a habit.
///
/// Only the fields listed here may change after creation. `None` leaves the
/// stored value alone; `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HabitPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "explicit_null"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_frequency: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
}

/// Keep an explicit JSON `null` as `Some(None)` so it can clear a field.
fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl HabitPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.color.is_none()
            && self.icon.is_none()
            && self.target_frequency.is_none()
            && self.points.is_none()
    }
}

// ═══════════════════════════════════════
// COMPLETIONS
// ═══════════════════════════════════════

/// A record that a habit was performed on a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub id: String,
    pub habit_id: String,
    /// Calendar day, `YYYY-MM-DD`
    pub date: String,
    /// Points snapshotted from the habit when the completion was recorded
    pub points: i64,
    pub completed_at: i64,
}

/// Completion count for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub date: String,
    pub count: i64,
}

/// Result of a successful completion workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReceipt {
    pub completion_id: String,
    /// Achievements unlocked by this completion; their bonuses are already
    /// included in the stored stats.
    pub newly_unlocked: Vec<Achievement>,
}

/// Result of an undo followed by a stats rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoReceipt {
    pub removed: Completion,
    pub stats: UserStats,
}

// ═══════════════════════════════════════
// STATS
// ═══════════════════════════════════════

/// Process-wide aggregate stats (single stored row).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_points: i64,
    pub total_completions: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    #[serde(default)]
    pub last_completion_date: Option<String>,
}

// ═══════════════════════════════════════
// ACHIEVEMENTS
// ═══════════════════════════════════════

/// Which stat an achievement threshold is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    TotalCompletions,
    Streak,
    Points,
    /// Placeholder: measured exactly like `Streak`.
    Consistency,
}

impl AchievementKind {
    pub const ALL: [AchievementKind; 4] = [
        AchievementKind::TotalCompletions,
        AchievementKind::Streak,
        AchievementKind::Points,
        AchievementKind::Consistency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementKind::TotalCompletions => "total_completions",
            AchievementKind::Streak => "streak",
            AchievementKind::Points => "points",
            AchievementKind::Consistency => "consistency",
        }
    }
}

impl fmt::Display for AchievementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown achievement kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAchievementKind(pub String);

impl fmt::Display for UnknownAchievementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown achievement kind: {}", self.0)
    }
}

impl std::error::Error for UnknownAchievementKind {}

impl FromStr for AchievementKind {
    type Err = UnknownAchievementKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AchievementKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownAchievementKind(s.to_string()))
    }
}

/// A one-shot milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    #[serde(rename = "type")]
    pub kind: AchievementKind,
    pub requirement: i64,
    /// Bonus points awarded on unlock
    pub points: i64,
    #[serde(default)]
    pub unlocked_at: Option<i64>,
}

impl Achievement {
    pub fn is_unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }
}
