// crates/habitkit/src/engine/evaluator.rs
// One-shot threshold unlocks for achievements

use super::aggregation::add_points;
use crate::error::Result;
use habitkit_types::{Achievement, AchievementKind, UserStats};

/// The stat an achievement kind is measured against.
///
/// `Consistency` reads the current streak for now; it has no separate
/// measure yet.
pub fn measure(stats: &UserStats, kind: AchievementKind) -> i64 {
    match kind {
        AchievementKind::TotalCompletions => stats.total_completions,
        AchievementKind::Streak | AchievementKind::Consistency => stats.current_streak,
        AchievementKind::Points => stats.total_points,
    }
}

pub fn qualifies(stats: &UserStats, achievement: &Achievement) -> bool {
    measure(stats, achievement.kind) >= achievement.requirement
}

/// Outcome of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Stats with every awarded bonus folded into `total_points`.
    pub stats: UserStats,
    /// Achievements that crossed their threshold, stamped with `unlocked_at`.
    pub unlocked: Vec<Achievement>,
}

/// Check every locked achievement against `stats`.
///
/// Candidates are visited in ascending requirement order against a running
/// snapshot, so a bonus awarded earlier in the pass can carry a `points`
/// achievement later in the same pass. Already-unlocked entries are skipped.
/// Fails without awarding anything if a bonus would overflow the total.
pub fn evaluate(stats: &UserStats, candidates: &[Achievement], now: i64) -> Result<Evaluation> {
    let mut ordered: Vec<&Achievement> = candidates.iter().filter(|a| !a.is_unlocked()).collect();
    ordered.sort_by(|a, b| a.requirement.cmp(&b.requirement).then_with(|| a.id.cmp(&b.id)));

    let mut running = stats.clone();
    let mut unlocked = Vec::new();
    for achievement in ordered {
        if !qualifies(&running, achievement) {
            continue;
        }
        running.total_points = add_points(running.total_points, achievement.points)?;
        let mut awarded = achievement.clone();
        awarded.unlocked_at = Some(now);
        unlocked.push(awarded);
    }

    Ok(Evaluation {
        stats: running,
        unlocked,
    })
}
