//! Gamification contract: XP, levels, and streaks.
//!
//! The arithmetic here is intentionally small — the rest of the system
//! only depends on [`award_completion`] being a pure function from
//! `(progress, task, now)` to a new progress snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::task::{EnergyLevel, Task};

/// XP needed to advance one level.
const XP_PER_LEVEL: u64 = 250;

/// A user's accumulated gamification state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    /// Owning user.
    pub user_id: String,
    /// Total experience points earned.
    pub xp: u64,
    /// Current level, derived from XP.
    pub level: u32,
    /// Consecutive days with at least one completion.
    pub streak_days: u32,
    /// Calendar date of the most recent completion.
    pub last_completed_on: Option<NaiveDate>,
}

impl Progress {
    /// Fresh progress for a user with no completions yet.
    #[must_use]
    pub fn new(user_id: String) -> Self {
        Self {
            user_id,
            xp: 0,
            level: 1,
            streak_days: 0,
            last_completed_on: None,
        }
    }
}

/// XP awarded for completing a task, scaled by the energy it demanded.
#[must_use]
pub fn xp_for_task(task: &Task) -> u64 {
    let base = match task.energy {
        EnergyLevel::High => 25,
        EnergyLevel::Medium => 15,
        EnergyLevel::Low => 10,
    };
    // Longer tasks earn a little more, capped so a padded estimate
    // cannot farm XP.
    let duration_bonus = u64::from(task.estimated_minutes.unwrap_or(0).min(120)) / 30 * 5;
    base + duration_bonus
}

/// Level derived from total XP.
#[must_use]
pub fn level_for_xp(xp: u64) -> u32 {
    u32::try_from(xp / XP_PER_LEVEL).unwrap_or(u32::MAX).saturating_add(1)
}

/// Fold one task completion into a progress snapshot.
///
/// Streaks count consecutive calendar days with at least one completion:
/// a same-day completion leaves the streak unchanged, a next-day
/// completion extends it, and any gap resets it to one.
#[must_use]
pub fn award_completion(mut progress: Progress, task: &Task, now: DateTime<Utc>) -> Progress {
    progress.xp += xp_for_task(task);
    progress.level = level_for_xp(progress.xp);

    let today = now.date_naive();
    progress.streak_days = match progress.last_completed_on {
        Some(last) if last == today => progress.streak_days,
        Some(last) if today - last == chrono::Duration::days(1) => progress.streak_days + 1,
        _ => 1,
    };
    progress.last_completed_on = Some(today);
    progress
}
