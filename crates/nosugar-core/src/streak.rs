//! Streak derivation from a check-in history.
//!
//! Counters are always recomputed from the full history rather than
//! incremented, so the cached values on `User` can never drift.

use crate::models::CheckIn;
use serde::{Deserialize, Serialize};

/// Aggregate statistics derived from a user's check-ins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakStats {
    /// Consecutive successes counted back from the most recent check-in.
    pub current_streak: u32,
    /// Longest run of consecutive successes anywhere in the history.
    pub longest_streak: u32,
    /// Number of check-ins.
    pub total_days: u32,
    /// Number of failed check-ins.
    pub total_slip_ups: u32,
    /// Number of successful check-ins.
    pub success_days: u32,
}

impl StreakStats {
    /// Share of successful days in percent, 0 for an empty history.
    pub fn success_rate(&self) -> f64 {
        if self.total_days == 0 {
            return 0.0;
        }
        f64::from(self.success_days) / f64::from(self.total_days) * 100.0
    }
}

/// Derive streak statistics from a history of check-ins.
///
/// The history is sorted by `check_date` first, so callers may pass it in
/// any order.
pub fn compute(history: &[CheckIn]) -> StreakStats {
    let mut ordered: Vec<&CheckIn> = history.iter().collect();
    ordered.sort_by_key(|c| c.check_date);
    compute_ordered(ordered.iter().map(|c| c.success))
}

/// Derive statistics from pass/fail outcomes, oldest first.
pub fn compute_ordered<I>(outcomes: I) -> StreakStats
where
    I: IntoIterator<Item = bool>,
{
    let mut stats = StreakStats::default();
    let mut run: u32 = 0;

    for success in outcomes {
        stats.total_days += 1;
        if success {
            stats.success_days += 1;
            run += 1;
            stats.longest_streak = stats.longest_streak.max(run);
        } else {
            stats.total_slip_ups += 1;
            run = 0;
        }
    }

    // The trailing run is the current streak.
    stats.current_streak = run;
    stats
}

/// Streak lengths worth celebrating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    Week,
    Month,
    Hundred,
    /// Any other whole number of weeks.
    Weeks(u32),
}

/// Return the milestone reached at exactly `streak` days, if any.
pub fn milestone(streak: u32) -> Option<Milestone> {
    match streak {
        0 => None,
        7 => Some(Milestone::Week),
        30 => Some(Milestone::Month),
        100 => Some(Milestone::Hundred),
        n if n % 7 == 0 => Some(Milestone::Weeks(n / 7)),
        _ => None,
    }
}
