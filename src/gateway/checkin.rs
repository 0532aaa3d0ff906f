//! Daily check-in: record the answer, recompute streaks, respond.

use super::Gateway;
use crate::{keyboards, motivation};
use chrono::NaiveDate;
use nosugar_channels::utils::escape_html;
use nosugar_core::{
    error::NoSugarError,
    message::IncomingMessage,
    models::User,
    streak::{self, StreakStats},
};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum CheckInOutcome {
    Recorded(StreakStats),
    AlreadyCheckedIn,
}

pub(super) fn success_text(stats: &StreakStats) -> String {
    let mut text = format!(
        "🎉 <b>Great job!</b>\n\n\
         {}\n\n\
         🔥 Current streak: <b>{}</b> days\n\
         🏆 Longest streak: <b>{}</b> days",
        motivation::success_message(stats.current_streak),
        stats.current_streak,
        stats.longest_streak,
    );
    if let Some(m) = streak::milestone(stats.current_streak) {
        text.push_str("\n\n");
        text.push_str(&motivation::celebration(m));
    }
    text
}

pub(super) fn slip_text(stats: &StreakStats) -> String {
    format!(
        "{}\n\n\
         The streak starts over, but your progress isn't lost.\n\
         🏆 Longest streak: <b>{}</b> days\n\
         ❌ Slip-ups so far: <b>{}</b>\n\n\
         Want to look at what triggered it?",
        motivation::slip_up_message(),
        stats.longest_streak,
        stats.total_slip_ups,
    )
}

impl Gateway {
    /// Store today's answer and refresh the cached counters.
    ///
    /// Counters are recomputed from the full history after the insert.
    pub(super) async fn record_checkin(
        &self,
        user: &User,
        date: NaiveDate,
        success: bool,
    ) -> Result<CheckInOutcome, NoSugarError> {
        if self.storage.get_checkin_for_date(user.id, date).await?.is_some() {
            return Ok(CheckInOutcome::AlreadyCheckedIn);
        }

        match self.storage.create_checkin(user.id, date, success).await {
            Ok(_) => {}
            // Lost a race with a concurrent answer for the same day.
            Err(e) if e.is_duplicate_checkin() => return Ok(CheckInOutcome::AlreadyCheckedIn),
            Err(e) => return Err(e),
        }

        let history = self.storage.list_checkins(user.id).await?;
        let stats = streak::compute(&history);
        self.storage.update_user_stats(user.id, &stats).await?;

        info!(
            "check-in {} for {} on {date}: streak {}",
            if success { "success" } else { "slip" },
            user.telegram_id,
            stats.current_streak
        );
        Ok(CheckInOutcome::Recorded(stats))
    }

    pub(super) async fn handle_checkin(
        &self,
        incoming: &IncomingMessage,
        user: &User,
        success: bool,
    ) -> Result<(), NoSugarError> {
        let today = self.schedule.today();
        let stats = match self.record_checkin(user, today, success).await? {
            CheckInOutcome::Recorded(stats) => stats,
            CheckInOutcome::AlreadyCheckedIn => {
                self.reply(
                    incoming,
                    "You've already checked in today. Come back tomorrow! 😊",
                    keyboards::already_checked_in(),
                )
                .await;
                return Ok(());
            }
        };

        if success {
            self.reply(incoming, success_text(&stats), keyboards::already_checked_in())
                .await;
        } else {
            self.reply(incoming, slip_text(&stats), keyboards::slip_analysis())
                .await;
            if let Some(ref card) = self.payment_card {
                self.reply(
                    incoming,
                    motivation::payment_reminder(&escape_html(card)),
                    Vec::new(),
                )
                .await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(current: u32, longest: u32, slips: u32) -> StreakStats {
        StreakStats {
            current_streak: current,
            longest_streak: longest,
            total_days: current + slips,
            total_slip_ups: slips,
            success_days: current,
        }
    }

    #[test]
    fn test_success_text_without_milestone() {
        let text = success_text(&stats(3, 5, 1));
        assert!(text.contains("Current streak: <b>3</b>"));
        assert!(text.contains("Longest streak: <b>5</b>"));
        assert!(!text.contains("whole week"));
    }

    #[test]
    fn test_success_text_celebrates_week() {
        let text = success_text(&stats(7, 7, 0));
        assert!(text.contains("A whole week without sugar"));
    }

    #[test]
    fn test_slip_text_keeps_longest() {
        let text = slip_text(&stats(0, 12, 2));
        assert!(text.contains("Longest streak: <b>12</b>"));
        assert!(text.contains("Slip-ups so far: <b>2</b>"));
    }
}
