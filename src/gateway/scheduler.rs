//! Scheduled notifications: the daily check-in reminder and the weekly challenge.

use super::Gateway;
use crate::keyboards;
use crate::motivation;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc, Weekday};
use nosugar_channels::utils::escape_html;
use nosugar_core::{
    config::SchedulerConfig, error::NoSugarError, message::OutgoingMessage, models::User,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Something the scheduler delivers to every user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledEvent {
    DailyReminder,
    WeeklyChallenge,
}

impl std::fmt::Display for ScheduledEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DailyReminder => write!(f, "daily reminder"),
            Self::WeeklyChallenge => write!(f, "weekly challenge"),
        }
    }
}

/// The next instant the scheduler wakes up and what fires then.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub at: DateTime<FixedOffset>,
    pub events: Vec<ScheduledEvent>,
}

/// Wall-clock schedule evaluated in one fixed timezone.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    tz: FixedOffset,
    reminder_at: NaiveTime,
    challenge_at: NaiveTime,
    weekday: Weekday,
}

impl Schedule {
    pub fn from_config(cfg: &SchedulerConfig) -> Result<Self, NoSugarError> {
        Ok(Self {
            tz: cfg.timezone()?,
            reminder_at: cfg.reminder_at()?,
            challenge_at: cfg.challenge_at()?,
            weekday: cfg.weekday()?,
        })
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.tz)
    }

    /// The current calendar day in the schedule's timezone.
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// `date` at wall-clock `time` in the fixed timezone.
    fn at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<FixedOffset> {
        let local = date.and_time(time);
        let utc = local - Duration::seconds(i64::from(self.tz.local_minus_utc()));
        DateTime::from_naive_utc_and_offset(utc, self.tz)
    }

    /// Today's reminder if `now` is strictly before it, else tomorrow's.
    pub fn next_reminder(&self, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        let now = now.with_timezone(&self.tz);
        let today = self.at(now.date_naive(), self.reminder_at);
        if now < today {
            today
        } else {
            self.at(now.date_naive() + Duration::days(1), self.reminder_at)
        }
    }

    /// The next challenge weekday at the challenge time. A slot that is
    /// now or already past moves to the following week.
    pub fn next_challenge(&self, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        let now = now.with_timezone(&self.tz);
        let date = now.date_naive();
        let days_ahead = (7 + self.weekday.num_days_from_monday()
            - date.weekday().num_days_from_monday())
            % 7;
        let candidate = self.at(date + Duration::days(i64::from(days_ahead)), self.challenge_at);
        if candidate <= now {
            candidate + Duration::days(7)
        } else {
            candidate
        }
    }

    /// The earlier of the two slots. Both fire when they coincide.
    pub fn next_trigger(&self, now: DateTime<FixedOffset>) -> Trigger {
        let reminder = self.next_reminder(now);
        let challenge = self.next_challenge(now);
        match reminder.cmp(&challenge) {
            std::cmp::Ordering::Less => Trigger {
                at: reminder,
                events: vec![ScheduledEvent::DailyReminder],
            },
            std::cmp::Ordering::Greater => Trigger {
                at: challenge,
                events: vec![ScheduledEvent::WeeklyChallenge],
            },
            std::cmp::Ordering::Equal => Trigger {
                at: reminder,
                events: vec![ScheduledEvent::DailyReminder, ScheduledEvent::WeeklyChallenge],
            },
        }
    }
}

/// Run `op` until it succeeds, at most `max_attempts` times, sleeping
/// `backoff` between attempts. `None` once every attempt failed.
pub(super) async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    backoff: std::time::Duration,
    label: &str,
    mut op: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NoSugarError>>,
{
    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Some(value),
            Err(e) => {
                error!("{label} failed (attempt {attempt}/{attempts}): {e}");
                if attempt < attempts {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
    warn!("{label}: giving up after {attempts} attempts");
    None
}

fn reminder_text(user: &User) -> String {
    format!(
        "🔔 <b>Time for your daily check-in!</b>\n\n\
         {}\n\n\
         Did you stay sugar-free today?\n\n\
         🔥 Current streak: <b>{}</b> days",
        motivation::daily_motivation(),
        user.current_streak,
    )
}

fn challenge_text(challenge: &str) -> String {
    format!(
        "🎯 <b>New weekly challenge!</b>\n\n\
         {}\n\n\
         Press \"Done\" once you've completed it. Good luck! 💪",
        escape_html(challenge),
    )
}

impl Gateway {
    /// Background task: sleep until the next slot, fire it, repeat.
    pub(super) async fn scheduler_loop(self: Arc<Self>) {
        let schedule = self.schedule;
        self.run_schedule(move || schedule.now()).await;
    }

    /// The scheduler loop against an arbitrary wall clock.
    pub(super) async fn run_schedule<C>(&self, clock: C)
    where
        C: Fn() -> DateTime<FixedOffset>,
    {
        let backoff = std::time::Duration::from_secs(self.scheduler_config.retry_backoff_secs);
        let max_attempts = self.scheduler_config.max_attempts;
        let mut not_before = clock();

        loop {
            let now = clock();
            let trigger = self.schedule.next_trigger(now.max(not_before));
            let wait = (trigger.at - now).to_std().unwrap_or_default();
            info!(
                "scheduler: next {:?} at {} (in {}s)",
                trigger.events,
                trigger.at.format("%Y-%m-%d %H:%M %:z"),
                wait.as_secs()
            );
            tokio::time::sleep(wait).await;

            let date = trigger.at.date_naive();
            for event in &trigger.events {
                let label = format!("scheduler: {event}");
                if let Some(sent) =
                    retry_with_backoff(max_attempts, backoff, &label, || self.fire(*event, date))
                        .await
                {
                    info!("{label} delivered to {sent} users");
                }
            }

            not_before = trigger.at + Duration::seconds(1);
        }
    }

    /// Fire one event for `date`. Returns how many users were notified.
    pub(super) async fn fire(
        &self,
        event: ScheduledEvent,
        date: NaiveDate,
    ) -> Result<usize, NoSugarError> {
        match event {
            ScheduledEvent::DailyReminder => self.send_daily_reminders(date).await,
            ScheduledEvent::WeeklyChallenge => self.create_weekly_challenges(date).await,
        }
    }

    /// Remind every active user who has not checked in on `today`.
    pub(super) async fn send_daily_reminders(&self, today: NaiveDate) -> Result<usize, NoSugarError> {
        let users = self.storage.list_active_users().await?;
        let mut sent = 0;

        for user in &users {
            match self.storage.get_checkin_for_date(user.id, today).await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => {
                    warn!("reminder: check-in lookup failed for {}: {e}", user.telegram_id);
                    continue;
                }
            }
            match self.send_reminder(user).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    warn!("reminder: failed to notify {}: {e}", user.telegram_id);
                    self.pause_if_unreachable(user, &e).await;
                }
            }
        }
        Ok(sent)
    }

    /// Generate one challenge, store it for every active user and notify them.
    pub(super) async fn create_weekly_challenges(
        &self,
        today: NaiveDate,
    ) -> Result<usize, NoSugarError> {
        let users = self.storage.list_active_users().await?;
        if users.is_empty() {
            return Ok(0);
        }

        let challenge = self.generator.weekly_challenge().await;
        let mut sent = 0;
        for user in &users {
            match self.deliver_challenge(user, today, &challenge).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    warn!("challenge: skipped {}: {e}", user.telegram_id);
                    self.pause_if_unreachable(user, &e).await;
                }
            }
        }
        Ok(sent)
    }

    /// One-off reminder for a single user, regardless of today's check-in.
    pub async fn remind_user(&self, telegram_id: i64) -> Result<(), NoSugarError> {
        let user = self.require_user(telegram_id).await?;
        self.send_reminder(&user).await
    }

    /// One-off weekly challenge for a single user.
    pub async fn challenge_user(&self, telegram_id: i64) -> Result<(), NoSugarError> {
        let user = self.require_user(telegram_id).await?;
        let challenge = self.generator.weekly_challenge().await;
        self.deliver_challenge(&user, self.schedule.today(), &challenge)
            .await
    }

    async fn require_user(&self, telegram_id: i64) -> Result<User, NoSugarError> {
        self.storage
            .get_user_by_telegram_id(telegram_id)
            .await?
            .ok_or_else(|| NoSugarError::Memory(format!("no user with telegram id {telegram_id}")))
    }

    /// Stop scheduled sends to a user whose chat rejects the bot. Their
    /// next message reactivates them.
    async fn pause_if_unreachable(&self, user: &User, err: &NoSugarError) {
        if !err.is_unreachable() {
            return;
        }
        match self.storage.set_user_active(user.id, false).await {
            Ok(()) => info!("user {} blocked the bot, notifications paused", user.telegram_id),
            Err(e) => warn!("failed to deactivate {}: {e}", user.telegram_id),
        }
    }

    async fn send_reminder(&self, user: &User) -> Result<(), NoSugarError> {
        let msg = OutgoingMessage::text(user.telegram_id.to_string(), reminder_text(user))
            .with_buttons(keyboards::checkin_question());
        self.channel.send(msg).await
    }

    async fn deliver_challenge(
        &self,
        user: &User,
        date: NaiveDate,
        challenge: &str,
    ) -> Result<(), NoSugarError> {
        self.storage.create_challenge(user.id, date, challenge).await?;
        let msg = OutgoingMessage::text(user.telegram_id.to_string(), challenge_text(challenge))
            .with_buttons(keyboards::challenge(true));
        self.channel.send(msg).await
    }
}
