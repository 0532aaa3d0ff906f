use super::*;
use crate::generator::tests::FakeProvider;
use crate::keyboards::*;
use crate::state::PendingMode;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use nosugar_core::message::SenderProfile;
use nosugar_core::models::{Challenge, CheckIn, Note, Recipe, User};
use nosugar_core::streak::StreakStats;
use nosugar_memory::Store;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex as StdMutex;
use uuid::Uuid;

/// Channel that records everything sent through it.
#[derive(Default)]
struct FakeChannel {
    sent: StdMutex<Vec<OutgoingMessage>>,
    answered: StdMutex<Vec<String>>,
    /// Targets whose sends fail.
    unreachable: StdMutex<Vec<String>>,
    /// Targets that blocked the bot.
    blocked: StdMutex<Vec<String>>,
}

impl FakeChannel {
    fn texts_to(&self, user: i64) -> Vec<String> {
        let target = user.to_string();
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.reply_target.as_deref() == Some(target.as_str()))
            .map(|m| m.text.clone())
            .collect()
    }

    fn last_to(&self, user: i64) -> OutgoingMessage {
        let target = user.to_string();
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.reply_target.as_deref() == Some(target.as_str()))
            .cloned()
            .expect("no message sent to user")
    }

    fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Channel for FakeChannel {
    fn name(&self) -> &str {
        "fake"
    }

    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, NoSugarError> {
        let (_tx, rx) = tokio::sync::mpsc::channel(1);
        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), NoSugarError> {
        let target = message.reply_target.clone().unwrap_or_default();
        if self.unreachable.lock().unwrap().contains(&target) {
            return Err(NoSugarError::Channel(format!("chat {target} not found")));
        }
        if self.blocked.lock().unwrap().contains(&target) {
            return Err(NoSugarError::Unreachable(format!(
                "chat {target}: bot was blocked by the user"
            )));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        _text: Option<&str>,
    ) -> Result<(), NoSugarError> {
        self.answered.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }

    async fn stop(&self) -> Result<(), NoSugarError> {
        Ok(())
    }
}

struct Harness {
    gw: Arc<Gateway>,
    channel: Arc<FakeChannel>,
    store: Arc<Store>,
}

async fn harness_with(generator: Generator, card: Option<&str>) -> Harness {
    let channel = Arc::new(FakeChannel::default());
    let store = Arc::new(Store::in_memory().await.unwrap());
    let gw = Gateway::new(
        channel.clone(),
        store.clone(),
        generator,
        SchedulerConfig::default(),
        card.map(String::from),
    )
    .unwrap();
    Harness {
        gw: Arc::new(gw),
        channel,
        store,
    }
}

async fn harness() -> Harness {
    harness_with(Generator::offline(), None).await
}

fn profile(user: i64) -> SenderProfile {
    SenderProfile {
        platform_id: user,
        username: Some(format!("user{user}")),
        first_name: Some("Ann".into()),
        last_name: None,
    }
}

fn text(user: i64, body: &str) -> IncomingMessage {
    IncomingMessage {
        id: Uuid::new_v4(),
        channel: "telegram".into(),
        sender: profile(user),
        text: body.into(),
        timestamp: Utc::now(),
        callback_data: None,
        callback_id: None,
        reply_target: Some(user.to_string()),
    }
}

fn press(user: i64, data: &str) -> IncomingMessage {
    IncomingMessage {
        text: String::new(),
        callback_data: Some(data.into()),
        callback_id: Some(format!("cb-{data}")),
        ..text(user, "")
    }
}

async fn user_row(store: &Store, user: i64) -> User {
    store.get_user_by_telegram_id(user).await.unwrap().unwrap()
}

// --- commands and menus ---

#[tokio::test]
async fn test_start_registers_user_and_shows_menu() {
    let h = harness().await;
    h.gw.handle_message(text(42, "/start")).await;

    let user = user_row(&h.store, 42).await;
    assert_eq!(user.first_name.as_deref(), Some("Ann"));

    let msg = h.channel.last_to(42);
    assert!(msg.text.contains("Hi, Ann!"));
    assert_eq!(msg.buttons, main_menu());
}

#[tokio::test]
async fn test_start_clears_pending_mode() {
    let h = harness().await;
    h.gw.handle_message(text(42, "/note")).await;
    assert_eq!(h.gw.state.get(42), Some(PendingMode::WaitingForNote));

    h.gw.handle_message(text(42, "/start@NoSugarBot")).await;
    assert_eq!(h.gw.state.get(42), None);
}

#[tokio::test]
async fn test_unknown_command() {
    let h = harness().await;
    h.gw.handle_message(text(42, "/dance")).await;
    assert!(h.channel.last_to(42).text.contains("Unknown command"));
}

#[tokio::test]
async fn test_button_press_is_acknowledged() {
    let h = harness().await;
    h.gw.handle_message(press(42, MENU_HELP)).await;

    assert_eq!(*h.channel.answered.lock().unwrap(), vec!["cb-menu_help"]);
    let msg = h.channel.last_to(42);
    assert!(msg.text.contains("/recipe"));
    assert_eq!(msg.buttons, help());
}

#[tokio::test]
async fn test_unknown_button_returns_to_menu() {
    let h = harness().await;
    h.gw.handle_message(press(42, "legacy_button")).await;
    let msg = h.channel.last_to(42);
    assert!(msg.text.contains("no longer active"));
    assert_eq!(msg.buttons, main_menu());
}

// --- check-ins ---

#[tokio::test]
async fn test_checkin_success_then_duplicate() {
    let h = harness().await;
    h.gw.handle_message(press(42, CHECKIN_SUCCESS)).await;

    assert!(h.channel.last_to(42).text.contains("Great job"));
    let user = user_row(&h.store, 42).await;
    assert_eq!(user.current_streak, 1);
    assert_eq!(user.longest_streak, 1);
    assert_eq!(user.total_days, 1);

    // A second answer the same day is refused and changes nothing.
    h.gw.handle_message(press(42, CHECKIN_FAIL)).await;
    assert!(h.channel.last_to(42).text.contains("already checked in"));
    let history = h.store.list_checkins(user.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].success);
    assert_eq!(user_row(&h.store, 42).await.total_slip_ups, 0);
}

#[tokio::test]
async fn test_checkin_menu_reflects_today() {
    let h = harness().await;
    h.gw.handle_message(press(42, MENU_CHECKIN)).await;
    assert_eq!(h.channel.last_to(42).buttons, checkin_question());

    h.gw.handle_message(press(42, CHECKIN_SUCCESS)).await;
    h.gw.handle_message(press(42, MENU_CHECKIN)).await;
    let msg = h.channel.last_to(42);
    assert!(msg.text.contains("already checked in"));
    assert_eq!(msg.buttons, already_checked_in());
}

#[tokio::test]
async fn test_streak_recomputed_from_history() {
    let h = harness().await;
    h.gw.handle_message(text(42, "/start")).await;
    let user = user_row(&h.store, 42).await;
    let today = h.gw.schedule.today();

    for (days_ago, success) in [(3, true), (2, true), (1, false)] {
        h.store
            .create_checkin(user.id, today - Duration::days(days_ago), success)
            .await
            .unwrap();
    }

    h.gw.handle_message(press(42, CHECKIN_SUCCESS)).await;
    let user = user_row(&h.store, 42).await;
    assert_eq!(user.current_streak, 1);
    assert_eq!(user.longest_streak, 2);
    assert_eq!(user.total_days, 4);
    assert_eq!(user.total_slip_ups, 1);

    h.gw.handle_message(text(42, "/stats")).await;
    let stats = h.channel.last_to(42).text;
    assert!(stats.contains("Success rate: <b>75.0%</b>"));
    assert!(stats.contains("Slip-ups: <b>1</b>"));
}

#[tokio::test]
async fn test_slip_with_payment_card() {
    let h = harness_with(Generator::offline(), Some("4169 1111 2222 3333")).await;
    h.gw.handle_message(press(42, CHECKIN_FAIL)).await;

    let texts = h.channel.texts_to(42);
    assert_eq!(texts.len(), 2);
    assert!(texts[0].contains("The streak starts over"));
    assert!(texts[1].contains("4169 1111 2222 3333"));
    assert_eq!(user_row(&h.store, 42).await.total_slip_ups, 1);
}

#[tokio::test]
async fn test_slip_without_payment_card() {
    let h = harness().await;
    h.gw.handle_message(press(42, CHECKIN_FAIL)).await;
    let texts = h.channel.texts_to(42);
    assert_eq!(texts.len(), 1);
    assert_eq!(h.channel.last_to(42).buttons, slip_analysis());
}

// --- pending modes ---

#[tokio::test]
async fn test_note_flow() {
    let h = harness().await;
    h.gw.handle_message(press(42, NOTE_CREATE)).await;
    h.gw.handle_message(text(42, "Skipped dessert at lunch")).await;

    let user = user_row(&h.store, 42).await;
    let notes = h.store.list_notes(user.id, 10).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].content, "Skipped dessert at lunch");
    assert!(h.channel.last_to(42).text.contains("Note saved"));

    // The mode was consumed: the next text is not a note.
    h.gw.handle_message(text(42, "Another thought")).await;
    assert_eq!(h.store.list_notes(user.id, 10).await.unwrap().len(), 1);
    assert!(h.channel.last_to(42).text.contains("/start"));
}

#[tokio::test]
async fn test_note_list_truncates_and_escapes() {
    let h = harness().await;
    h.gw.handle_message(text(42, "/start")).await;
    let user = user_row(&h.store, 42).await;
    h.store.create_note(user.id, &"x".repeat(150)).await.unwrap();
    h.store.create_note(user.id, "<b>bold</b>").await.unwrap();

    h.gw.handle_message(press(42, NOTE_LIST)).await;
    let listing = h.channel.last_to(42).text;
    assert!(listing.contains(&format!("{}...", "x".repeat(100))));
    assert!(!listing.contains(&"x".repeat(101)));
    assert!(listing.contains("&lt;b&gt;bold&lt;/b&gt;"));
}

#[tokio::test]
async fn test_back_cancels_pending_mode() {
    let h = harness().await;
    h.gw.handle_message(text(42, "/note")).await;
    h.gw.handle_message(press(42, MENU_BACK)).await;
    h.gw.handle_message(text(42, "not a note")).await;

    let user = user_row(&h.store, 42).await;
    assert!(h.store.list_notes(user.id, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_recipe_flow_offline() {
    let h = harness().await;
    h.gw.handle_message(press(42, RECIPE_CREATE)).await;
    h.gw.handle_message(text(42, "eggs, spinach")).await;

    let texts = h.channel.texts_to(42);
    assert_eq!(texts.len(), 3);
    assert!(texts[1].contains("Looking for a sugar-free recipe"));
    assert!(texts[2].contains("- eggs, spinach"));

    let user = user_row(&h.store, 42).await;
    let recipes = h.store.list_recipes(user.id, 10).await.unwrap();
    assert_eq!(recipes.len(), 1);
    assert_eq!(recipes[0].ingredients, "eggs, spinach");

    h.gw.handle_message(press(42, RECIPE_LIST)).await;
    assert!(h.channel.last_to(42).text.contains("1. eggs, spinach"));
}

#[tokio::test]
async fn test_recipe_uses_provider_and_escapes() {
    let fake = Arc::new(FakeProvider::answering("🍳 Eggs & greens"));
    let h = harness_with(Generator::new(Some(fake.clone())), None).await;
    h.gw.handle_message(text(42, "/recipe")).await;
    h.gw.handle_message(text(42, "eggs")).await;

    assert_eq!(h.channel.last_to(42).text, "🍳 Eggs &amp; greens");
    let user = user_row(&h.store, 42).await;
    let recipes = h.store.list_recipes(user.id, 1).await.unwrap();
    assert_eq!(recipes[0].recipe_text, "🍳 Eggs & greens");
    assert_eq!(fake.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_slip_analysis_saved_as_prefixed_note() {
    let h = harness().await;
    h.gw.handle_message(press(42, SLIP_ANALYSIS)).await;
    h.gw.handle_message(text(42, "Stressful day at work")).await;

    let user = user_row(&h.store, 42).await;
    let notes = h.store.list_notes(user.id, 10).await.unwrap();
    assert_eq!(notes[0].content, "[Slip analysis] Stressful day at work");
}

#[tokio::test]
async fn test_empty_text_keeps_pending_mode() {
    let h = harness().await;
    h.gw.handle_message(text(42, "/note")).await;
    h.gw.handle_message(text(42, "   ")).await;
    assert_eq!(h.gw.state.get(42), Some(PendingMode::WaitingForNote));
}

// --- keywords ---

#[tokio::test]
async fn test_sweet_craving_keyword() {
    let h = harness().await;
    h.gw.handle_message(text(42, "Хочу сладкого")).await;
    let msg = h.channel.last_to(42);
    assert!(msg.text.contains("Try one of these instead"));
    assert!(msg.text.contains(crate::motivation::ALTERNATIVE_SNACKS[0]));
    assert_eq!(msg.buttons, sweet_craving());
}

#[tokio::test]
async fn test_motivation_keyword_uses_generator() {
    let fake = Arc::new(FakeProvider::answering("Stay strong <3"));
    let h = harness_with(Generator::new(Some(fake)), None).await;
    h.gw.handle_message(text(42, "need motivation")).await;
    assert!(h.channel.last_to(42).text.contains("Stay strong &lt;3"));
}

#[tokio::test]
async fn test_unrecognized_text() {
    let h = harness().await;
    h.gw.handle_message(text(42, "what's the weather?")).await;
    assert!(h.channel.last_to(42).text.contains("/start"));
}

// --- challenges ---

#[tokio::test]
async fn test_challenge_view_without_challenge() {
    let h = harness().await;
    h.gw.handle_message(press(42, MENU_CHALLENGE)).await;
    assert!(h.channel.last_to(42).text.contains("No challenge yet"));
}

#[tokio::test]
async fn test_weekly_challenge_fan_out_and_completion() {
    let h = harness_with(
        Generator::new(Some(Arc::new(FakeProvider::answering("🎯 Water week")))),
        None,
    )
    .await;
    h.gw.handle_message(text(1, "/start")).await;
    h.gw.handle_message(text(2, "/start")).await;
    h.channel.clear();

    let today = h.gw.schedule.today();
    let sent = h.gw.create_weekly_challenges(today).await.unwrap();
    assert_eq!(sent, 2);

    for id in [1, 2] {
        let user = user_row(&h.store, id).await;
        let issued = h.store.latest_challenge(user.id).await.unwrap().unwrap();
        assert_eq!(issued.challenge_text, "🎯 Water week");
        assert_eq!(issued.challenge_date, today);
        assert!(!issued.completed);
        assert_eq!(h.channel.last_to(id).buttons, challenge(true));
    }

    h.gw.handle_message(press(1, CHALLENGE_COMPLETE)).await;
    assert!(h.channel.last_to(1).text.contains("Challenge complete"));
    let user = user_row(&h.store, 1).await;
    assert!(h.store.latest_challenge(user.id).await.unwrap().unwrap().completed);

    h.gw.handle_message(press(1, CHALLENGE_COMPLETE)).await;
    assert!(h.channel.last_to(1).text.contains("already done"));

    h.gw.handle_message(press(1, MENU_CHALLENGE)).await;
    let view = h.channel.last_to(1);
    assert!(view.text.contains("Completed"));
    assert_eq!(view.buttons, challenge(false));
}

#[tokio::test]
async fn test_weekly_challenge_skips_unreachable_user() {
    let h = harness().await;
    h.gw.handle_message(text(1, "/start")).await;
    h.gw.handle_message(text(2, "/start")).await;
    h.channel.unreachable.lock().unwrap().push("1".into());

    let sent = h.gw.create_weekly_challenges(h.gw.schedule.today()).await.unwrap();
    assert_eq!(sent, 1);
    assert!(h.channel.last_to(2).text.contains("New weekly challenge"));
}

// --- reminders ---

#[tokio::test]
async fn test_daily_reminder_skips_checked_in_users() {
    let h = harness().await;
    h.gw.handle_message(text(1, "/start")).await;
    h.gw.handle_message(text(2, "/start")).await;
    h.gw.handle_message(press(1, CHECKIN_SUCCESS)).await;
    h.channel.clear();

    let sent = h
        .gw
        .fire(scheduler::ScheduledEvent::DailyReminder, h.gw.schedule.today())
        .await
        .unwrap();
    assert_eq!(sent, 1);
    assert!(h.channel.texts_to(1).is_empty());
    let msg = h.channel.last_to(2);
    assert!(msg.text.contains("daily check-in"));
    assert_eq!(msg.buttons, checkin_question());
}

#[tokio::test]
async fn test_daily_reminder_continues_after_send_failure() {
    let h = harness().await;
    for id in [1, 2, 3] {
        h.gw.handle_message(text(id, "/start")).await;
    }
    h.channel.unreachable.lock().unwrap().push("2".into());
    h.channel.clear();

    let sent = h.gw.send_daily_reminders(h.gw.schedule.today()).await.unwrap();
    assert_eq!(sent, 2);
    assert_eq!(h.channel.texts_to(3).len(), 1);
}

#[tokio::test]
async fn test_blocked_user_paused_until_next_message() {
    let h = harness().await;
    h.gw.handle_message(text(1, "/start")).await;
    h.gw.handle_message(text(2, "/start")).await;
    h.channel.blocked.lock().unwrap().push("1".into());
    h.channel.clear();

    let today = h.gw.schedule.today();
    assert_eq!(h.gw.send_daily_reminders(today).await.unwrap(), 1);
    assert!(!user_row(&h.store, 1).await.is_active);
    assert!(user_row(&h.store, 2).await.is_active);

    // No more attempts while paused.
    assert_eq!(h.gw.create_weekly_challenges(today).await.unwrap(), 1);
    let user = user_row(&h.store, 1).await;
    assert!(h.store.latest_challenge(user.id).await.unwrap().is_none());

    // Unblocking and writing again resumes notifications.
    h.channel.blocked.lock().unwrap().clear();
    h.gw.handle_message(text(1, "/start")).await;
    assert!(user_row(&h.store, 1).await.is_active);
    h.channel.clear();
    assert_eq!(h.gw.send_daily_reminders(today).await.unwrap(), 2);
    assert!(h.channel.last_to(1).text.contains("daily check-in"));
}

#[tokio::test]
async fn test_transient_send_failure_keeps_user_active() {
    let h = harness().await;
    h.gw.handle_message(text(1, "/start")).await;
    h.channel.unreachable.lock().unwrap().push("1".into());

    assert_eq!(h.gw.send_daily_reminders(h.gw.schedule.today()).await.unwrap(), 0);
    assert!(user_row(&h.store, 1).await.is_active);
}

#[tokio::test]
async fn test_manual_triggers() {
    let h = harness().await;
    assert!(h.gw.remind_user(42).await.is_err());

    h.gw.handle_message(text(42, "/start")).await;
    h.gw.handle_message(press(42, CHECKIN_SUCCESS)).await;
    h.channel.clear();

    // The manual reminder goes out even after today's check-in.
    h.gw.remind_user(42).await.unwrap();
    assert!(h.channel.last_to(42).text.contains("daily check-in"));

    h.gw.challenge_user(42).await.unwrap();
    let user = user_row(&h.store, 42).await;
    assert!(h.store.latest_challenge(user.id).await.unwrap().is_some());
}

// --- dispatch ---

#[tokio::test]
async fn test_dispatch_processes_queued_messages_in_order() {
    let h = harness().await;
    let first = tokio::spawn(h.gw.clone().dispatch_message(text(42, "/note")));
    let second = tokio::spawn(h.gw.clone().dispatch_message(text(42, "first note")));
    first.await.unwrap();
    second.await.unwrap();

    // The second message waited for "/note" and was read as the note.
    let user = user_row(&h.store, 42).await;
    let notes = h.store.list_notes(user.id, 10).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert!(h.gw.active_senders.lock().await.is_empty());
}

// --- scheduler loop ---

/// Storage with a fixed user list whose `list_active_users` fails the
/// first `failures` calls. Keeps the loop test off sqlx, whose pool timers
/// misbehave under a paused clock.
struct ScriptedStorage {
    users: Vec<User>,
    failures: AtomicU32,
    user_queries: AtomicU32,
    challenges: StdMutex<Vec<Challenge>>,
}

impl ScriptedStorage {
    fn new(telegram_ids: &[i64], failures: u32) -> Self {
        let users = telegram_ids
            .iter()
            .zip(1..)
            .map(|(&telegram_id, id)| User {
                id,
                telegram_id,
                username: None,
                first_name: None,
                last_name: None,
                current_streak: 0,
                longest_streak: 0,
                total_days: 0,
                total_slip_ups: 0,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .collect();
        Self {
            users,
            failures: AtomicU32::new(failures),
            user_queries: AtomicU32::new(0),
            challenges: StdMutex::new(Vec::new()),
        }
    }

    fn read_only() -> NoSugarError {
        NoSugarError::Memory("scripted storage is read-only".into())
    }
}

#[async_trait]
impl Storage for ScriptedStorage {
    async fn get_or_create_user(&self, profile: &SenderProfile) -> Result<User, NoSugarError> {
        self.get_user_by_telegram_id(profile.platform_id)
            .await?
            .ok_or_else(Self::read_only)
    }

    async fn get_user_by_telegram_id(
        &self,
        telegram_id: i64,
    ) -> Result<Option<User>, NoSugarError> {
        Ok(self.users.iter().find(|u| u.telegram_id == telegram_id).cloned())
    }

    async fn list_active_users(&self) -> Result<Vec<User>, NoSugarError> {
        self.user_queries.fetch_add(1, Ordering::SeqCst);
        let fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(NoSugarError::Memory("database is locked".into()));
        }
        Ok(self.users.clone())
    }

    async fn set_user_active(&self, _user_id: i64, _active: bool) -> Result<(), NoSugarError> {
        Err(Self::read_only())
    }

    async fn update_user_stats(
        &self,
        _user_id: i64,
        _stats: &StreakStats,
    ) -> Result<(), NoSugarError> {
        Err(Self::read_only())
    }

    async fn get_checkin_for_date(
        &self,
        _user_id: i64,
        _date: NaiveDate,
    ) -> Result<Option<CheckIn>, NoSugarError> {
        Ok(None)
    }

    async fn create_checkin(
        &self,
        _user_id: i64,
        _date: NaiveDate,
        _success: bool,
    ) -> Result<CheckIn, NoSugarError> {
        Err(Self::read_only())
    }

    async fn list_checkins(&self, _user_id: i64) -> Result<Vec<CheckIn>, NoSugarError> {
        Ok(Vec::new())
    }

    async fn create_note(&self, _user_id: i64, _content: &str) -> Result<Note, NoSugarError> {
        Err(Self::read_only())
    }

    async fn list_notes(&self, _user_id: i64, _limit: u32) -> Result<Vec<Note>, NoSugarError> {
        Ok(Vec::new())
    }

    async fn create_challenge(
        &self,
        user_id: i64,
        date: NaiveDate,
        text: &str,
    ) -> Result<Challenge, NoSugarError> {
        let mut challenges = self.challenges.lock().unwrap();
        let challenge = Challenge {
            id: challenges.len() as i64 + 1,
            user_id,
            challenge_date: date,
            challenge_text: text.to_string(),
            completed: false,
            created_at: Utc::now(),
        };
        challenges.push(challenge.clone());
        Ok(challenge)
    }

    async fn latest_challenge(&self, user_id: i64) -> Result<Option<Challenge>, NoSugarError> {
        let challenges = self.challenges.lock().unwrap();
        Ok(challenges.iter().rev().find(|c| c.user_id == user_id).cloned())
    }

    async fn complete_challenge(&self, _challenge_id: i64) -> Result<(), NoSugarError> {
        Err(Self::read_only())
    }

    async fn create_recipe(
        &self,
        _user_id: i64,
        _ingredients: &str,
        _recipe_text: &str,
    ) -> Result<Recipe, NoSugarError> {
        Err(Self::read_only())
    }

    async fn list_recipes(&self, _user_id: i64, _limit: u32) -> Result<Vec<Recipe>, NoSugarError> {
        Ok(Vec::new())
    }
}

/// Local wall-clock instant at UTC+6, the default offset.
fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
    let tz = FixedOffset::east_opt(6 * 3600).unwrap();
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
        .and_local_timezone(tz)
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_loop_fires_each_slot_once_and_retries() {
    let channel = Arc::new(FakeChannel::default());
    let storage = Arc::new(ScriptedStorage::new(&[42], 1));
    let cfg = SchedulerConfig {
        retry_backoff_secs: 60,
        ..Default::default()
    };
    let gw = Arc::new(
        Gateway::new(channel.clone(), storage.clone(), Generator::offline(), cfg, None).unwrap(),
    );

    // Sunday 2025-06-08 18:00 local. Ahead: Sunday's reminder at 19:00,
    // Monday's challenge at 07:00 and Monday's reminder at 19:00.
    let start = local(2025, 6, 8, 18, 0);
    let t0 = tokio::time::Instant::now();
    let clock = move || start + Duration::from_std(t0.elapsed()).unwrap();

    let looper = gw.clone();
    let task = tokio::spawn(async move { looper.run_schedule(clock).await });

    // Just before Sunday's slot nothing has gone out.
    tokio::time::sleep(std::time::Duration::from_secs(59 * 60)).await;
    assert!(channel.texts_to(42).is_empty());

    // The first listing fails; the retry one backoff later delivers.
    tokio::time::sleep(std::time::Duration::from_secs(3 * 60)).await;
    assert_eq!(storage.user_queries.load(Ordering::SeqCst), 2);
    assert_eq!(channel.texts_to(42).len(), 1);

    // Run on to Monday 20:00.
    tokio::time::sleep(std::time::Duration::from_secs(25 * 3600)).await;
    task.abort();

    let texts = channel.texts_to(42);
    let reminders = texts.iter().filter(|t| t.contains("daily check-in")).count();
    let challenges = texts.iter().filter(|t| t.contains("New weekly challenge")).count();
    assert_eq!(reminders, 2);
    assert_eq!(challenges, 1);
    assert_eq!(texts.len(), 3);
    assert_eq!(storage.user_queries.load(Ordering::SeqCst), 4);

    let issued = storage.challenges.lock().unwrap();
    assert_eq!(issued.len(), 1);
    assert_eq!(issued[0].challenge_date, NaiveDate::from_ymd_opt(2025, 6, 9).unwrap());
}
