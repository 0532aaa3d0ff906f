use crate::{
    context::Context,
    error::NoSugarError,
    message::{IncomingMessage, OutgoingMessage, SenderProfile},
    models::{Challenge, CheckIn, Note, Recipe, User},
    streak::StreakStats,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Text-generation provider trait.
///
/// Every chat-completion backend implements this trait so the generator can
/// stay backend-agnostic.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Whether this provider requires an API key to function.
    fn requires_api_key(&self) -> bool;

    /// Send a prompt context to the provider and get the generated text.
    async fn complete(&self, context: &Context) -> Result<String, NoSugarError>;

    /// Check if the provider is available and ready.
    async fn is_available(&self) -> bool;
}

/// Messaging channel trait: where users talk to the bot and where
/// notifications are delivered.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming messages.
    /// Returns a receiver that yields incoming messages.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, NoSugarError>;

    /// Send a message through this channel.
    async fn send(&self, message: OutgoingMessage) -> Result<(), NoSugarError>;

    /// Acknowledge an inline button press, optionally with a short toast.
    async fn answer_callback(
        &self,
        _callback_id: &str,
        _text: Option<&str>,
    ) -> Result<(), NoSugarError> {
        Ok(())
    }

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), NoSugarError>;
}

/// Persistence for users and their habit data.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch the user for a platform profile, creating it on first contact.
    /// Stored names are refreshed when they changed, and an inactive user is
    /// reactivated.
    async fn get_or_create_user(&self, profile: &SenderProfile) -> Result<User, NoSugarError>;

    async fn get_user_by_telegram_id(&self, telegram_id: i64)
        -> Result<Option<User>, NoSugarError>;

    /// All users that should receive scheduled notifications.
    async fn list_active_users(&self) -> Result<Vec<User>, NoSugarError>;

    /// Pause or resume scheduled notifications for a user.
    async fn set_user_active(&self, user_id: i64, active: bool) -> Result<(), NoSugarError>;

    /// Persist recomputed streak counters.
    async fn update_user_stats(&self, user_id: i64, stats: &StreakStats)
        -> Result<(), NoSugarError>;

    async fn get_checkin_for_date(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<CheckIn>, NoSugarError>;

    /// Record a check-in. Fails with `CheckInError::AlreadyCheckedIn` if the
    /// user already has one for `date`.
    async fn create_checkin(
        &self,
        user_id: i64,
        date: NaiveDate,
        success: bool,
    ) -> Result<CheckIn, NoSugarError>;

    /// Full check-in history, oldest first.
    async fn list_checkins(&self, user_id: i64) -> Result<Vec<CheckIn>, NoSugarError>;

    async fn create_note(&self, user_id: i64, content: &str) -> Result<Note, NoSugarError>;

    /// Most recent notes first.
    async fn list_notes(&self, user_id: i64, limit: u32) -> Result<Vec<Note>, NoSugarError>;

    async fn create_challenge(
        &self,
        user_id: i64,
        date: NaiveDate,
        text: &str,
    ) -> Result<Challenge, NoSugarError>;

    /// The most recently issued challenge, if any.
    async fn latest_challenge(&self, user_id: i64) -> Result<Option<Challenge>, NoSugarError>;

    async fn complete_challenge(&self, challenge_id: i64) -> Result<(), NoSugarError>;

    async fn create_recipe(
        &self,
        user_id: i64,
        ingredients: &str,
        recipe_text: &str,
    ) -> Result<Recipe, NoSugarError>;

    /// Most recent recipes first.
    async fn list_recipes(&self, user_id: i64, limit: u32) -> Result<Vec<Recipe>, NoSugarError>;
}
