use chrono::NaiveDate;
use thiserror::Error;

/// Top-level error type for NoSugar.
#[derive(Debug, Error)]
pub enum NoSugarError {
    /// Error from a text-generation provider.
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// The recipient can no longer be reached, e.g. the user blocked the bot.
    #[error("recipient unreachable: {0}")]
    Unreachable(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Storage error.
    #[error("memory error: {0}")]
    Memory(String),

    /// Check-in rejected by the domain rules.
    #[error("check-in rejected: {0}")]
    CheckIn(#[from] CheckInError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reasons a daily check-in is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckInError {
    /// The user already has a check-in for this calendar day.
    #[error("user {user_id} already checked in on {date}")]
    AlreadyCheckedIn { user_id: i64, date: NaiveDate },

    /// The user row does not exist.
    #[error("unknown user {0}")]
    UnknownUser(i64),
}

impl NoSugarError {
    /// Whether this error is a duplicate same-day check-in.
    pub fn is_duplicate_checkin(&self) -> bool {
        matches!(
            self,
            Self::CheckIn(CheckInError::AlreadyCheckedIn { .. })
        )
    }

    /// Whether retrying a delivery to this recipient is pointless.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}
