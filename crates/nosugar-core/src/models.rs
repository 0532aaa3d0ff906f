//! Persisted domain entities.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A bot user with cached streak counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Internal row id.
    pub id: i64,
    /// Platform (Telegram) user id; also the private chat id.
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_days: u32,
    pub total_slip_ups: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One daily pass/fail answer. At most one per user per calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: i64,
    pub user_id: i64,
    pub check_date: NaiveDate,
    /// `true` = stayed sugar-free, `false` = slipped.
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

/// Free-form journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A weekly challenge issued to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: i64,
    pub user_id: i64,
    pub challenge_date: NaiveDate,
    pub challenge_text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// A generated sugar-free recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub user_id: i64,
    pub ingredients: String,
    pub recipe_text: String,
    pub created_at: DateTime<Utc>,
}
