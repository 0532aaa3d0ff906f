//! User lookup, creation, and cached counters.

use super::{counter, Store};
use chrono::{DateTime, Utc};
use nosugar_core::{error::NoSugarError, message::SenderProfile, models::User, streak::StreakStats};
use tracing::info;

type UserRow = (
    i64,
    i64,
    Option<String>,
    Option<String>,
    Option<String>,
    i64,
    i64,
    i64,
    i64,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
);

macro_rules! select_users {
    ($tail:literal) => {
        concat!(
            "SELECT id, telegram_id, username, first_name, last_name, ",
            "current_streak, longest_streak, total_days, total_slip_ups, is_active, ",
            "created_at, updated_at FROM users ",
            $tail
        )
    };
}

fn user_from_row(row: UserRow) -> User {
    let (
        id,
        telegram_id,
        username,
        first_name,
        last_name,
        current,
        longest,
        total,
        slips,
        is_active,
        created_at,
        updated_at,
    ) = row;
    User {
        id,
        telegram_id,
        username,
        first_name,
        last_name,
        current_streak: counter(current),
        longest_streak: counter(longest),
        total_days: counter(total),
        total_slip_ups: counter(slips),
        is_active,
        created_at,
        updated_at,
    }
}

impl Store {
    /// Look up a user by platform id.
    pub async fn find_user(&self, telegram_id: i64) -> Result<Option<User>, NoSugarError> {
        let row: Option<UserRow> = sqlx::query_as(select_users!("WHERE telegram_id = ?"))
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| NoSugarError::Memory(format!("user lookup failed: {e}")))?;
        Ok(row.map(user_from_row))
    }

    /// Create the user on first contact, refresh stored names afterwards.
    ///
    /// Any message from an inactive user reactivates them.
    pub async fn upsert_user(&self, profile: &SenderProfile) -> Result<User, NoSugarError> {
        if let Some(existing) = self.find_user(profile.platform_id).await? {
            let unchanged = existing.username == profile.username
                && existing.first_name == profile.first_name
                && existing.last_name == profile.last_name;
            if unchanged && existing.is_active {
                return Ok(existing);
            }
            if !existing.is_active {
                info!("user {} is back, resuming notifications", profile.platform_id);
            }

            sqlx::query(
                "UPDATE users SET username = ?, first_name = ?, last_name = ?, is_active = 1, \
                 updated_at = ? WHERE id = ?",
            )
            .bind(&profile.username)
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(Utc::now())
            .bind(existing.id)
            .execute(&self.pool)
            .await
            .map_err(|e| NoSugarError::Memory(format!("user update failed: {e}")))?;
        } else {
            let now = Utc::now();
            // OR IGNORE: two concurrent first messages must not fail the second.
            sqlx::query(
                "INSERT OR IGNORE INTO users \
                 (telegram_id, username, first_name, last_name, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(profile.platform_id)
            .bind(&profile.username)
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| NoSugarError::Memory(format!("user insert failed: {e}")))?;
            info!("new user {}", profile.platform_id);
        }

        self.find_user(profile.platform_id)
            .await?
            .ok_or_else(|| NoSugarError::Memory("user vanished after upsert".into()))
    }

    /// Users that receive scheduled notifications.
    pub async fn active_users(&self) -> Result<Vec<User>, NoSugarError> {
        let rows: Vec<UserRow> = sqlx::query_as(select_users!("WHERE is_active = 1 ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| NoSugarError::Memory(format!("active user query failed: {e}")))?;
        Ok(rows.into_iter().map(user_from_row).collect())
    }

    /// Toggle whether a user receives scheduled notifications.
    pub async fn write_user_active(&self, user_id: i64, active: bool) -> Result<(), NoSugarError> {
        sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| NoSugarError::Memory(format!("user update failed: {e}")))?;
        Ok(())
    }

    /// Overwrite cached counters with freshly computed ones.
    pub async fn write_user_stats(
        &self,
        user_id: i64,
        stats: &StreakStats,
    ) -> Result<(), NoSugarError> {
        let result = sqlx::query(
            "UPDATE users SET current_streak = ?, longest_streak = ?, total_days = ?, \
             total_slip_ups = ?, updated_at = ? WHERE id = ?",
        )
        .bind(i64::from(stats.current_streak))
        .bind(i64::from(stats.longest_streak))
        .bind(i64::from(stats.total_days))
        .bind(i64::from(stats.total_slip_ups))
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| NoSugarError::Memory(format!("stats update failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(NoSugarError::Memory(format!("no user with id {user_id}")));
        }
        Ok(())
    }

    /// Number of registered users and how many are active.
    pub async fn user_counts(&self) -> Result<(i64, i64), NoSugarError> {
        let (total, active): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(is_active), 0) FROM users",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| NoSugarError::Memory(format!("user count failed: {e}")))?;
        Ok((total, active))
    }
}
