//! Weekly challenges.

use super::Store;
use chrono::{DateTime, NaiveDate, Utc};
use nosugar_core::{error::NoSugarError, models::Challenge};

type ChallengeRow = (i64, i64, NaiveDate, String, bool, DateTime<Utc>);

fn challenge_from_row(row: ChallengeRow) -> Challenge {
    let (id, user_id, challenge_date, challenge_text, completed, created_at) = row;
    Challenge {
        id,
        user_id,
        challenge_date,
        challenge_text,
        completed,
        created_at,
    }
}

impl Store {
    pub async fn insert_challenge(
        &self,
        user_id: i64,
        date: NaiveDate,
        text: &str,
    ) -> Result<Challenge, NoSugarError> {
        let created_at = Utc::now();
        let done = sqlx::query(
            "INSERT INTO challenges (user_id, challenge_date, challenge_text, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(date)
        .bind(text)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| NoSugarError::Memory(format!("challenge insert failed: {e}")))?;

        Ok(Challenge {
            id: done.last_insert_rowid(),
            user_id,
            challenge_date: date,
            challenge_text: text.to_string(),
            completed: false,
            created_at,
        })
    }

    /// Most recently issued challenge.
    pub async fn newest_challenge(&self, user_id: i64) -> Result<Option<Challenge>, NoSugarError> {
        let row: Option<ChallengeRow> = sqlx::query_as(
            "SELECT id, user_id, challenge_date, challenge_text, completed, created_at \
             FROM challenges WHERE user_id = ? \
             ORDER BY challenge_date DESC, id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| NoSugarError::Memory(format!("challenge lookup failed: {e}")))?;
        Ok(row.map(challenge_from_row))
    }

    pub async fn mark_challenge_completed(&self, challenge_id: i64) -> Result<(), NoSugarError> {
        let done = sqlx::query("UPDATE challenges SET completed = 1 WHERE id = ?")
            .bind(challenge_id)
            .execute(&self.pool)
            .await
            .map_err(|e| NoSugarError::Memory(format!("challenge update failed: {e}")))?;

        if done.rows_affected() == 0 {
            return Err(NoSugarError::Memory(format!(
                "no challenge with id {challenge_id}"
            )));
        }
        Ok(())
    }
}
