//! Journal notes.

use super::Store;
use chrono::{DateTime, Utc};
use nosugar_core::{error::NoSugarError, models::Note};

impl Store {
    pub async fn insert_note(&self, user_id: i64, content: &str) -> Result<Note, NoSugarError> {
        let created_at = Utc::now();
        let done =
            sqlx::query("INSERT INTO notes (user_id, content, created_at) VALUES (?, ?, ?)")
                .bind(user_id)
                .bind(content)
                .bind(created_at)
                .execute(&self.pool)
                .await
                .map_err(|e| NoSugarError::Memory(format!("note insert failed: {e}")))?;

        Ok(Note {
            id: done.last_insert_rowid(),
            user_id,
            content: content.to_string(),
            created_at,
        })
    }

    /// Newest first.
    pub async fn recent_notes(&self, user_id: i64, limit: u32) -> Result<Vec<Note>, NoSugarError> {
        let rows: Vec<(i64, i64, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, user_id, content, created_at FROM notes \
             WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NoSugarError::Memory(format!("note query failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(id, user_id, content, created_at)| Note {
                id,
                user_id,
                content,
                created_at,
            })
            .collect())
    }
}
