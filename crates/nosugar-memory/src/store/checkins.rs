//! Daily check-ins, at most one per user per calendar day.

use super::Store;
use chrono::{DateTime, NaiveDate, Utc};
use nosugar_core::{
    error::{CheckInError, NoSugarError},
    models::CheckIn,
};

type CheckInRow = (i64, i64, NaiveDate, bool, DateTime<Utc>);

fn checkin_from_row((id, user_id, check_date, success, created_at): CheckInRow) -> CheckIn {
    CheckIn {
        id,
        user_id,
        check_date,
        success,
        created_at,
    }
}

impl Store {
    pub async fn checkin_on(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<CheckIn>, NoSugarError> {
        let row: Option<CheckInRow> = sqlx::query_as(
            "SELECT id, user_id, check_date, success, created_at FROM checkins \
             WHERE user_id = ? AND check_date = ?",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| NoSugarError::Memory(format!("check-in lookup failed: {e}")))?;
        Ok(row.map(checkin_from_row))
    }

    /// Insert a check-in, rejecting a second one for the same day.
    pub async fn insert_checkin(
        &self,
        user_id: i64,
        date: NaiveDate,
        success: bool,
    ) -> Result<CheckIn, NoSugarError> {
        if self.checkin_on(user_id, date).await?.is_some() {
            return Err(CheckInError::AlreadyCheckedIn { user_id, date }.into());
        }

        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO checkins (user_id, check_date, success, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(date)
        .bind(success)
        .bind(created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(CheckIn {
                id: done.last_insert_rowid(),
                user_id,
                check_date: date,
                success,
                created_at,
            }),
            // Lost a race with a concurrent insert for the same day.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(CheckInError::AlreadyCheckedIn { user_id, date }.into())
            }
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(CheckInError::UnknownUser(user_id).into())
            }
            Err(e) => Err(NoSugarError::Memory(format!("check-in insert failed: {e}"))),
        }
    }

    /// Full history, oldest first.
    pub async fn checkin_history(&self, user_id: i64) -> Result<Vec<CheckIn>, NoSugarError> {
        let rows: Vec<CheckInRow> = sqlx::query_as(
            "SELECT id, user_id, check_date, success, created_at FROM checkins \
             WHERE user_id = ? ORDER BY check_date ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NoSugarError::Memory(format!("check-in history failed: {e}")))?;
        Ok(rows.into_iter().map(checkin_from_row).collect())
    }
}
