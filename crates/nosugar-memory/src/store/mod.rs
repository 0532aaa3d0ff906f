//! SQLite-backed persistent store.
//!
//! Split into focused submodules:
//! - `users`: user lookup, creation, cached streak counters
//! - `checkins`: daily answers, one per user per day
//! - `notes`: free-form journal entries
//! - `challenges`: weekly challenges and their completion
//! - `recipes`: generated recipes

mod challenges;
mod checkins;
mod notes;
mod recipes;
mod users;

use async_trait::async_trait;
use chrono::NaiveDate;
use nosugar_core::{
    config::MemoryConfig,
    error::NoSugarError,
    message::SenderProfile,
    models::{Challenge, CheckIn, Note, Recipe, User},
    shellexpand,
    streak::StreakStats,
    traits::Storage,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Persistent store backed by SQLite.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database file and run migrations.
    pub async fn new(config: &MemoryConfig) -> Result<Self, NoSugarError> {
        let db_path = shellexpand(&config.db_path);

        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| NoSugarError::Memory(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| NoSugarError::Memory(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| NoSugarError::Memory(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("Store initialized at {db_path}");

        Ok(Self { pool })
    }

    /// Throwaway in-memory database for tests.
    pub async fn in_memory() -> Result<Self, NoSugarError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| NoSugarError::Memory(format!("invalid db path: {e}")))?
            .foreign_keys(true);

        // The database lives only as long as its connection: keep exactly one,
        // and never let the pool reap it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .map_err(|e| NoSugarError::Memory(format!("failed to open in-memory db: {e}")))?;

        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run SQL migrations, tracking which have already been applied.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), NoSugarError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| NoSugarError::Memory(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] =
            &[("001_init", include_str!("../../migrations/001_init.sql"))];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        NoSugarError::Memory(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| NoSugarError::Memory(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| {
                    NoSugarError::Memory(format!("failed to record migration {name}: {e}"))
                })?;
        }
        Ok(())
    }
}

/// Convert a stored counter, clamping corrupt negative values to zero.
pub(crate) fn counter(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

#[async_trait]
impl Storage for Store {
    async fn get_or_create_user(&self, profile: &SenderProfile) -> Result<User, NoSugarError> {
        self.upsert_user(profile).await
    }

    async fn get_user_by_telegram_id(
        &self,
        telegram_id: i64,
    ) -> Result<Option<User>, NoSugarError> {
        self.find_user(telegram_id).await
    }

    async fn list_active_users(&self) -> Result<Vec<User>, NoSugarError> {
        self.active_users().await
    }

    async fn set_user_active(&self, user_id: i64, active: bool) -> Result<(), NoSugarError> {
        self.write_user_active(user_id, active).await
    }

    async fn update_user_stats(
        &self,
        user_id: i64,
        stats: &StreakStats,
    ) -> Result<(), NoSugarError> {
        self.write_user_stats(user_id, stats).await
    }

    async fn get_checkin_for_date(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<CheckIn>, NoSugarError> {
        self.checkin_on(user_id, date).await
    }

    async fn create_checkin(
        &self,
        user_id: i64,
        date: NaiveDate,
        success: bool,
    ) -> Result<CheckIn, NoSugarError> {
        self.insert_checkin(user_id, date, success).await
    }

    async fn list_checkins(&self, user_id: i64) -> Result<Vec<CheckIn>, NoSugarError> {
        self.checkin_history(user_id).await
    }

    async fn create_note(&self, user_id: i64, content: &str) -> Result<Note, NoSugarError> {
        self.insert_note(user_id, content).await
    }

    async fn list_notes(&self, user_id: i64, limit: u32) -> Result<Vec<Note>, NoSugarError> {
        self.recent_notes(user_id, limit).await
    }

    async fn create_challenge(
        &self,
        user_id: i64,
        date: NaiveDate,
        text: &str,
    ) -> Result<Challenge, NoSugarError> {
        self.insert_challenge(user_id, date, text).await
    }

    async fn latest_challenge(&self, user_id: i64) -> Result<Option<Challenge>, NoSugarError> {
        self.newest_challenge(user_id).await
    }

    async fn complete_challenge(&self, challenge_id: i64) -> Result<(), NoSugarError> {
        self.mark_challenge_completed(challenge_id).await
    }

    async fn create_recipe(
        &self,
        user_id: i64,
        ingredients: &str,
        recipe_text: &str,
    ) -> Result<Recipe, NoSugarError> {
        self.insert_recipe(user_id, ingredients, recipe_text).await
    }

    async fn list_recipes(&self, user_id: i64, limit: u32) -> Result<Vec<Recipe>, NoSugarError> {
        self.recent_recipes(user_id, limit).await
    }
}
