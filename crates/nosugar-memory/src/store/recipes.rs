use super::Store;
use chrono::{DateTime, Utc};
use nosugar_core::{error::NoSugarError, models::Recipe};

impl Store {
    pub async fn insert_recipe(
        &self,
        user_id: i64,
        ingredients: &str,
        recipe_text: &str,
    ) -> Result<Recipe, NoSugarError> {
        let created_at = Utc::now();
        let done = sqlx::query(
            "INSERT INTO recipes (user_id, ingredients, recipe_text, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(ingredients)
        .bind(recipe_text)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| NoSugarError::Memory(format!("recipe insert failed: {e}")))?;

        Ok(Recipe {
            id: done.last_insert_rowid(),
            user_id,
            ingredients: ingredients.to_string(),
            recipe_text: recipe_text.to_string(),
            created_at,
        })
    }

    /// Newest first.
    pub async fn recent_recipes(
        &self,
        user_id: i64,
        limit: u32,
    ) -> Result<Vec<Recipe>, NoSugarError> {
        let rows: Vec<(i64, i64, String, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, user_id, ingredients, recipe_text, created_at FROM recipes \
             WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NoSugarError::Memory(format!("recipe query failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(id, user_id, ingredients, recipe_text, created_at)| Recipe {
                id,
                user_id,
                ingredients,
                recipe_text,
                created_at,
            })
            .collect())
    }
}
