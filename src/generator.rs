//! Recipe, motivation and challenge text generation.
//!
//! Wraps an optional [`Provider`]. Every call has its own timeout and sampling
//! settings, and any failure falls back to canned text, so callers always get
//! something to send.

use crate::motivation;
use nosugar_core::{context::Context, traits::Provider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const RECIPE_TIMEOUT: Duration = Duration::from_secs(30);
const MOTIVATION_TIMEOUT: Duration = Duration::from_secs(15);
const CHALLENGE_TIMEOUT: Duration = Duration::from_secs(15);

const RECIPE_PROMPT: &str = "You are an expert in healthy eating and cooking. \
Create tasty, wholesome recipes with no added sugar.\n\n\
Rules:\n\
1. Do NOT add sugar, syrups or any other sweeteners\n\
2. Use only natural ingredients\n\
3. Keep the recipe simple and affordable\n\
4. State the cooking time\n\
5. Add a useful cooking tip\n\n\
Answer format:\n\
🍳 [Dish name]\n\n\
⏰ Cooking time: [X minutes]\n\n\
🥗 Ingredients:\n- [ingredient list]\n\n\
👨‍🍳 Steps:\n1. [step 1]\n2. [step 2]\n...\n\n\
💡 Tip: [cooking or health tip]";

const MOTIVATION_PROMPT: &str = "You are a motivational coach who specialises in healthy \
living and quitting sugar. Write inspiring, supportive messages that help people keep going.\n\n\
Rules:\n\
1. Be positive and supportive\n\
2. Mention the concrete achievement (the streak)\n\
3. Give a practical tip\n\
4. Use emoji\n\
5. Length: 2-3 sentences";

const CHALLENGE_PROMPT: &str = "You are an expert in healthy living and motivation. \
Create fun, achievable one-week challenges for people quitting sugar.\n\n\
Rules:\n\
1. Achievable within a week\n\
2. Related to quitting sugar or a healthy lifestyle\n\
3. Interesting and motivating\n\
4. May involve exercise, food or habits\n\
5. Length: 1-2 sentences\n\
6. No sugar or sweeteners\n\n\
Answer format:\n\
🎯 [Challenge name]\n\n\
[Challenge description in 1-2 sentences]";

/// Text generator with canned fallbacks.
#[derive(Clone, Default)]
pub struct Generator {
    provider: Option<Arc<dyn Provider>>,
}

impl Generator {
    pub fn new(provider: Option<Arc<dyn Provider>>) -> Self {
        Self { provider }
    }

    /// Generator that always answers with fallback text.
    pub fn offline() -> Self {
        Self::default()
    }

    /// Whether a backend is configured.
    pub fn is_online(&self) -> bool {
        self.provider.is_some()
    }

    /// Ask the backend. `None` on any error, timeout or empty answer.
    async fn ask(&self, context: Context, timeout: Duration, what: &str) -> Option<String> {
        let provider = self.provider.as_ref()?;
        match tokio::time::timeout(timeout, provider.complete(&context)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                info!("generated {what} via {}", provider.name());
                Some(text.trim().to_string())
            }
            Ok(Ok(_)) => {
                warn!("{} returned an empty {what}", provider.name());
                None
            }
            Ok(Err(e)) => {
                warn!("{what} generation failed: {e}");
                None
            }
            Err(_) => {
                warn!("{what} generation timed out after {}s", timeout.as_secs());
                None
            }
        }
    }

    /// Sugar-free recipe from an ingredient list.
    pub async fn recipe(&self, ingredients: &str) -> String {
        let ctx = Context::new(
            RECIPE_PROMPT,
            &format!("Create a healthy sugar-free dish using these ingredients: {ingredients}"),
        )
        .with_sampling(0.7, 1000);
        match self.ask(ctx, RECIPE_TIMEOUT, "recipe").await {
            Some(text) => text,
            None => motivation::fallback_recipe(ingredients),
        }
    }

    /// Short motivational message for a streak.
    pub async fn motivation(&self, streak: u32) -> String {
        let ctx = Context::new(
            MOTIVATION_PROMPT,
            &format!(
                "Write a motivational message for someone who has gone {streak} days without sugar."
            ),
        )
        .with_sampling(0.8, 200);
        match self.ask(ctx, MOTIVATION_TIMEOUT, "motivation").await {
            Some(text) => text,
            None => motivation::fallback_motivation(streak),
        }
    }

    /// One challenge for the coming week.
    pub async fn weekly_challenge(&self) -> String {
        let ctx = Context::new(
            CHALLENGE_PROMPT,
            "Create an interesting one-week challenge for someone quitting sugar.",
        )
        .with_sampling(0.8, 150);
        match self.ask(ctx, CHALLENGE_TIMEOUT, "weekly challenge").await {
            Some(text) => text,
            None => motivation::random_weekly_challenge().to_string(),
        }
    }
}
