//! Free-text messages: pending-mode answers first, then keywords.

use super::Gateway;
use crate::keyboards;
use crate::state::PendingMode;
use nosugar_channels::utils::escape_html;
use nosugar_core::{error::NoSugarError, message::IncomingMessage, models::User};
use tracing::info;

/// Stored in front of slip-analysis notes.
pub(super) const SLIP_ANALYSIS_PREFIX: &str = "[Slip analysis] ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Keyword {
    SweetCraving,
    Motivation,
    Stats,
    Help,
}

const KEYWORDS: &[(Keyword, &[&str])] = &[
    (
        Keyword::SweetCraving,
        &["want sugar", "want sweets", "хочу сладкого", "хочу сладкое"],
    ),
    (Keyword::Motivation, &["motivation", "мотивация"]),
    (Keyword::Stats, &["statistics", "stats", "статистик"]),
    (Keyword::Help, &["help", "помощь"]),
];

/// First keyword group found in `text`, case-insensitive.
pub(super) fn classify_keyword(text: &str) -> Option<Keyword> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(kw, _)| *kw)
}

impl Gateway {
    pub(super) async fn handle_text(
        &self,
        incoming: &IncomingMessage,
        user: &User,
    ) -> Result<(), NoSugarError> {
        // Consume the mode before anything else so a duplicate delivery
        // falls through to keyword matching.
        let Some(mode) = self.state.take(user.telegram_id) else {
            return self.handle_keyword(incoming, user).await;
        };

        let text = incoming.text.trim();
        if text.is_empty() {
            self.state.set(user.telegram_id, mode);
            self.reply(
                incoming,
                "Please send it as a text message.",
                keyboards::back(),
            )
            .await;
            return Ok(());
        }

        match mode {
            PendingMode::WaitingForRecipe => {
                self.reply(
                    incoming,
                    "🔍 Looking for a sugar-free recipe... this can take a few seconds.",
                    Vec::new(),
                )
                .await;
                let recipe = self.generator.recipe(text).await;
                self.storage.create_recipe(user.id, text, &recipe).await?;
                info!("saved recipe for {}", user.telegram_id);
                self.reply(incoming, escape_html(&recipe), keyboards::recipes())
                    .await;
            }
            PendingMode::WaitingForNote => {
                self.storage.create_note(user.id, text).await?;
                info!("saved note for {}", user.telegram_id);
                self.reply(
                    incoming,
                    "✅ Note saved! Keeping a journal helps you track your progress.",
                    keyboards::notes(),
                )
                .await;
            }
            PendingMode::WaitingForSlipAnalysis => {
                self.storage
                    .create_note(user.id, &format!("{SLIP_ANALYSIS_PREFIX}{text}"))
                    .await?;
                info!("saved slip analysis for {}", user.telegram_id);
                self.reply(
                    incoming,
                    "💙 Thank you for being honest. Knowing your triggers is the first step \
                     to handling them.\n\n\
                     Next time the same situation comes up, try a healthy snack, a short walk \
                     or a glass of water first. You've got this!",
                    keyboards::motivation(),
                )
                .await;
            }
        }
        Ok(())
    }

    async fn handle_keyword(
        &self,
        incoming: &IncomingMessage,
        user: &User,
    ) -> Result<(), NoSugarError> {
        match classify_keyword(&incoming.text) {
            Some(Keyword::SweetCraving) => self.show_sweet_craving(incoming, user).await,
            Some(Keyword::Motivation) => self.show_motivation(incoming, user).await,
            Some(Keyword::Stats) => self.show_stats(incoming, user).await?,
            Some(Keyword::Help) => {
                self.reply(incoming, super::routing::help_text(), keyboards::help())
                    .await;
            }
            None => {
                self.reply(
                    incoming,
                    "🤔 I didn't understand that. Use /start to open the menu.",
                    Vec::new(),
                )
                .await;
            }
        }
        Ok(())
    }
}
