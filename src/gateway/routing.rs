//! Slash commands, button callbacks, and the screens they open.

use super::Gateway;
use crate::keyboards::{self, *};
use crate::state::PendingMode;
use nosugar_channels::utils::{escape_html, truncate_chars};
use nosugar_core::{
    error::NoSugarError,
    message::IncomingMessage,
    models::User,
    streak::{self, StreakStats},
};
use tracing::{info, warn};

/// How many notes or recipes a list shows.
pub(super) const LIST_LIMIT: u32 = 10;

pub(super) fn welcome_text(user: &User, name: &str) -> String {
    format!(
        "👋 Hi, {}!\n\n\
         I'm your companion on the way to a sugar-free life. 🍭🚫\n\n\
         🔥 Current streak: <b>{}</b> days\n\
         🏆 Longest streak: <b>{}</b> days\n\n\
         Pick an action:",
        escape_html(name),
        user.current_streak,
        user.longest_streak,
    )
}

pub(super) fn help_text() -> &'static str {
    "ℹ️ <b>Help</b>\n\n\
     🍭 <b>A bot for quitting sugar</b>\n\n\
     <b>Commands:</b>\n\
     /start - Main menu\n\
     /note - Add a note\n\
     /recipe - Find a recipe\n\
     /stats - Your statistics\n\
     /help - This message\n\n\
     <b>Features:</b>\n\
     ✅ Daily check-ins\n\
     📊 Progress statistics\n\
     🍳 Sugar-free recipes\n\
     🎯 Weekly challenges\n\
     📝 Notes journal\n\
     💪 Motivational messages\n\n\
     Just write \"want sugar\" for healthy alternatives!"
}

pub(super) fn stats_text(stats: &StreakStats) -> String {
    format!(
        "📊 <b>Your statistics:</b>\n\n\
         🎯 Current streak: <b>{}</b> days\n\
         🏆 Longest streak: <b>{}</b> days\n\
         ✅ Successful days: <b>{}</b>\n\
         ❌ Slip-ups: <b>{}</b>\n\
         📈 Success rate: <b>{:.1}%</b>\n\
         📅 Total days: <b>{}</b>",
        stats.current_streak,
        stats.longest_streak,
        stats.success_days,
        stats.total_slip_ups,
        stats.success_rate(),
        stats.total_days,
    )
}

/// Normalize "/start@MyBot args" to "start".
pub(super) fn command_name(text: &str) -> String {
    text.trim()
        .trim_start_matches('/')
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .split('@')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

impl Gateway {
    pub(super) async fn handle_command(
        &self,
        incoming: &IncomingMessage,
        user: &User,
    ) -> Result<(), NoSugarError> {
        let command = command_name(&incoming.text);
        info!("command /{command} from {}", user.telegram_id);

        match command.as_str() {
            "start" => {
                self.state.clear(user.telegram_id);
                self.show_main_menu(incoming, user).await;
            }
            "note" => self.ask_for_note(incoming, user).await,
            "recipe" => self.ask_for_recipe(incoming, user).await,
            "stats" => self.show_stats(incoming, user).await?,
            "help" => {
                self.reply(incoming, help_text(), keyboards::help()).await;
            }
            _ => {
                self.reply(
                    incoming,
                    "🤔 Unknown command. Use /start to open the menu.",
                    Vec::new(),
                )
                .await;
            }
        }
        Ok(())
    }

    pub(super) async fn handle_callback(
        &self,
        incoming: &IncomingMessage,
        user: &User,
        data: &str,
    ) -> Result<(), NoSugarError> {
        match data {
            MENU_BACK => {
                self.state.clear(user.telegram_id);
                self.show_main_menu(incoming, user).await;
            }
            MENU_CHECKIN => self.show_checkin(incoming, user).await?,
            MENU_STATS => self.show_stats(incoming, user).await?,
            MENU_RECIPES => {
                self.reply(
                    incoming,
                    "🍳 <b>Sugar-free recipes</b>\n\n\
                     Send me the ingredients you have and I'll come up with a healthy dish.",
                    keyboards::recipes(),
                )
                .await;
            }
            MENU_NOTES => {
                self.reply(
                    incoming,
                    "📝 <b>Notes</b>\n\n\
                     Write down your thoughts, cravings and wins. It helps you spot patterns.",
                    keyboards::notes(),
                )
                .await;
            }
            MENU_CHALLENGE => self.show_challenge(incoming, user).await?,
            MENU_MOTIVATION => self.show_motivation(incoming, user).await,
            MENU_SWEET_CRAVING => self.show_sweet_craving(incoming, user).await,
            MENU_SLIP_ANALYSIS => {
                self.reply(
                    incoming,
                    "📝 <b>Slip analysis</b>\n\n\
                     Understanding what led to a slip helps you avoid the next one. Think about:\n\
                     • What were you feeling?\n\
                     • Where were you and who was around?\n\
                     • What could you do differently next time?",
                    keyboards::slip_analysis(),
                )
                .await;
            }
            MENU_HELP => {
                self.reply(incoming, help_text(), keyboards::help()).await;
            }
            CHECKIN_SUCCESS => self.handle_checkin(incoming, user, true).await?,
            CHECKIN_FAIL => self.handle_checkin(incoming, user, false).await?,
            CHALLENGE_COMPLETE => self.complete_challenge(incoming, user).await?,
            NOTE_CREATE => self.ask_for_note(incoming, user).await,
            NOTE_LIST => self.list_notes(incoming, user).await?,
            RECIPE_CREATE => self.ask_for_recipe(incoming, user).await,
            RECIPE_LIST => self.list_recipes(incoming, user).await?,
            SLIP_ANALYSIS => {
                self.state
                    .set(user.telegram_id, PendingMode::WaitingForSlipAnalysis);
                self.reply(
                    incoming,
                    "📝 Describe what happened: what triggered the slip and how you felt. \
                     I'll save it to your notes.",
                    keyboards::back(),
                )
                .await;
            }
            other => {
                warn!("unknown callback '{other}' from {}", user.telegram_id);
                self.reply(
                    incoming,
                    "This button is no longer active. Here's the main menu:",
                    keyboards::main_menu(),
                )
                .await;
            }
        }
        Ok(())
    }

    pub(super) async fn show_main_menu(&self, incoming: &IncomingMessage, user: &User) {
        let text = welcome_text(user, &incoming.sender.display_name());
        self.reply(incoming, text, keyboards::main_menu()).await;
    }

    async fn ask_for_note(&self, incoming: &IncomingMessage, user: &User) {
        self.state.set(user.telegram_id, PendingMode::WaitingForNote);
        self.reply(
            incoming,
            "✏️ Write your note and send it as a message.",
            keyboards::back(),
        )
        .await;
    }

    async fn ask_for_recipe(&self, incoming: &IncomingMessage, user: &User) {
        self.state.set(user.telegram_id, PendingMode::WaitingForRecipe);
        self.reply(
            incoming,
            "🥗 Send me the ingredients you have, separated by commas.\n\n\
             For example: eggs, spinach, cheese",
            keyboards::back(),
        )
        .await;
    }

    async fn show_checkin(
        &self,
        incoming: &IncomingMessage,
        user: &User,
    ) -> Result<(), NoSugarError> {
        let today = self.schedule.today();
        if let Some(existing) = self.storage.get_checkin_for_date(user.id, today).await? {
            let answer = if existing.success {
                "✅ stayed sugar-free"
            } else {
                "❌ slipped"
            };
            self.reply(
                incoming,
                format!(
                    "You've already checked in today ({answer}).\n\n\
                     🔥 Current streak: <b>{}</b> days",
                    user.current_streak
                ),
                keyboards::already_checked_in(),
            )
            .await;
        } else {
            self.reply(
                incoming,
                "✅ <b>Daily check-in</b>\n\nDid you stay sugar-free today?",
                keyboards::checkin_question(),
            )
            .await;
        }
        Ok(())
    }

    pub(super) async fn show_stats(
        &self,
        incoming: &IncomingMessage,
        user: &User,
    ) -> Result<(), NoSugarError> {
        let history = self.storage.list_checkins(user.id).await?;
        let stats = streak::compute(&history);
        self.reply(incoming, stats_text(&stats), keyboards::stats())
            .await;
        Ok(())
    }

    async fn show_challenge(
        &self,
        incoming: &IncomingMessage,
        user: &User,
    ) -> Result<(), NoSugarError> {
        match self.storage.latest_challenge(user.id).await? {
            Some(challenge) => {
                let status = if challenge.completed {
                    "✅ Completed!"
                } else {
                    "⏳ In progress"
                };
                self.reply(
                    incoming,
                    format!(
                        "🎯 <b>Your challenge</b> (from {})\n\n{}\n\n{status}",
                        challenge.challenge_date.format("%d.%m.%Y"),
                        escape_html(&challenge.challenge_text),
                    ),
                    keyboards::challenge(!challenge.completed),
                )
                .await;
            }
            None => {
                self.reply(
                    incoming,
                    "🎯 No challenge yet. A new one arrives every week!",
                    keyboards::back(),
                )
                .await;
            }
        }
        Ok(())
    }

    async fn complete_challenge(
        &self,
        incoming: &IncomingMessage,
        user: &User,
    ) -> Result<(), NoSugarError> {
        match self.storage.latest_challenge(user.id).await? {
            Some(challenge) if !challenge.completed => {
                self.storage.complete_challenge(challenge.id).await?;
                info!("user {} completed challenge {}", user.telegram_id, challenge.id);
                self.reply(
                    incoming,
                    "🎉 <b>Congratulations! Challenge complete!</b>\n\n\
                     Well done! Every finished challenge brings you closer to your goal.",
                    keyboards::back(),
                )
                .await;
            }
            _ => {
                self.reply(
                    incoming,
                    "The challenge is already done or was not found.",
                    keyboards::back(),
                )
                .await;
            }
        }
        Ok(())
    }

    pub(super) async fn show_motivation(&self, incoming: &IncomingMessage, user: &User) {
        let text = self.generator.motivation(user.current_streak).await;
        self.reply(
            incoming,
            format!(
                "💪 <b>Motivation of the day:</b>\n\n{}\n\n\
                 🔥 Current streak: <b>{}</b> days\n\
                 🏆 Longest streak: <b>{}</b> days",
                escape_html(&text),
                user.current_streak,
                user.longest_streak,
            ),
            keyboards::motivation(),
        )
        .await;
    }

    pub(super) async fn show_sweet_craving(&self, incoming: &IncomingMessage, user: &User) {
        self.reply(
            incoming,
            format!(
                "🍭 <b>I get it, you want something sweet!</b>\n\n\
                 💪 {}\n\n\
                 🍎 <b>Try one of these instead:</b>\n{}\n\n\
                 🔥 Your streak: <b>{}</b> days\n\
                 💪 You've got this! Hold on!",
                crate::motivation::success_message(user.current_streak),
                crate::motivation::alternatives_list(),
                user.current_streak,
            ),
            keyboards::sweet_craving(),
        )
        .await;
    }

    async fn list_notes(&self, incoming: &IncomingMessage, user: &User) -> Result<(), NoSugarError> {
        let notes = self.storage.list_notes(user.id, LIST_LIMIT).await?;
        let text = if notes.is_empty() {
            "📝 You don't have any notes yet.".to_string()
        } else {
            let lines: Vec<String> = notes
                .iter()
                .enumerate()
                .map(|(i, n)| {
                    format!(
                        "{}. <i>{}</i>\n{}",
                        i + 1,
                        n.created_at.format("%d.%m.%Y"),
                        escape_html(&truncate_chars(&n.content, 100)),
                    )
                })
                .collect();
            format!("📋 <b>Your latest notes:</b>\n\n{}", lines.join("\n\n"))
        };
        self.reply(incoming, text, keyboards::notes()).await;
        Ok(())
    }

    async fn list_recipes(
        &self,
        incoming: &IncomingMessage,
        user: &User,
    ) -> Result<(), NoSugarError> {
        let recipes = self.storage.list_recipes(user.id, LIST_LIMIT).await?;
        let text = if recipes.is_empty() {
            "🍳 You don't have any saved recipes yet.".to_string()
        } else {
            let lines: Vec<String> = recipes
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    format!(
                        "{}. {} <i>({})</i>",
                        i + 1,
                        escape_html(&truncate_chars(&r.ingredients, 50)),
                        r.created_at.format("%d.%m.%Y"),
                    )
                })
                .collect();
            format!("📋 <b>Your recipes:</b>\n\n{}", lines.join("\n"))
        };
        self.reply(incoming, text, keyboards::recipes()).await;
        Ok(())
    }
}
