//! Message sending, callback acknowledgement, and command registration.

use super::types::{TgInlineButton, TgInlineKeyboard};
use super::{TelegramChannel, MAX_MESSAGE_LEN};
use crate::utils::split_message;
use nosugar_core::{error::NoSugarError, message::Button};
use reqwest::StatusCode;
use tracing::{info, warn};

/// Commands shown in the Telegram autocomplete menu.
pub(crate) const BOT_COMMANDS: &[(&str, &str)] = &[
    ("start", "Main menu"),
    ("note", "Write a note"),
    ("recipe", "Get a sugar-free recipe"),
    ("stats", "Your streak and statistics"),
    ("help", "How to use the bot"),
];

/// Convert button rows into Telegram's inline keyboard markup.
pub(crate) fn inline_keyboard(buttons: &[Vec<Button>]) -> Option<TgInlineKeyboard> {
    if buttons.iter().all(|row| row.is_empty()) {
        return None;
    }
    Some(TgInlineKeyboard {
        inline_keyboard: buttons
            .iter()
            .filter(|row| !row.is_empty())
            .map(|row| {
                row.iter()
                    .map(|b| TgInlineButton {
                        text: b.label.clone(),
                        callback_data: b.data.clone(),
                    })
                    .collect()
            })
            .collect(),
    })
}

/// Build a `sendMessage` body. `html` toggles HTML parse mode.
pub(crate) fn message_body(
    chat_id: i64,
    text: &str,
    keyboard: Option<&TgInlineKeyboard>,
    html: bool,
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "chat_id": chat_id,
        "text": text,
    });
    if html {
        body["parse_mode"] = "HTML".into();
    }
    if let Some(kb) = keyboard {
        body["reply_markup"] = serde_json::to_value(kb).unwrap_or_default();
    }
    body
}

/// Classify a failed `sendMessage`. A 403 means the user blocked the bot
/// or deleted their account, so the chat will not accept messages again.
pub(crate) fn send_error(chat_id: i64, status: StatusCode, body: &str) -> NoSugarError {
    if status == StatusCode::FORBIDDEN {
        NoSugarError::Unreachable(format!("telegram chat {chat_id}: {body}"))
    } else {
        NoSugarError::Channel(format!("telegram send failed ({status}): {body}"))
    }
}

impl TelegramChannel {
    /// Send a text message, split at the size limit. The keyboard rides on
    /// the last chunk so it sits under the end of the text.
    pub(crate) async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[Vec<Button>],
    ) -> Result<(), NoSugarError> {
        let keyboard = inline_keyboard(buttons);
        let chunks = split_message(text, MAX_MESSAGE_LEN);
        let last = chunks.len().saturating_sub(1);
        let url = format!("{}/sendMessage", self.base_url);

        for (i, chunk) in chunks.into_iter().enumerate() {
            let kb = if i == last { keyboard.as_ref() } else { None };
            let body = message_body(chat_id, chunk, kb, true);

            let resp = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| NoSugarError::Channel(format!("telegram send failed: {e}")))?;

            let status = resp.status();
            if status.is_success() {
                continue;
            }

            let error_text = resp.text().await.unwrap_or_default();
            if !error_text.contains("can't parse entities") {
                return Err(send_error(chat_id, status, &error_text));
            }

            warn!("HTML parse failed, retrying as plain text: {error_text}");
            let plain_resp = self
                .client
                .post(&url)
                .json(&message_body(chat_id, chunk, kb, false))
                .send()
                .await
                .map_err(|e| NoSugarError::Channel(format!("telegram send (plain) failed: {e}")))?;
            if !plain_resp.status().is_success() {
                let plain_err = plain_resp.text().await.unwrap_or_default();
                return Err(NoSugarError::Channel(format!(
                    "telegram send (plain fallback) failed: {plain_err}"
                )));
            }
        }

        Ok(())
    }

    /// Stop the loading spinner on a pressed button.
    pub(crate) async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), NoSugarError> {
        let mut body = serde_json::json!({ "callback_query_id": callback_id });
        if let Some(t) = text {
            body["text"] = t.into();
        }

        let resp = self
            .client
            .post(format!("{}/answerCallbackQuery", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| NoSugarError::Channel(format!("telegram answerCallbackQuery failed: {e}")))?;

        if !resp.status().is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(NoSugarError::Channel(format!(
                "telegram answerCallbackQuery failed: {error_text}"
            )));
        }
        Ok(())
    }

    /// Register bot commands with Telegram so users see an autocomplete menu.
    /// Best-effort: logs failures but does not propagate errors.
    pub(crate) async fn register_commands(&self) {
        let commands: Vec<_> = BOT_COMMANDS
            .iter()
            .map(|(command, description)| {
                serde_json::json!({ "command": command, "description": description })
            })
            .collect();
        let body = serde_json::json!({ "commands": commands });

        let url = format!("{}/setMyCommands", self.base_url);
        match self.client.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("registered Telegram bot commands");
            }
            Ok(resp) => {
                let body = resp.text().await.unwrap_or_default();
                warn!("failed to register Telegram bot commands: {body}");
            }
            Err(e) => {
                warn!("failed to register Telegram bot commands: {e}");
            }
        }
    }
}
