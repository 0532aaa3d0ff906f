//! Long-polling update loop and Channel trait implementation.

use super::types::{TgResponse, TgUpdate, TgUser};
use super::TelegramChannel;
use async_trait::async_trait;
use nosugar_core::{
    error::NoSugarError,
    message::{IncomingMessage, OutgoingMessage, SenderProfile},
    traits::Channel,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, NoSugarError> {
        self.register_commands().await;

        let (tx, rx) = mpsc::channel(64);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let allowed_users = self.config.allowed_users.clone();
        let last_update_id = self.last_update_id.clone();

        info!("Telegram channel starting long polling...");

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let offset = last_update_id.lock().await.map(|id| id + 1);

                let mut url = format!("{base_url}/getUpdates?timeout=30");
                if let Some(off) = offset {
                    url.push_str(&format!("&offset={off}"));
                }

                let resp = match client
                    .get(&url)
                    .timeout(Duration::from_secs(35))
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        error!("telegram poll error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let body: TgResponse<Vec<TgUpdate>> = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        error!("telegram parse error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                if !body.ok {
                    error!(
                        "telegram API error (retry in {backoff_secs}s): {}",
                        body.description.unwrap_or_default()
                    );
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }

                backoff_secs = 1;

                let updates = body.result.unwrap_or_default();

                if let Some(last_update) = updates.last() {
                    *last_update_id.lock().await = Some(last_update.update_id);
                }

                for update in updates {
                    let Some(incoming) = to_incoming(update, &allowed_users) else {
                        continue;
                    };
                    if tx.send(incoming).await.is_err() {
                        info!("telegram channel receiver dropped, stopping poll");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), NoSugarError> {
        let chat_id = parse_chat_id(message.reply_target.as_deref())?;
        self.send_text(chat_id, &message.text, &message.buttons).await
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), NoSugarError> {
        self.answer_callback_query(callback_id, text).await
    }

    async fn stop(&self) -> Result<(), NoSugarError> {
        info!("Telegram channel stopped");
        Ok(())
    }
}

pub(crate) fn parse_chat_id(target: Option<&str>) -> Result<i64, NoSugarError> {
    let target =
        target.ok_or_else(|| NoSugarError::Channel("no reply_target on outgoing message".into()))?;
    target
        .parse()
        .map_err(|e| NoSugarError::Channel(format!("invalid telegram chat_id '{target}': {e}")))
}

fn profile(user: &TgUser) -> SenderProfile {
    SenderProfile {
        platform_id: user.id,
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()).filter(|n| !n.is_empty()),
        last_name: user.last_name.clone(),
    }
}

fn is_allowed(allowed_users: &[i64], user_id: i64) -> bool {
    allowed_users.is_empty() || allowed_users.contains(&user_id)
}

/// Convert a raw update into an incoming message.
///
/// Returns `None` for updates the bot ignores: non-text messages,
/// group chats, and users outside the allow-list.
pub(crate) fn to_incoming(update: TgUpdate, allowed_users: &[i64]) -> Option<IncomingMessage> {
    if let Some(query) = update.callback_query {
        if !is_allowed(allowed_users, query.from.id) {
            warn!("ignoring button press from unauthorized user {}", query.from.id);
            return None;
        }
        // Buttons only ever live in private chats, where chat id == user id.
        let chat_id = match query.message {
            Some(ref m) if m.chat.is_group() => {
                debug!("telegram: ignoring group button press in chat {}", m.chat.id);
                return None;
            }
            Some(ref m) => m.chat.id,
            None => query.from.id,
        };
        return Some(IncomingMessage {
            id: Uuid::new_v4(),
            channel: "telegram".to_string(),
            sender: profile(&query.from),
            text: String::new(),
            timestamp: chrono::Utc::now(),
            callback_data: Some(query.data.unwrap_or_default()),
            callback_id: Some(query.id),
            reply_target: Some(chat_id.to_string()),
        });
    }

    let msg = update.message?;
    let text = msg.text?;
    let user = msg.from?;

    if !is_allowed(allowed_users, user.id) {
        warn!("ignoring message from unauthorized user {}", user.id);
        return None;
    }

    if msg.chat.is_group() {
        debug!("telegram: ignoring group message from chat {}", msg.chat.id);
        return None;
    }

    Some(IncomingMessage {
        id: Uuid::new_v4(),
        channel: "telegram".to_string(),
        sender: profile(&user),
        text,
        timestamp: chrono::Utc::now(),
        callback_data: None,
        callback_id: None,
        reply_target: Some(msg.chat.id.to_string()),
    })
}
