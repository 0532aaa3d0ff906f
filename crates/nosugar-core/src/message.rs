use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An incoming message or button press from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name (e.g. "telegram").
    pub channel: String,
    /// Who sent it.
    pub sender: SenderProfile,
    /// Message text content. Empty for button presses.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Inline button payload, set when the user pressed a button.
    #[serde(default)]
    pub callback_data: Option<String>,
    /// Platform id of the button press, used to acknowledge it.
    #[serde(default)]
    pub callback_id: Option<String>,
    /// Platform-specific target for routing the response (e.g. Telegram chat_id).
    #[serde(default)]
    pub reply_target: Option<String>,
}

impl IncomingMessage {
    /// Whether this message is an inline button press.
    pub fn is_callback(&self) -> bool {
        self.callback_data.is_some()
    }
}

/// Platform user identity attached to every incoming message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderProfile {
    /// Platform-specific numeric user ID.
    pub platform_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl SenderProfile {
    /// Name to greet the user with.
    pub fn display_name(&self) -> String {
        if let Some(ref first) = self.first_name {
            return first.clone();
        }
        if let Some(ref un) = self.username {
            return format!("@{un}");
        }
        "friend".to_string()
    }
}

/// An outgoing message to send through a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    /// Inline keyboard rows shown under the message.
    #[serde(default)]
    pub buttons: Vec<Vec<Button>>,
    /// Platform-specific target for routing (e.g. Telegram chat_id).
    #[serde(default)]
    pub reply_target: Option<String>,
}

impl OutgoingMessage {
    /// Plain text message to a target.
    pub fn text(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
            reply_target: Some(target.into()),
        }
    }

    /// Attach an inline keyboard.
    pub fn with_buttons(mut self, buttons: Vec<Vec<Button>>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// A single inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    /// Payload delivered back as `callback_data` when pressed.
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}
