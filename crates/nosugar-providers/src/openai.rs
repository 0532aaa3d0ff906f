//! OpenAI-compatible chat-completions provider.
//!
//! Works with DeepSeek (the default), OpenAI, and any compatible endpoint.

use async_trait::async_trait;
use nosugar_core::{
    config::OpenAiConfig,
    context::{ApiMessage, Context},
    error::NoSugarError,
    traits::Provider,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// OpenAI-compatible provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    /// Create from config values.
    pub fn from_config(config: &OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl From<ApiMessage> for ChatMessage {
    fn from(m: ApiMessage) -> Self {
        Self {
            role: m.role,
            content: m.content,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Option<Vec<ChatChoice>>,
    pub usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<ChatMessage>,
}

#[derive(Deserialize)]
pub(crate) struct ChatUsage {
    pub total_tokens: Option<u64>,
}

/// Build the request body for a context.
pub(crate) fn build_request(context: &Context, default_model: &str) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: context
            .model
            .clone()
            .unwrap_or_else(|| default_model.to_string()),
        messages: context
            .to_api_messages()
            .into_iter()
            .map(ChatMessage::from)
            .collect(),
        stream: false,
        temperature: context.temperature,
        max_tokens: context.max_tokens,
    }
}

/// Pull the first non-empty completion out of a response.
pub(crate) fn extract_text(resp: &ChatCompletionResponse) -> Option<String> {
    resp.choices
        .as_ref()
        .and_then(|c| c.first())
        .and_then(|c| c.message.as_ref())
        .map(|m| m.content.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    async fn complete(&self, context: &Context) -> Result<String, NoSugarError> {
        let start = Instant::now();
        let body = build_request(context, &self.model);

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("openai: POST {url} model={}", body.model);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| NoSugarError::Provider(format!("openai request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(NoSugarError::Provider(format!(
                "openai returned {status}: {text}"
            )));
        }

        let parsed: ChatCompletionResponse = resp.json().await.map_err(|e| {
            NoSugarError::Provider(format!("openai: failed to parse response: {e}"))
        })?;

        let text = extract_text(&parsed)
            .ok_or_else(|| NoSugarError::Provider("openai: empty completion".into()))?;

        debug!(
            "openai: completed in {}ms, tokens={:?}",
            start.elapsed().as_millis(),
            parsed.usage.as_ref().and_then(|u| u.total_tokens)
        );
        Ok(text)
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("openai: no API key configured");
            return false;
        }
        let url = format!("{}/models", self.base_url.trim_end_matches('/'));
        match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("openai not available: {e}");
                false
            }
        }
    }
}
