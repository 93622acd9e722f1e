//! Chat-completion client used for diagram updates.
//!
//! [`CompletionModel`] is the seam: production code uses [`OpenAiChat`]
//! against any OpenAI-compatible `/chat/completions` endpoint, tests plug in
//! a canned model.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{FeaturesConfig, Secret};
use crate::error::{KbError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait CompletionModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Return the text of the first completion choice.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// OpenAI-compatible chat completions over HTTP.
pub struct OpenAiChat {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<Secret>,
}

impl OpenAiChat {
    /// Model names may carry a routing prefix such as `openai/gpt-4.1-mini`;
    /// the prefix is dropped.
    pub fn new(config: &FeaturesConfig, api_key: Option<Secret>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| KbError::Config(format!("failed to build HTTP client: {e}")))?;

        let model = config
            .llm_model
            .strip_prefix("openai/")
            .unwrap_or(&config.llm_model)
            .to_string();

        Ok(Self {
            client,
            base_url: config.llm_base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[async_trait]
impl CompletionModel for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, "calling completion model");

        let mut request = self.client.post(&url).json(&ChatRequest {
            model: &self.model,
            messages,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|e| KbError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(KbError::Llm(format!("API error {}: {}", status, body_text)));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| KbError::Llm(format!("invalid response: {e}")))?;

        parse_completion(&json)
    }
}

/// Extract `choices[0].message.content`, falling back to `choices[0].text`.
fn parse_completion(json: &Value) -> Result<String> {
    let choice = json
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| KbError::Llm("invalid response: missing choices".to_string()))?;

    let content = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .or_else(|| choice.get("text").and_then(Value::as_str))
        .unwrap_or_default();

    Ok(content.to_string())
}
