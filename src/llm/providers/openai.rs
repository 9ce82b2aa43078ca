//! OpenAI Chat Completions adapter.
//!
//! Also serves OpenAI-compatible hosts (Groq) through a different
//! `base_url`.
//!
//! # Wire format
//!
//! `POST {base_url}/v1/chat/completions` with `Authorization: Bearer <key>`.
//! The reply text is `choices[0].message.content`; usage is read from
//! `usage.{prompt_tokens, completion_tokens, total_tokens}`.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::llm::error::LlmError;
use crate::llm::provider::{ProviderAdapter, post_json};
use crate::llm::types::{LlmRequest, LlmResponse, ProviderConfig, TokenUsage};

/// Adapter for OpenAI-style chat completion endpoints.
pub struct OpenAiAdapter {
    config: ProviderConfig,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("name", &self.config.name)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl OpenAiAdapter {
    /// Create an adapter for `config` authenticated with `api_key`.
    pub fn new(config: ProviderConfig, api_key: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            config,
            api_key: api_key.into(),
            client,
        }
    }
}

/// Build the JSON request body for the Chat Completions API.
pub fn build_completions_request(model: &str, request: &LlmRequest) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|m| json!({ "role": m.role.to_string(), "content": m.content }))
        .collect();
    json!({
        "model": model,
        "messages": messages,
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
    })
}

/// Normalise a Chat Completions response body.
pub fn parse_completions_response(provider: &str, model: &str, body: &Value) -> Result<LlmResponse, LlmError> {
    let choice = body
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| LlmError::Parse(format!("{provider} response has no choices")))?;
    let content = choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let count = |key: &str| body.pointer(&format!("/usage/{key}")).and_then(Value::as_u64);
    let mut usage = TokenUsage::new(
        count("prompt_tokens").unwrap_or(0),
        count("completion_tokens").unwrap_or(0),
    );
    if let Some(total) = count("total_tokens") {
        usage.total_tokens = total;
    }

    Ok(LlmResponse {
        content,
        usage,
        finish_reason: choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .map(String::from),
        model: body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(model)
            .to_string(),
        provider: provider.to_owned(),
    })
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let model = self.config.model_for(request);
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = build_completions_request(model, request);

        let http = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key));
        let reply = post_json(self.name(), http, &body).await?;
        parse_completions_response(self.name(), model, &reply)
    }
}
