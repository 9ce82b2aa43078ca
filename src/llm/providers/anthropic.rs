//! Anthropic Messages API adapter.
//!
//! # Wire format
//!
//! `POST {base_url}/v1/messages` with `x-api-key` and `anthropic-version`
//! headers. System messages are lifted into the top-level `system` field.
//! The reply text is the concatenation of `content[*].text` blocks; usage
//! is read from `usage.{input_tokens, output_tokens}`.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::llm::error::LlmError;
use crate::llm::message::{Role, system_text};
use crate::llm::provider::{ProviderAdapter, post_json};
use crate::llm::types::{LlmRequest, LlmResponse, ProviderConfig, TokenUsage};

/// API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Adapter for the Anthropic Messages API.
pub struct AnthropicAdapter {
    config: ProviderConfig,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicAdapter")
            .field("name", &self.config.name)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl AnthropicAdapter {
    /// Create an adapter for `config` authenticated with `api_key`.
    pub fn new(config: ProviderConfig, api_key: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            config,
            api_key: api_key.into(),
            client,
        }
    }
}

/// Build the JSON request body for the Messages API.
pub fn build_messages_request(model: &str, request: &LlmRequest) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| json!({ "role": m.role.to_string(), "content": m.content }))
        .collect();

    let mut body = json!({
        "model": model,
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
        "messages": messages,
    });
    if let Some(system) = system_text(&request.messages) {
        body["system"] = Value::String(system);
    }
    body
}

/// Normalise a Messages API response body.
pub fn parse_messages_response(provider: &str, model: &str, body: &Value) -> Result<LlmResponse, LlmError> {
    let blocks = body
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::Parse(format!("{provider} response has no content")))?;
    let content: String = blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();

    let count = |key: &str| {
        body.pointer(&format!("/usage/{key}"))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };

    Ok(LlmResponse {
        content,
        usage: TokenUsage::new(count("input_tokens"), count("output_tokens")),
        finish_reason: body
            .get("stop_reason")
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
impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let model = self.config.model_for(request);
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let body = build_messages_request(model, request);

        let http = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let reply = post_json(self.name(), http, &body).await?;
        parse_messages_response(self.name(), model, &reply)
    }
}
