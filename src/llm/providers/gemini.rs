//! Google Gemini `generateContent` adapter.
//!
//! # Wire format
//!
//! `POST {base_url}/v1beta/models/{model}:generateContent` with an
//! `x-goog-api-key` header. System messages become `systemInstruction`,
//! assistant turns use role `model`. The reply text is the concatenation
//! of `candidates[0].content.parts[*].text`; usage is read from
//! `usageMetadata`.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::llm::error::LlmError;
use crate::llm::message::{Role, system_text};
use crate::llm::provider::{ProviderAdapter, post_json};
use crate::llm::types::{LlmRequest, LlmResponse, ProviderConfig, TokenUsage};

/// Adapter for the Gemini API.
pub struct GeminiAdapter {
    config: ProviderConfig,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiAdapter")
            .field("name", &self.config.name)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl GeminiAdapter {
    /// Create an adapter for `config` authenticated with `api_key`.
    pub fn new(config: ProviderConfig, api_key: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            config,
            api_key: api_key.into(),
            client,
        }
    }
}

/// Build the JSON request body for `generateContent`.
pub fn build_generate_request(request: &LlmRequest) -> Value {
    let contents: Vec<Value> = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| {
            let role = if m.role == Role::Assistant { "model" } else { "user" };
            json!({ "role": role, "parts": [{ "text": m.content }] })
        })
        .collect();

    let mut body = json!({
        "contents": contents,
        "generationConfig": {
            "maxOutputTokens": request.max_tokens,
            "temperature": request.temperature,
        },
    });
    if let Some(system) = system_text(&request.messages) {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }
    body
}

/// Normalise a `generateContent` response body.
pub fn parse_generate_response(provider: &str, model: &str, body: &Value) -> Result<LlmResponse, LlmError> {
    let candidate = body
        .get("candidates")
        .and_then(|c| c.get(0))
        .ok_or_else(|| LlmError::Parse(format!("{provider} response has no candidates")))?;
    let content: String = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    let count = |key: &str| {
        body.pointer(&format!("/usageMetadata/{key}"))
            .and_then(Value::as_u64)
    };
    let mut usage = TokenUsage::new(
        count("promptTokenCount").unwrap_or(0),
        count("candidatesTokenCount").unwrap_or(0),
    );
    if let Some(total) = count("totalTokenCount") {
        usage.total_tokens = total;
    }

    Ok(LlmResponse {
        content,
        usage,
        finish_reason: candidate
            .get("finishReason")
            .and_then(Value::as_str)
            .map(String::from),
        model: body
            .get("modelVersion")
            .and_then(Value::as_str)
            .unwrap_or(model)
            .to_string(),
        provider: provider.to_owned(),
    })
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let model = self.config.model_for(request);
        let url = format!(
            "{}/v1beta/models/{model}:generateContent",
            self.config.base_url.trim_end_matches('/')
        );
        let body = build_generate_request(request);

        let http = self.client.post(&url).header("x-goog-api-key", &self.api_key);
        let reply = post_json(self.name(), http, &body).await?;
        parse_generate_response(self.name(), model, &reply)
    }
}
