//! Request, response and provider-registry types.

use serde::{Deserialize, Serialize};

use super::error::LlmError;
use super::message::Message;

/// Token counts for a single request/response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u64,
    /// Tokens in the completion.
    pub completion_tokens: u64,
    /// Total as reported by the provider (or prompt + completion).
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Usage with `total_tokens` derived from the parts.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// A provider-neutral completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Conversation, system messages first.
    pub messages: Vec<Message>,
    /// Completion token cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Model override; the provider default is used when `None`.
    pub model: Option<String>,
}

impl LlmRequest {
    /// Request with default sampling (500 tokens, temperature 0.1).
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            max_tokens: 500,
            temperature: 0.1,
            model: None,
        }
    }

    /// Set the completion token cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// A provider-neutral completion response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated text.
    pub content: String,
    /// Token usage.
    pub usage: TokenUsage,
    /// Why generation stopped, as reported by the provider.
    pub finish_reason: Option<String>,
    /// Model that served the request.
    pub model: String,
    /// Provider that served the request.
    pub provider: String,
}

/// Wire protocol spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions (also OpenAI-compatible hosts such as Groq).
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
    /// Google Gemini generateContent.
    Gemini,
}

/// Per-provider request budget over a 60 second window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Requests allowed per window.
    pub requests_per_minute: u32,
    /// Tokens allowed per window.
    pub tokens_per_minute: u64,
}

/// Static description of one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Registry key, also the credential key.
    pub name: String,
    /// Wire protocol.
    pub kind: ProviderKind,
    /// API origin, without a trailing version segment.
    pub base_url: String,
    /// Models this provider serves. Never empty.
    pub models: Vec<String>,
    /// Model used when a request names none; falls back to `models[0]`.
    #[serde(default)]
    pub default_model: Option<String>,
    /// Request budget.
    pub rate_limit: RateLimit,
}

impl ProviderConfig {
    /// Model to use for `request`.
    pub fn model_for<'a>(&'a self, request: &'a LlmRequest) -> &'a str {
        request
            .model
            .as_deref()
            .or(self.default_model.as_deref())
            .or(self.models.first().map(String::as_str))
            .unwrap_or_default()
    }

    /// Validates this provider description.
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.name.trim().is_empty() {
            return Err(LlmError::Config("provider name must not be empty".into()));
        }
        if self.models.is_empty() {
            return Err(LlmError::Config(format!(
                "provider '{}' must list at least one model",
                self.name
            )));
        }
        let parsed = url::Url::parse(&self.base_url).map_err(|e| {
            LlmError::Config(format!("provider '{}' base_url is invalid: {e}", self.name))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LlmError::Config(format!(
                "provider '{}' base_url must be http(s)",
                self.name
            )));
        }
        if self.rate_limit.requests_per_minute == 0 || self.rate_limit.tokens_per_minute == 0 {
            return Err(LlmError::Config(format!(
                "provider '{}' rate limits must be greater than 0",
                self.name
            )));
        }
        Ok(())
    }
}

/// Built-in provider registry.
pub fn default_providers() -> Vec<ProviderConfig> {
    fn provider(
        name: &str,
        kind: ProviderKind,
        base_url: &str,
        models: &[&str],
        rpm: u32,
        tpm: u64,
    ) -> ProviderConfig {
        ProviderConfig {
            name: name.to_owned(),
            kind,
            base_url: base_url.to_owned(),
            models: models.iter().map(|m| (*m).to_owned()).collect(),
            default_model: None,
            rate_limit: RateLimit {
                requests_per_minute: rpm,
                tokens_per_minute: tpm,
            },
        }
    }

    vec![
        provider(
            "openai",
            ProviderKind::OpenAi,
            "https://api.openai.com",
            &["gpt-4o-mini", "gpt-4o"],
            500,
            200_000,
        ),
        provider(
            "anthropic",
            ProviderKind::Anthropic,
            "https://api.anthropic.com",
            &["claude-3-5-haiku-latest", "claude-3-5-sonnet-latest"],
            50,
            40_000,
        ),
        provider(
            "gemini",
            ProviderKind::Gemini,
            "https://generativelanguage.googleapis.com",
            &["gemini-1.5-flash", "gemini-1.5-pro"],
            15,
            1_000_000,
        ),
        provider(
            "groq",
            ProviderKind::OpenAi,
            "https://api.groq.com/openai",
            &["llama-3.1-8b-instant", "llama-3.3-70b-versatile"],
            30,
            6_000,
        ),
    ]
}
