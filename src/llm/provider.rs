//! Provider adapter trait for LLM backends.
//!
//! Defines the [`ProviderAdapter`] trait that every vendor implementation
//! satisfies, and the [`ProviderFactory`] seam the gateway uses to build
//! adapters from a [`ProviderConfig`] plus a credential.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::LlmError;
use super::message::Message;
use super::providers::{AnthropicAdapter, GeminiAdapter, OpenAiAdapter};
use super::types::{LlmRequest, LlmResponse, ProviderConfig, ProviderKind};

/// Trait for LLM provider adapters.
///
/// Adapters normalise a vendor API into the shared
/// [`LlmRequest`]/[`LlmResponse`] contract.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Returns the provider name (e.g. `"openai"`, `"anthropic"`).
    fn name(&self) -> &str;

    /// Send one completion request.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Minimal live request proving the credential works. Never errors.
    async fn validate(&self) -> bool {
        let ping = LlmRequest::new(vec![Message::user("ping")]).with_max_tokens(1);
        match self.complete(&ping).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(provider = self.name(), error = %e, "provider validation failed");
                false
            }
        }
    }
}

/// Builds adapters for the gateway.
pub trait ProviderFactory: Send + Sync {
    /// Build an adapter for `config` authenticated with `api_key`.
    fn create(
        &self,
        config: &ProviderConfig,
        api_key: &str,
    ) -> Result<Arc<dyn ProviderAdapter>, LlmError>;
}

/// Factory for the built-in HTTP adapters, sharing one client.
#[derive(Debug, Clone, Default)]
pub struct HttpProviderFactory {
    client: reqwest::Client,
}

impl HttpProviderFactory {
    /// Use `client` for every adapter this factory builds.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn create(
        &self,
        config: &ProviderConfig,
        api_key: &str,
    ) -> Result<Arc<dyn ProviderAdapter>, LlmError> {
        config.validate()?;
        let client = self.client.clone();
        let adapter: Arc<dyn ProviderAdapter> = match config.kind {
            ProviderKind::OpenAi => Arc::new(OpenAiAdapter::new(config.clone(), api_key, client)),
            ProviderKind::Anthropic => {
                Arc::new(AnthropicAdapter::new(config.clone(), api_key, client))
            }
            ProviderKind::Gemini => Arc::new(GeminiAdapter::new(config.clone(), api_key, client)),
        };
        Ok(adapter)
    }
}

/// Map a non-success HTTP status to an [`LlmError`].
pub(crate) fn map_http_error(provider: &str, status: u16, body: &str) -> LlmError {
    let message = extract_error_message(body);
    match status {
        401 | 403 => LlmError::Auth {
            provider: provider.to_owned(),
            message,
        },
        _ => LlmError::Api {
            provider: provider.to_owned(),
            status: Some(status),
            message,
            rate_limited: status == 429,
        },
    }
}

/// Map a transport failure to an [`LlmError`].
pub(crate) fn map_transport_error(provider: &str, err: &reqwest::Error) -> LlmError {
    LlmError::Request(format!("{provider} request failed: {err}"))
}

/// Pull `error.message` (or a string `error`) out of a JSON error body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            let error = v.get("error")?;
            error
                .get("message")
                .and_then(|m| m.as_str())
                .or_else(|| error.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// POST `body` as JSON and return the decoded JSON response.
pub(crate) async fn post_json(
    provider: &str,
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<serde_json::Value, LlmError> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| map_transport_error(provider, &e))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| map_transport_error(provider, &e))?;
    if !status.is_success() {
        return Err(map_http_error(provider, status.as_u16(), &text));
    }
    serde_json::from_str(&text)
        .map_err(|e| LlmError::Parse(format!("{provider} returned invalid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_errors_are_classified() {
        let err = map_http_error("openai", 401, r#"{"error":{"message":"bad key"}}"#);
        assert_eq!(
            err,
            LlmError::Auth {
                provider: "openai".into(),
                message: "bad key".into()
            }
        );

        let err = map_http_error("anthropic", 429, r#"{"error":{"message":"slow down"}}"#);
        assert!(err.is_rate_limited());
        assert!(err.is_retryable());

        let err = map_http_error("gemini", 503, "upstream unavailable");
        assert!(matches!(err, LlmError::Api { status: Some(503), ref message, .. } if message == "upstream unavailable"));
    }

    #[test]
    fn string_error_bodies_are_read() {
        assert_eq!(extract_error_message(r#"{"error":"nope"}"#), "nope");
    }

    #[test]
    fn factory_builds_each_kind() {
        let factory = HttpProviderFactory::default();
        for config in crate::llm::types::default_providers() {
            let adapter = factory.create(&config, "sk-test").expect("adapter");
            assert_eq!(adapter.name(), config.name);
        }
    }

    #[test]
    fn factory_rejects_invalid_config() {
        let factory = HttpProviderFactory::default();
        let mut config = crate::llm::types::default_providers().remove(0);
        config.models.clear();
        assert!(factory.create(&config, "sk-test").is_err());
    }
}
