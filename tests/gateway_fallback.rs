//! Gateway routing against live HTTP adapters: fallback, pinning and
//! local rate limiting.

mod common;

use std::sync::Arc;

use scout::llm::{
    HttpProviderFactory, LlmRequest, Message, ProviderGateway, ProviderKind,
};
use scout::store::MemoryStore;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{gateway_config, provider};

fn ask() -> LlmRequest {
    LlmRequest::new(vec![Message::user("rate this page")]).with_max_tokens(16)
}

fn openai_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
    }))
}

fn anthropic_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 5, "output_tokens": 2}
    }))
}

fn credentials() -> Arc<MemoryStore> {
    Arc::new(
        MemoryStore::new()
            .with_credential("openai", "sk-openai-key")
            .with_credential("anthropic", "sk-ant-key"),
    )
}

async fn two_provider_gateway(primary: &MockServer, secondary: &MockServer) -> ProviderGateway {
    let config = gateway_config(vec![
        provider("openai", ProviderKind::OpenAi, &primary.uri(), "gpt-4o-mini"),
        provider(
            "anthropic",
            ProviderKind::Anthropic,
            &secondary.uri(),
            "claude-3-5-haiku-latest",
        ),
    ]);
    ProviderGateway::new(&config, credentials(), Arc::new(HttpProviderFactory::default()))
        .expect("gateway")
}

#[tokio::test]
async fn server_error_falls_back_exactly_once() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(anthropic_reply("from the fallback"))
        .expect(1)
        .mount(&secondary)
        .await;

    let gateway = two_provider_gateway(&primary, &secondary).await;
    let response = gateway.request(&ask(), None).await.expect("fallback succeeds");

    assert_eq!(response.provider, "anthropic");
    assert_eq!(response.content, "from the fallback");
    assert_eq!(gateway.fallback_count(), 1);
}

#[tokio::test]
async fn failing_fallback_is_not_retried_again() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&secondary)
        .await;

    let gateway = two_provider_gateway(&primary, &secondary).await;
    let err = gateway.request(&ask(), None).await.unwrap_err();

    assert_eq!(err.code(), "API_ERROR");
    assert!(err.to_string().contains("anthropic"));
    assert_eq!(gateway.fallback_count(), 1);
}

#[tokio::test]
async fn auth_failure_does_not_fall_back() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(anthropic_reply("unused"))
        .expect(0)
        .mount(&secondary)
        .await;

    let gateway = two_provider_gateway(&primary, &secondary).await;
    let err = gateway.request(&ask(), None).await.unwrap_err();

    assert_eq!(err.code(), "AUTH_FAILED");
    assert_eq!(gateway.fallback_count(), 0);
}

#[tokio::test]
async fn pinned_provider_never_falls_back() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&secondary)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(openai_reply("unused"))
        .expect(0)
        .mount(&primary)
        .await;

    let gateway = two_provider_gateway(&primary, &secondary).await;
    let err = gateway.request(&ask(), Some("anthropic")).await.unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(gateway.fallback_count(), 0);
}

#[tokio::test]
async fn exhausted_request_budget_routes_to_fallback() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(openai_reply("primary"))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(anthropic_reply("secondary"))
        .expect(1)
        .mount(&secondary)
        .await;

    let mut openai = provider("openai", ProviderKind::OpenAi, &primary.uri(), "gpt-4o-mini");
    openai.rate_limit.requests_per_minute = 1;
    let config = gateway_config(vec![
        openai,
        provider(
            "anthropic",
            ProviderKind::Anthropic,
            &secondary.uri(),
            "claude-3-5-haiku-latest",
        ),
    ]);
    let gateway =
        ProviderGateway::new(&config, credentials(), Arc::new(HttpProviderFactory::default()))
            .expect("gateway");

    let first = gateway.request(&ask(), None).await.expect("first request");
    assert_eq!(first.provider, "openai");

    let second = gateway.request(&ask(), None).await.expect("second request");
    assert_eq!(second.provider, "anthropic");

    let status = gateway.status();
    let openai = status.iter().find(|s| s.name == "openai").expect("openai status");
    assert_eq!(openai.requests_used, 1);
    assert!(openai.rate_limited);
}

#[tokio::test]
async fn validate_reports_live_credential_state() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(openai_reply("pong"))
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&secondary)
        .await;

    let gateway = two_provider_gateway(&primary, &secondary).await;

    assert!(gateway.validate("openai").await);
    assert!(!gateway.validate("anthropic").await);
    assert!(!gateway.validate("missing").await);
}
