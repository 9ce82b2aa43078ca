//! Multi-provider LLM access.
//!
//! Every vendor API is normalised into [`LlmRequest`] / [`LlmResponse`] by a
//! [`ProviderAdapter`]. The [`ProviderGateway`] routes requests to an adapter,
//! enforces per-provider rate-limit windows, and falls back once to another
//! provider on retryable failure.

pub mod error;
pub mod gateway;
pub mod message;
pub mod provider;
pub mod providers;
pub mod rate_limit;
pub mod spans;
pub mod types;

pub use error::LlmError;
pub use gateway::{GatewayConfig, ProviderGateway, ProviderStatus};
pub use message::{Message, Role};
pub use provider::{HttpProviderFactory, ProviderAdapter, ProviderFactory};
pub use rate_limit::{RateLimitWindow, RateLimiter};
pub use types::{
    LlmRequest, LlmResponse, ProviderConfig, ProviderKind, RateLimit, TokenUsage,
    default_providers,
};
