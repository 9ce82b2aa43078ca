//! Error types for the LLM provider layer.
//!
//! Each error variant carries a stable error code (SCREAMING_SNAKE_CASE)
//! that is included in the Display output and accessible via [`LlmError::code()`].
//! Codes are part of the public API contract and will not change.

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// Invalid or missing configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// Authentication failed (invalid/missing API key).
    pub const AUTH_FAILED: &str = "AUTH_FAILED";

    /// The provider answered with an error status, or the request was
    /// refused locally by the rate limiter.
    pub const API_ERROR: &str = "API_ERROR";

    /// No usable provider (unknown name or missing credentials).
    pub const PROVIDER_UNAVAILABLE: &str = "PROVIDER_UNAVAILABLE";

    /// Transport-level failure talking to the provider.
    pub const REQUEST_FAILED: &str = "REQUEST_FAILED";

    /// Request timed out.
    pub const TIMEOUT_ERROR: &str = "TIMEOUT_ERROR";

    /// Provider response could not be decoded.
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
}

/// Errors produced by the provider gateway and adapters.
///
/// The Display impl formats as `[CODE] message`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    /// Invalid or missing configuration.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    Config(String),

    /// The provider rejected the credential.
    #[error("[{}] {provider}: {message}", error_codes::AUTH_FAILED)]
    Auth {
        /// Provider name.
        provider: String,
        /// Provider-supplied detail.
        message: String,
    },

    /// Error status from the provider, or a local rate-limit refusal
    /// (`status == None`, `rate_limited == true`).
    #[error("[{}] {provider}{}: {message}", error_codes::API_ERROR, status_suffix(.status))]
    Api {
        /// Provider name.
        provider: String,
        /// HTTP status, if the provider was reached.
        status: Option<u16>,
        /// Provider-supplied or local detail.
        message: String,
        /// Whether this failure is a rate limit.
        rate_limited: bool,
    },

    /// The provider cannot be used right now.
    #[error("[{}] {provider}: {reason}", error_codes::PROVIDER_UNAVAILABLE)]
    Unavailable {
        /// Provider name.
        provider: String,
        /// Why it is unavailable.
        reason: String,
    },

    /// Transport-level failure.
    #[error("[{}] {}", error_codes::REQUEST_FAILED, .0)]
    Request(String),

    /// The request exceeded the configured timeout.
    #[error("[{}] {provider} did not respond within {secs}s", error_codes::TIMEOUT_ERROR)]
    Timeout {
        /// Provider name.
        provider: String,
        /// Timeout that elapsed.
        secs: u64,
    },

    /// Response body could not be decoded.
    #[error("[{}] {}", error_codes::PARSE_ERROR, .0)]
    Parse(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl LlmError {
    /// Local rate-limit refusal for `provider`.
    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            status: None,
            message: message.into(),
            rate_limited: true,
        }
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => error_codes::CONFIG_INVALID,
            Self::Auth { .. } => error_codes::AUTH_FAILED,
            Self::Api { .. } => error_codes::API_ERROR,
            Self::Unavailable { .. } => error_codes::PROVIDER_UNAVAILABLE,
            Self::Request(_) => error_codes::REQUEST_FAILED,
            Self::Timeout { .. } => error_codes::TIMEOUT_ERROR,
            Self::Parse(_) => error_codes::PARSE_ERROR,
        }
    }

    /// Whether this is a rate-limit failure (local or HTTP 429).
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Api { rate_limited: true, .. } | Self::Api { status: Some(429), .. })
    }

    /// Returns true if another provider might succeed where this one failed.
    ///
    /// Retryable: rate limits, 408/429/5xx, timeouts, transport failures and
    /// providers unavailable for lack of credentials. Not retryable: auth,
    /// other 4xx, configuration and parse failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Config(_) | Self::Auth { .. } | Self::Parse(_) => false,
            Self::Api {
                status,
                rate_limited,
                ..
            } => *rate_limited || matches!(status, Some(408 | 429) | Some(500..=599)),
            Self::Unavailable { .. } | Self::Request(_) | Self::Timeout { .. } => true,
        }
    }
}

/// Convenience alias for LLM results.
pub type Result<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: Option<u16>, rate_limited: bool) -> LlmError {
        LlmError::Api {
            provider: "openai".into(),
            status,
            message: "boom".into(),
            rate_limited,
        }
    }

    #[test]
    fn display_includes_code() {
        let err = LlmError::Config("no providers".into());
        assert_eq!(err.to_string(), "[CONFIG_INVALID] no providers");

        let err = api(Some(503), false);
        assert_eq!(err.to_string(), "[API_ERROR] openai (HTTP 503): boom");

        let err = LlmError::rate_limited("groq", "window exhausted");
        assert_eq!(err.to_string(), "[API_ERROR] groq: window exhausted");
        assert_eq!(err.code(), error_codes::API_ERROR);
    }

    #[test]
    fn retryability() {
        assert!(api(Some(429), false).is_retryable());
        assert!(api(Some(503), false).is_retryable());
        assert!(api(Some(408), false).is_retryable());
        assert!(api(None, true).is_retryable());
        assert!(!api(Some(400), false).is_retryable());
        assert!(!api(Some(404), false).is_retryable());
        assert!(LlmError::Timeout { provider: "a".into(), secs: 30 }.is_retryable());
        assert!(LlmError::Request("connection reset".into()).is_retryable());
        assert!(LlmError::Unavailable { provider: "a".into(), reason: "no key".into() }.is_retryable());
        assert!(!LlmError::Auth { provider: "a".into(), message: "bad key".into() }.is_retryable());
        assert!(!LlmError::Parse("bad json".into()).is_retryable());
    }

    #[test]
    fn rate_limit_detection() {
        assert!(api(Some(429), false).is_rate_limited());
        assert!(api(None, true).is_rate_limited());
        assert!(!api(Some(500), false).is_rate_limited());
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            LlmError::Unavailable { provider: "x".into(), reason: "y".into() }.code(),
            "PROVIDER_UNAVAILABLE"
        );
        assert_eq!(LlmError::Timeout { provider: "x".into(), secs: 1 }.code(), "TIMEOUT_ERROR");
    }
}
