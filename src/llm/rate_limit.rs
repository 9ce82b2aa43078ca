//! Fixed-window rate limiter keyed by provider name.
//!
//! Each provider gets a 60 second window that starts at its first request.
//! A request is refused before dispatch when either the request count or
//! the token count has reached the provider's budget. Expired windows are
//! reset lazily on the next check.
//!
//! Thread-safe: all state is protected by a [`Mutex`] that is never held
//! across an `.await`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use super::error::LlmError;
use super::types::RateLimit;

/// Length of a rate-limit window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Usage within the current window of one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitWindow {
    /// Requests recorded in this window.
    pub requests_used: u32,
    /// Tokens recorded in this window.
    pub tokens_used: u64,
    /// When this window ends.
    pub reset_at: Instant,
}

impl RateLimitWindow {
    fn fresh(now: Instant) -> Self {
        Self {
            requests_used: 0,
            tokens_used: 0,
            reset_at: now + WINDOW,
        }
    }

    fn exhausted(&self, limit: &RateLimit) -> bool {
        self.requests_used >= limit.requests_per_minute || self.tokens_used >= limit.tokens_per_minute
    }
}

/// Per-provider fixed-window limiter.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, RateLimitWindow>>,
}

impl RateLimiter {
    /// Create an empty limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse with a rate-limited [`LlmError::Api`] if `provider` has used
    /// its budget in the current window.
    pub fn check(&self, provider: &str, limit: &RateLimit) -> Result<(), LlmError> {
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| LlmError::Config("rate limiter lock poisoned".into()))?;
        let window = current_window(&mut windows, provider);
        if window.exhausted(limit) {
            let wait = window.reset_at.saturating_duration_since(Instant::now());
            return Err(LlmError::rate_limited(
                provider,
                format!(
                    "rate limit reached ({} requests, {} tokens used); window resets in {}s",
                    window.requests_used,
                    window.tokens_used,
                    wait.as_secs()
                ),
            ));
        }
        Ok(())
    }

    /// Whether `provider` would currently be refused.
    pub fn is_limited(&self, provider: &str, limit: &RateLimit) -> bool {
        self.check(provider, limit).is_err()
    }

    /// Record one successful request consuming `tokens`.
    pub fn record(&self, provider: &str, tokens: u64) {
        let Ok(mut windows) = self.windows.lock() else {
            tracing::warn!(provider, "rate limiter lock poisoned; usage not recorded");
            return;
        };
        let window = current_window(&mut windows, provider);
        window.requests_used = window.requests_used.saturating_add(1);
        window.tokens_used = window.tokens_used.saturating_add(tokens);
    }

    /// Current window for `provider`, if it has one that has not expired.
    pub fn snapshot(&self, provider: &str) -> Option<RateLimitWindow> {
        let windows = self.windows.lock().ok()?;
        windows
            .get(provider)
            .filter(|w| Instant::now() <= w.reset_at)
            .copied()
    }
}

fn current_window<'a>(
    windows: &'a mut HashMap<String, RateLimitWindow>,
    provider: &str,
) -> &'a mut RateLimitWindow {
    let now = Instant::now();
    let window = windows
        .entry(provider.to_owned())
        .or_insert_with(|| RateLimitWindow::fresh(now));
    if now > window.reset_at {
        *window = RateLimitWindow::fresh(now);
    }
    window
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    const LIMIT: RateLimit = RateLimit {
        requests_per_minute: 2,
        tokens_per_minute: 1_000,
    };

    #[tokio::test(start_paused = true)]
    async fn refuses_after_request_budget() {
        let limiter = RateLimiter::new();
        for _ in 0..2 {
            limiter.check("openai", &LIMIT).unwrap();
            limiter.record("openai", 10);
        }
        let err = limiter.check("openai", &LIMIT).unwrap_err();
        assert!(err.is_rate_limited());
        assert!(matches!(err, LlmError::Api { status: None, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn refuses_after_token_budget() {
        let limiter = RateLimiter::new();
        limiter.record("anthropic", 1_000);
        assert!(limiter.is_limited("anthropic", &LIMIT));
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_expiry() {
        let limiter = RateLimiter::new();
        limiter.record("groq", 5);
        limiter.record("groq", 5);
        assert!(limiter.is_limited("groq", &LIMIT));

        tokio::time::advance(WINDOW + Duration::from_millis(1)).await;
        assert!(limiter.check("groq", &LIMIT).is_ok());
        assert!(limiter.snapshot("groq").is_some_and(|w| w.requests_used == 0));
    }

    #[tokio::test(start_paused = true)]
    async fn providers_are_independent() {
        let limiter = RateLimiter::new();
        limiter.record("openai", 1_000);
        assert!(limiter.is_limited("openai", &LIMIT));
        assert!(!limiter.is_limited("gemini", &LIMIT));
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_reports_usage() {
        let limiter = RateLimiter::new();
        assert!(limiter.snapshot("openai").is_none());
        limiter.record("openai", 42);
        let window = limiter.snapshot("openai").unwrap();
        assert_eq!(window.requests_used, 1);
        assert_eq!(window.tokens_used, 42);
    }
}
