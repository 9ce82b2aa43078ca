//! Per-backend circuit breaker for discovery fan-out.
//!
//! Backends that fail repeatedly are skipped for a cooldown period so a
//! dead source does not add its full timeout to every query. After the
//! cooldown one probe request decides whether the backend is restored.
//!
//! ```text
//! ┌────────┐  N failures   ┌────────┐  cooldown   ┌──────────┐
//! │ Closed ├──────────────►│  Open  ├────────────►│ HalfOpen │
//! └───▲────┘               └───▲────┘             └────┬─────┘
//!     │        success          │       failure         │
//!     └─────────────────────────┴───────────────────────┘
//! ```

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Circuit state for a single backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Healthy; requests flow.
    Closed,
    /// Tripped; requests are skipped until the cooldown expires.
    Open,
    /// Cooldown elapsed; one probe request is allowed.
    HalfOpen,
}

#[derive(Debug, Clone)]
struct BackendHealth {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl Default for BackendHealth {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
        }
    }
}

/// Tracks health per backend name and gates requests.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    backends: HashMap<String, BackendHealth>,
}

impl CircuitBreaker {
    /// Create a breaker that opens after `failure_threshold` consecutive
    /// failures and stays open for `cooldown`.
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
            backends: HashMap::new(),
        }
    }

    /// Record a successful request; closes the circuit.
    pub fn record_success(&mut self, backend: &str) {
        let health = self.backends.entry(backend.to_owned()).or_default();
        health.state = CircuitState::Closed;
        health.consecutive_failures = 0;
        health.opened_at = None;
    }

    /// Record a failed request.
    ///
    /// A failed half-open probe re-opens the circuit immediately.
    pub fn record_failure(&mut self, backend: &str) {
        let health = self.backends.entry(backend.to_owned()).or_default();
        health.consecutive_failures = health.consecutive_failures.saturating_add(1);

        if health.state == CircuitState::HalfOpen
            || health.consecutive_failures >= self.failure_threshold
        {
            health.state = CircuitState::Open;
            health.opened_at = Some(Instant::now());
        }
    }

    /// Whether a request to `backend` should be attempted now.
    ///
    /// An open circuit whose cooldown has elapsed moves to half-open and
    /// admits the probe.
    pub fn should_attempt(&mut self, backend: &str) -> bool {
        let cooldown = self.cooldown;
        let health = self.backends.entry(backend.to_owned()).or_default();
        match health.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = health.opened_at.is_none_or(|t| t.elapsed() >= cooldown);
                if elapsed {
                    health.state = CircuitState::HalfOpen;
                }
                elapsed
            }
        }
    }

    /// Current state of `backend` (closed if never seen).
    pub fn state(&self, backend: &str) -> CircuitState {
        self.backends
            .get(backend)
            .map_or(CircuitState::Closed, |h| h.state)
    }

    /// `(backend, state, consecutive_failures)` for every tracked backend.
    pub fn health_report(&self) -> Vec<(String, CircuitState, u32)> {
        let mut report: Vec<_> = self
            .backends
            .iter()
            .map(|(name, h)| (name.clone(), h.state, h.consecutive_failures))
            .collect();
        report.sort_by(|a, b| a.0.cmp(&b.0));
        report
    }
}
