//! Progress reporting for orchestrator runs.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Phase of a search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Finding candidate URLs (0–10%).
    Discovering,
    /// Fetching and extracting pages (10–70%).
    Scraping,
    /// Scoring and sorting (70–95%).
    Ranking,
    /// Done (100%).
    Complete,
}

impl Phase {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovering => "discovering",
            Self::Scraping => "scraping",
            Self::Ranking => "ranking",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Current phase.
    pub phase: Phase,
    /// Overall completion, 0 to 100.
    pub progress: u8,
    /// Human-readable status.
    pub message: String,
    /// Page being fetched, during scraping.
    pub current_url: Option<String>,
}

/// Sink for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// A callback that drops every event.
pub fn no_progress() -> ProgressCallback {
    Arc::new(|_| {})
}

/// Emits events for one run, never letting the percentage go backwards.
pub(crate) struct ProgressReporter {
    callback: ProgressCallback,
    last: AtomicU8,
}

impl ProgressReporter {
    pub(crate) fn new(callback: ProgressCallback) -> Self {
        Self {
            callback,
            last: AtomicU8::new(0),
        }
    }

    pub(crate) fn emit(
        &self,
        phase: Phase,
        progress: u8,
        message: impl Into<String>,
        current_url: Option<String>,
    ) {
        let progress = progress.min(100);
        let previous = self.last.fetch_max(progress, Ordering::Relaxed);
        (self.callback)(ProgressEvent {
            phase,
            progress: progress.max(previous),
            message: message.into(),
            current_url,
        });
    }
}
