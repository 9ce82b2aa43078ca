//! Rolling analysis statistics over the most recent samples.

use std::collections::VecDeque;

use serde::Serialize;

/// Number of samples the averages are computed over.
pub const WINDOW: usize = 100;

#[derive(Debug, Clone, Copy)]
struct Sample {
    relevance: f64,
    confidence: f64,
    response_ms: f64,
    cache_hit: bool,
}

/// Snapshot of analysis performance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AnalysisMetrics {
    /// Mean relevance over the window.
    pub average_relevance: f64,
    /// Mean confidence over the window.
    pub average_confidence: f64,
    /// Mean time per analysis over the window, in milliseconds.
    pub average_response_ms: f64,
    /// Share of analyses served from cache over the window.
    pub cache_hit_rate: f64,
    /// Analyses completed since start.
    pub total_analyses: u64,
}

/// Bounded sample buffer.
#[derive(Debug, Default)]
pub(crate) struct MetricsWindow {
    samples: VecDeque<Sample>,
    total: u64,
}

impl MetricsWindow {
    pub(crate) fn record(&mut self, relevance: f64, confidence: f64, response_ms: f64, cache_hit: bool) {
        if self.samples.len() == WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample {
            relevance,
            confidence,
            response_ms,
            cache_hit,
        });
        self.total += 1;
    }

    pub(crate) fn snapshot(&self) -> AnalysisMetrics {
        let n = self.samples.len();
        if n == 0 {
            return AnalysisMetrics {
                total_analyses: self.total,
                ..AnalysisMetrics::default()
            };
        }
        let mean = |f: fn(&Sample) -> f64| self.samples.iter().map(f).sum::<f64>() / n as f64;
        AnalysisMetrics {
            average_relevance: mean(|s| s.relevance),
            average_confidence: mean(|s| s.confidence),
            average_response_ms: mean(|s| s.response_ms),
            cache_hit_rate: mean(|s| if s.cache_hit { 1.0 } else { 0.0 }),
            total_analyses: self.total,
        }
    }
}
