//! LLM-backed relevance analysis.
//!
//! [`AnalysisEngine`] turns fetched page content plus a query into an
//! [`AnalysisResult`] via the provider gateway. Results are cached by
//! (url, normalised query); malformed model output degrades to
//! [`AnalysisResult::fallback`] instead of failing.

pub mod engine;
pub mod metrics;
pub mod parse;
pub mod prompt;

use serde::{Deserialize, Serialize};

pub use engine::{AnalysisConfig, AnalysisEngine, AnalysisOptions, AnalysisProgress};
pub use metrics::AnalysisMetrics;

/// Description used when the model reply cannot be decoded.
pub const FALLBACK_DESCRIPTION: &str = "Analysis failed - using fallback scoring";

/// Model verdict on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Relevance to the query in `[0, 1]`.
    pub relevance_score: f64,
    /// Model confidence in `[0, 1]`.
    pub confidence_score: f64,
    /// Short summary of the page for this query.
    pub description: String,
    /// Optional justification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl AnalysisResult {
    /// Neutral scores used when the model reply is unusable.
    pub fn fallback() -> Self {
        Self {
            relevance_score: 0.5,
            confidence_score: 0.3,
            description: FALLBACK_DESCRIPTION.to_string(),
            reasoning: None,
        }
    }
}
