//! Span names for structured tracing.
//!
//! Spans follow the hierarchy:
//!
//! ```text
//! scout.pipeline.run
//!   ├─> scout.pipeline.phase
//!   └─> scout.analysis.item
//!        └─> scout.llm.request
//! ```
//!
//! Fields used on these spans: `run_id`, `fingerprint`, `phase`, `url`,
//! `provider`, `model`.

/// Root span for one orchestrator run.
pub const SPAN_PIPELINE_RUN: &str = "scout.pipeline.run";

/// Span for one phase of a run.
pub const SPAN_PIPELINE_PHASE: &str = "scout.pipeline.phase";

/// Span for analysing one piece of content.
pub const SPAN_ANALYSIS_ITEM: &str = "scout.analysis.item";

/// Span for one request dispatched to a provider.
pub const SPAN_LLM_REQUEST: &str = "scout.llm.request";
