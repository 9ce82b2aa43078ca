//! The search pipeline: query model, filtering, ranking and orchestration.

pub mod filters;
pub mod orchestrator;
pub mod progress;
pub mod query;
pub mod ranking;

pub use orchestrator::{
    PipelineConfig, PipelineWarning, SearchOptions, SearchOrchestrator, SearchOutcome,
};
pub use progress::{Phase, ProgressCallback, ProgressEvent, no_progress};
pub use query::{FieldError, QueryFilters, SearchQuery};
pub use ranking::{LoadStatus, ResultMetadata, SearchResult};
