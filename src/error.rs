//! Error types for the scout pipeline.
//!
//! Every variant carries a stable code, exposed through [`ScoutError::code`]
//! and included in the Display output as `[CODE] message`.

use scout_search::{ContentError, SearchError};

use crate::llm::LlmError;
use crate::pipeline::FieldError;
use crate::store::StoreError;

/// Stable error codes for programmatic handling.
pub mod error_codes {
    /// The query failed validation.
    pub const INVALID_QUERY: &str = "INVALID_QUERY";
    /// Discovery or transport failure.
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    /// LLM provider failure.
    pub const API_ERROR: &str = "API_ERROR";
    /// A page could not be fetched or extracted.
    pub const CONTENT_ERROR: &str = "CONTENT_ERROR";
    /// Invalid configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
    /// The run was cancelled.
    pub const SEARCH_CANCELLED: &str = "SEARCH_CANCELLED";
    /// Persistence failure.
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
}

/// Top-level error type for scout.
#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    /// One entry per violated field.
    #[error("[{}] {}", error_codes::INVALID_QUERY, join_fields(.0))]
    InvalidQuery(Vec<FieldError>),

    /// Discovery or transport failure.
    #[error("[{}] {message}", error_codes::NETWORK_ERROR)]
    Network {
        /// What went wrong.
        message: String,
        /// HTTP status, when one was received.
        status: Option<u16>,
        /// URL involved, when known.
        url: Option<String>,
    },

    /// LLM provider failure.
    #[error("[{}] {}", error_codes::API_ERROR, .0)]
    Api(#[from] LlmError),

    /// Page fetch or extraction failure.
    #[error("[{}] {}", error_codes::CONTENT_ERROR, .0)]
    Content(#[from] ContentError),

    /// Invalid configuration.
    #[error("[{}] {field}: {reason}", error_codes::CONFIG_INVALID)]
    Configuration {
        /// Offending setting.
        field: String,
        /// Why it is invalid.
        reason: String,
    },

    /// The run was cancelled; no results are returned.
    #[error("[{}] search was cancelled", error_codes::SEARCH_CANCELLED)]
    Cancelled,

    /// Persistence failure.
    #[error("[{}] {}", error_codes::STORAGE_ERROR, .0)]
    Storage(#[from] StoreError),
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ScoutError {
    /// Configuration error for `field`.
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidQuery(_) => error_codes::INVALID_QUERY,
            Self::Network { .. } => error_codes::NETWORK_ERROR,
            Self::Api(_) => error_codes::API_ERROR,
            Self::Content(_) => error_codes::CONTENT_ERROR,
            Self::Configuration { .. } => error_codes::CONFIG_INVALID,
            Self::Cancelled => error_codes::SEARCH_CANCELLED,
            Self::Storage(_) => error_codes::STORAGE_ERROR,
        }
    }
}

impl From<SearchError> for ScoutError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Cancelled => Self::Cancelled,
            SearchError::Config(reason) => Self::config("search", reason),
            other @ (SearchError::DiscoveryFailed(_)
            | SearchError::Timeout(_)
            | SearchError::Http(_)
            | SearchError::Parse(_)) => Self::Network {
                message: other.to_string(),
                status: None,
                url: None,
            },
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ScoutError>;
