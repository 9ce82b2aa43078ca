//! Configuration types for scout.
//!
//! Every section deserializes with per-field defaults, so a config file
//! only needs to mention what it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use scout_search::{DiscoveryConfig, FetcherConfig};

use crate::analysis::AnalysisConfig;
use crate::error::{Result, ScoutError};
use crate::llm::GatewayConfig;
use crate::pipeline::PipelineConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    /// Orchestrator behaviour.
    pub pipeline: PipelineConfig,
    /// Candidate discovery.
    pub discovery: DiscoveryConfig,
    /// Page fetching and extraction.
    pub fetcher: FetcherConfig,
    /// LLM relevance analysis.
    pub analysis: AnalysisConfig,
    /// Provider registry and routing.
    pub llm: GatewayConfig,
    /// Persistence.
    pub storage: StorageConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

/// Where cache and history are persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file. `None` keeps everything in memory.
    pub sqlite_path: Option<PathBuf>,
    /// Read provider keys from the OS keychain rather than `<NAME>_API_KEY`
    /// environment variables.
    pub use_keyring: bool,
}

/// Log filtering and output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: String,
    /// Directory for daily-rotated log files; stderr only when `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            log_dir: None,
        }
    }
}

impl ScoutConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScoutError::config(path.display().to_string(), e.to_string()))?;
        toml::from_str(&content)
            .map_err(|e| ScoutError::config(path.display().to_string(), e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot
    /// be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let io_err = |e: std::io::Error| ScoutError::config(path.display().to_string(), e.to_string());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ScoutError::config("config", e.to_string()))?;
        std::fs::write(path, content).map_err(io_err)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/scout/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("scout").join("config.toml")
        } else if let Some(config) = dirs::config_dir() {
            config.join("scout").join("config.toml")
        } else {
            PathBuf::from("/tmp/scout-config/config.toml")
        }
    }

    /// Check every section.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::Configuration`] naming the first bad section.
    pub fn validate(&self) -> Result<()> {
        let pipeline = &self.pipeline;
        if pipeline.max_concurrent_scrapes == 0 {
            return Err(ScoutError::config(
                "pipeline.max_concurrent_scrapes",
                "must be greater than 0",
            ));
        }
        if pipeline.history_limit == 0 {
            return Err(ScoutError::config(
                "pipeline.history_limit",
                "must be greater than 0",
            ));
        }
        self.discovery
            .validate()
            .map_err(|e| ScoutError::config("discovery", e.to_string()))?;
        self.fetcher
            .validate()
            .map_err(|e| ScoutError::config("fetcher", e.to_string()))?;
        if self.analysis.max_content_chars == 0 {
            return Err(ScoutError::config(
                "analysis.max_content_chars",
                "must be greater than 0",
            ));
        }
        if !(0.0..=2.0).contains(&self.analysis.temperature) {
            return Err(ScoutError::config(
                "analysis.temperature",
                "must be between 0 and 2",
            ));
        }
        self.llm
            .validate()
            .map_err(|e| ScoutError::config("llm", e.to_string()))?;
        Ok(())
    }
}
