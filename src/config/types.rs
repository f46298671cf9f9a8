//! Configuration Types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ai::provider::{ProviderConfig, SUPPORTED_PROVIDERS};
use crate::constants::{generation, network, workflow};
use crate::types::{DocError, Result};

/// Effective configuration after all layers are merged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: ProviderConfig,
    pub workflow: WorkflowConfig,
    pub generation: GenerationConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(DocError::Config(format!(
                "llm.provider must be one of {}, got '{}'",
                SUPPORTED_PROVIDERS.join(", "),
                self.llm.provider
            )));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(DocError::Config(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 || self.generation.request_timeout_secs == 0 {
            return Err(DocError::Config(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(DocError::Config(
                "llm.max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.workflow.max_retries == 0 {
            return Err(DocError::Config(
                "workflow.max_retries must be at least 1".to_string(),
            ));
        }

        if self.workflow.max_outline_depth == 0 {
            return Err(DocError::Config(
                "workflow.max_outline_depth must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Draft/validate loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Maximum outline drafts per run
    pub max_retries: u32,
    /// Deepest outline nesting accepted from the model
    pub max_outline_depth: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_retries: workflow::DEFAULT_MAX_RETRIES,
            max_outline_depth: workflow::DEFAULT_MAX_OUTLINE_DEPTH,
        }
    }
}

/// Settings for individual generation requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Extra attempts after a retryable provider failure
    pub transient_retries: usize,
    /// Upper bound on one provider call, including output parsing
    pub request_timeout_secs: u64,
}

impl GenerationConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            transient_retries: generation::DEFAULT_TRANSIENT_RETRIES,
            request_timeout_secs: network::DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
