//! LLM Provider Abstraction
//!
//! Defines the `LlmProvider` trait for schema-constrained completions.
//! Providers return raw JSON plus usage metrics; turning that JSON into a
//! typed artifact is the generator's job.

mod claude_code;
mod ollama;
mod openai;

pub use claude_code::ClaudeCodeProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::network::{DEFAULT_MAX_TOKENS, DEFAULT_TIMEOUT_SECS};
use crate::types::{DocError, Result};

// =============================================================================
// Request / Response
// =============================================================================

/// One structured-output request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Instruction text for the model
    pub instructions: String,
    /// JSON Schema the response must satisfy
    pub schema: Value,
    /// Schema name for APIs that require one
    pub schema_name: &'static str,
}

impl CompletionRequest {
    pub fn new(instructions: impl Into<String>, schema: Value, schema_name: &'static str) -> Self {
        Self {
            instructions: instructions.into(),
            schema,
            schema_name,
        }
    }

    /// Instructions followed by the schema, for providers without native
    /// structured output
    pub fn prompt_with_schema(&self) -> String {
        let schema = serde_json::to_string_pretty(&self.schema)
            .unwrap_or_else(|_| self.schema.to_string());
        format!(
            "{}\n\nRespond ONLY with JSON matching this schema, no explanation:\n\n```json\n{}\n```",
            self.instructions, schema
        )
    }
}

/// Provider response including content and usage metrics
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated content (structured JSON)
    pub content: Value,
    pub usage: TokenUsage,
    /// Cost in USD when the provider reports it
    pub cost_usd: f64,
    pub timing: ResponseTiming,
    pub metadata: ResponseMetadata,
}

impl LlmResponse {
    /// Response with content only (usage/cost unknown)
    pub fn content_only(content: Value) -> Self {
        Self {
            content,
            usage: TokenUsage::default(),
            cost_usd: 0.0,
            timing: ResponseTiming::default(),
            metadata: ResponseMetadata::default(),
        }
    }
}

/// Token usage metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Response timing metrics
#[derive(Debug, Clone, Default)]
pub struct ResponseTiming {
    /// Wall-clock time in milliseconds
    pub total_ms: u64,
    /// Processing time reported by the provider
    pub api_ms: Option<u64>,
}

impl ResponseTiming {
    pub fn from_duration(duration: Duration) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
            api_ms: None,
        }
    }

    pub fn with_api_time(duration: Duration, api_ms: Option<u64>) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
            api_ms,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    pub model: String,
    pub provider: String,
}

/// Shared provider handle
pub type SharedProvider = Arc<dyn LlmProvider>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for LLM providers
///
/// API keys are never serialized and are redacted in debug output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// "openai", "ollama" or "claude-code"
    pub provider: String,
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// HTTP/process timeout in seconds
    pub timeout_secs: u64,
    pub temperature: f32,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Custom endpoint
    pub api_base: Option<String>,
    pub max_tokens: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temperature: 0.0,
            api_key: None,
            api_base: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Produce JSON that should satisfy `request.schema`
    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;
}

#[async_trait]
impl<P: LlmProvider + ?Sized> LlmProvider for Arc<P> {
    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        (**self).complete(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    async fn health_check(&self) -> Result<bool> {
        (**self).health_check().await
    }
}

pub const SUPPORTED_PROVIDERS: &[&str] = &["openai", "ollama", "claude-code"];

/// Create a shared provider from configuration
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config.clone())?)),
        "claude-code" => Ok(Arc::new(ClaudeCodeProvider::new(config.clone()))),
        other => Err(DocError::Config(format!(
            "Unknown provider: {}. Supported: {}",
            other,
            SUPPORTED_PROVIDERS.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ProviderConfig {
            api_key: Some("sk-secret".into()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn test_api_key_never_serialized() {
        let config = ProviderConfig {
            api_key: Some("sk-secret".into()),
            ..Default::default()
        };
        let text = serde_json::to_string(&config).unwrap();
        assert!(!text.contains("sk-secret"));
        assert!(!text.contains("api_key"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = ProviderConfig {
            provider: "bard".into(),
            ..Default::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(matches!(err, DocError::Config(ref m) if m.contains("claude-code")));
    }

    #[test]
    fn test_prompt_with_schema_embeds_schema() {
        let request = CompletionRequest::new("Do it", json!({"type": "object"}), "thing");
        let prompt = request.prompt_with_schema();
        assert!(prompt.starts_with("Do it"));
        assert!(prompt.contains("\"type\": \"object\""));
    }

    #[test]
    fn test_token_usage_total() {
        assert_eq!(TokenUsage::new(100, 50).total(), 150);
    }
}
