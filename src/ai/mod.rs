//! AI Integration Layer
//!
//! Provider clients, prompt assembly, output repair and usage metrics.

pub mod metrics;
pub mod prompt;
pub mod provider;
pub mod timeout;
pub mod validation;

pub use metrics::{ArtifactMetrics, MetricsCollector, MetricsSummary, SharedMetrics, create_shared_metrics};
pub use prompt::{PromptBuilder, PromptSection};
pub use provider::{
    ClaudeCodeProvider, CompletionRequest, ErrorCategory, ErrorClassifier, LlmError, LlmProvider,
    LlmResponse, OllamaProvider, OpenAiProvider, ProviderConfig, ResponseMetadata, ResponseTiming,
    SharedProvider, TokenUsage, create_provider,
};
pub use timeout::with_timeout;
pub use validation::{JsonRepairer, extract_json_from_response};
