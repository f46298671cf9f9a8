//! Ollama Local LLM Provider
//!
//! Uses `/api/chat` with the artifact schema passed as `format`, which
//! Ollama enforces through constrained decoding.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    CompletionRequest, ErrorClassifier, LlmProvider, LlmResponse, ProviderConfig,
    ResponseMetadata, ResponseTiming, TokenUsage,
};
use crate::ai::validation::extract_json_from_response;
use crate::types::{DocError, ErrorCategory, LlmError, Result};

const PROVIDER: &str = "ollama";
const DEFAULT_API_BASE: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.1:latest";

pub struct OllamaProvider {
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_base = Self::validate_endpoint(
            config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE),
        )?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DocError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base,
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    /// Accept only http(s) endpoints; warn when leaving the local machine
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            DocError::Config(format!("Invalid Ollama endpoint URL '{}': {}", endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(DocError::Config(format!(
                "Ollama endpoint must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        if let Some(host) = url.host_str()
            && !matches!(host, "localhost" | "127.0.0.1" | "[::1]")
        {
            warn!("Ollama endpoint is not localhost: {}", host);
        }

        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    fn build_request<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: request.prompt_with_schema(),
            }],
            stream: false,
            format: &request.schema,
            options: ChatOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        info!(
            "Generating {} with Ollama (model: {})",
            request.schema_name, self.model
        );

        let start_time = Instant::now();
        let url = format!("{}/api/chat", self.api_base);

        let response = self
            .client
            .post(&url)
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_connect() {
                    format!(
                        "Connection refused by Ollama at {}. Start it with: ollama serve",
                        self.api_base
                    )
                } else {
                    format!("Ollama request failed: {}", e)
                };
                ErrorClassifier::classify(&message, PROVIDER)
            })?;

        let elapsed = start_time.elapsed();

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("Ollama API error ({}): {}", status, body),
                PROVIDER,
            )
            .into());
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            LlmError::new(
                ErrorCategory::ParseError,
                format!("Failed to parse Ollama response: {}", e),
            )
            .provider(PROVIDER)
        })?;

        debug!(chars = body.message.content.len(), "Received Ollama response");
        let content = extract_json_from_response(&body.message.content)?;

        Ok(LlmResponse {
            content,
            usage: TokenUsage::new(
                body.prompt_eval_count.unwrap_or(0),
                body.eval_count.unwrap_or(0),
            ),
            cost_usd: 0.0,
            timing: ResponseTiming::with_api_time(
                elapsed,
                body.total_duration.map(|ns| ns / 1_000_000),
            ),
            metadata: ResponseMetadata {
                model: self.model.clone(),
                provider: PROVIDER.to_string(),
            },
        })
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.api_base);

        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let Ok(tags) = resp.json::<TagsResponse>().await else {
                    return Ok(true);
                };
                let base = self.model.trim_end_matches(":latest");
                if tags.models.iter().any(|m| m.name.starts_with(base)) {
                    info!("Ollama is available with model: {}", self.model);
                    Ok(true)
                } else {
                    warn!(
                        "Ollama is running but model '{}' is missing. Pull with: ollama pull {}",
                        self.model, self.model
                    );
                    Ok(false)
                }
            }
            Ok(resp) => {
                warn!("Ollama API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Ollama not available: {}", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    format: &'a Value,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    /// Nanoseconds
    #[serde(default)]
    total_duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(api_base: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            provider: "ollama".to_string(),
            api_base: api_base.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let provider = OllamaProvider::new(config(None)).unwrap();
        assert_eq!(provider.api_base, DEFAULT_API_BASE);
        assert_eq!(provider.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let err = OllamaProvider::new(config(Some("file:///etc/passwd"))).err().unwrap();
        assert!(matches!(err, DocError::Config(_)));
        assert!(OllamaProvider::new(config(Some("not a url"))).is_err());
    }

    #[test]
    fn test_request_carries_schema_as_format() {
        let provider = OllamaProvider::new(config(None)).unwrap();
        let request = CompletionRequest::new(
            "Judge it",
            json!({"type": "object", "required": ["meets_requirements"]}),
            "outline_validation",
        );
        let body = serde_json::to_value(provider.build_request(&request)).unwrap();

        assert_eq!(body["format"]["required"][0], "meets_requirements");
        assert_eq!(body["stream"], false);
        assert!(body["messages"][0]["content"].as_str().unwrap().starts_with("Judge it"));
    }
}
