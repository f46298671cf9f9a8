//! OpenAI API Provider
//!
//! Chat Completions with `response_format: json_schema`, so the model is
//! constrained to the artifact schema server-side.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
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

const PROVIDER: &str = "openai";
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "o3-mini";

const SYSTEM_PROMPT: &str =
    "You are a careful technical writing assistant. Respond only with JSON matching the provided schema.";

/// OpenAI API Provider with secure API key handling
pub struct OpenAiProvider {
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                DocError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY or llm.api_key".to_string(),
                )
            })?;

        let api_base = config
            .api_base
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DocError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base,
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    /// Reasoning models reject the temperature parameter
    fn supports_temperature(&self) -> bool {
        !self.model.starts_with('o')
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: request.instructions.clone(),
                },
            ],
            temperature: self.supports_temperature().then_some(self.temperature),
            max_completion_tokens: Some(self.max_tokens),
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: request.schema_name,
                    strict: true,
                    schema: request.schema.clone(),
                },
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        info!(
            "Generating {} with OpenAI (model: {})",
            request.schema_name, self.model
        );

        let start_time = Instant::now();
        let url = format!("{}/chat/completions", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(|e| {
                ErrorClassifier::classify(&format!("OpenAI request failed: {}", e), PROVIDER)
            })?;

        let elapsed = start_time.elapsed();

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("OpenAI API error ({}): {}", status, body),
                PROVIDER,
            )
            .into());
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|e| {
            LlmError::new(
                ErrorCategory::ParseError,
                format!("Failed to parse OpenAI response: {}", e),
            )
            .provider(PROVIDER)
        })?;

        let usage = body
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let choice = body.choices.into_iter().next().ok_or_else(|| {
            LlmError::new(ErrorCategory::ParseError, "No choices in OpenAI response")
                .provider(PROVIDER)
        })?;

        if let Some(refusal) = choice.message.refusal {
            return Err(LlmError::new(
                ErrorCategory::BadRequest,
                format!("Model refused the request: {}", refusal),
            )
            .provider(PROVIDER)
            .into());
        }

        let text = choice.message.content.ok_or_else(|| {
            LlmError::new(ErrorCategory::ParseError, "No content in OpenAI response")
                .provider(PROVIDER)
        })?;

        debug!(chars = text.len(), "Received OpenAI response");
        let content = extract_json_from_response(&text)?;

        Ok(LlmResponse {
            content,
            usage,
            cost_usd: 0.0,
            timing: ResponseTiming::from_duration(elapsed),
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
        let url = format!("{}/models", self.api_base);

        match self
            .client
            .get(&url)
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                info!("OpenAI API is available");
                Ok(true)
            }
            Ok(resp) => {
                warn!("OpenAI API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("OpenAI API check failed: {}", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<usize>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    strict: bool,
    schema: Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}
