//! Claude Code CLI Provider
//!
//! Runs the local `claude` CLI in print mode with `--json-schema` and reads
//! the structured result from its JSON envelope. Single-shot: retries are
//! the generator's concern.

use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info};

use super::{
    CompletionRequest, ErrorClassifier, LlmProvider, LlmResponse, ProviderConfig,
    ResponseMetadata, ResponseTiming, TokenUsage,
};
use crate::ai::timeout::with_timeout;
use crate::ai::validation::extract_json_from_response;
use crate::types::{DocError, ErrorCategory, LlmError, Result};

const PROVIDER: &str = "claude-code";
const DEFAULT_MODEL: &str = "sonnet";

pub struct ClaudeCodeProvider {
    model: String,
    timeout: Duration,
}

impl ClaudeCodeProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn command(&self, request: &CompletionRequest) -> Result<Command> {
        let mut cmd = Command::new("claude");
        cmd.arg("-p")
            .arg(&request.instructions)
            .arg("--output-format")
            .arg("json")
            .arg("--model")
            .arg(&self.model)
            .arg("--json-schema")
            .arg(serde_json::to_string(&request.schema)?)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd)
    }

    /// Pull the artifact out of the CLI's result envelope
    fn extract_content(envelope: &Value) -> Result<Value> {
        if let Some(structured) = envelope.get("structured_output") {
            return Ok(structured.clone());
        }
        match envelope.get("result") {
            Some(Value::String(text)) => extract_json_from_response(text),
            Some(value @ (Value::Object(_) | Value::Array(_))) => Ok(value.clone()),
            _ => Err(LlmError::new(
                ErrorCategory::ParseError,
                "No structured output in Claude Code response",
            )
            .provider(PROVIDER)
            .into()),
        }
    }

    fn extract_usage(envelope: &Value) -> TokenUsage {
        let field = |name: &str| {
            envelope
                .get("usage")
                .and_then(|u| u.get(name))
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32
        };
        TokenUsage::new(field("input_tokens"), field("output_tokens"))
    }

    fn failure(stdout: &str, stderr: &str) -> DocError {
        if let Ok(envelope) = serde_json::from_str::<Value>(stdout)
            && envelope.get("is_error").and_then(Value::as_bool) == Some(true)
        {
            let message = envelope
                .get("result")
                .and_then(Value::as_str)
                .unwrap_or("Unknown API error");
            return ErrorClassifier::classify(&format!("Claude Code API error: {}", message), PROVIDER)
                .into();
        }
        let detail = if stderr.trim().is_empty() {
            "process exited with non-zero status"
        } else {
            stderr.trim()
        };
        ErrorClassifier::classify(&format!("Claude Code failed: {}", detail), PROVIDER).into()
    }
}

#[async_trait]
impl LlmProvider for ClaudeCodeProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        info!(
            "Generating {} with Claude Code CLI (model: {})",
            request.schema_name, self.model
        );

        let start_time = Instant::now();
        let child = self.command(request)?.spawn().map_err(|e| {
            DocError::LlmApi(format!("Failed to spawn Claude Code CLI: {}. Is it installed?", e))
        })?;

        let output = with_timeout(
            self.timeout,
            async { Ok(child.wait_with_output().await?) },
            "Claude Code CLI",
        )
        .await?;
        let elapsed = start_time.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(Self::failure(&stdout, &String::from_utf8_lossy(&output.stderr)));
        }

        let envelope: Value = serde_json::from_str(&stdout).map_err(|e| {
            LlmError::new(
                ErrorCategory::ParseError,
                format!("Failed to parse Claude Code output: {}", e),
            )
            .provider(PROVIDER)
        })?;
        debug!("Received Claude Code envelope");

        Ok(LlmResponse {
            content: Self::extract_content(&envelope)?,
            usage: Self::extract_usage(&envelope),
            cost_usd: envelope
                .get("total_cost_usd")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            timing: ResponseTiming::with_api_time(
                elapsed,
                envelope.get("duration_api_ms").and_then(Value::as_u64),
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
        let output = Command::new("claude")
            .arg("--version")
            .output()
            .await
            .map_err(|e| DocError::LlmApi(format!("Claude Code not found: {}", e)))?;

        if output.status.success() {
            info!(
                "Claude Code CLI available: {}",
                String::from_utf8_lossy(&output.stdout).trim()
            );
        }
        Ok(output.status.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_output_preferred() {
        let envelope = json!({
            "structured_output": {"meets_requirements": true},
            "result": "ignored"
        });
        assert_eq!(
            ClaudeCodeProvider::extract_content(&envelope).unwrap(),
            json!({"meets_requirements": true})
        );
    }

    #[test]
    fn test_result_string_is_repaired() {
        let envelope = json!({"result": "```json\n{\"content\": \"text\",}\n```"});
        assert_eq!(
            ClaudeCodeProvider::extract_content(&envelope).unwrap(),
            json!({"content": "text"})
        );
    }

    #[test]
    fn test_missing_output_is_parse_error() {
        let err = ClaudeCodeProvider::extract_content(&json!({"usage": {}})).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ParseError);
    }

    #[test]
    fn test_extract_usage() {
        let envelope = json!({"usage": {"input_tokens": 1000, "output_tokens": 500}});
        assert_eq!(
            ClaudeCodeProvider::extract_usage(&envelope),
            TokenUsage::new(1000, 500)
        );
    }

    #[test]
    fn test_api_error_envelope_classified() {
        let stdout = r#"{"is_error": true, "result": "rate limit exceeded"}"#;
        let err = ClaudeCodeProvider::failure(stdout, "");
        assert_eq!(err.category(), ErrorCategory::RateLimit);
    }

    #[test]
    fn test_default_model() {
        let provider = ClaudeCodeProvider::new(ProviderConfig::default());
        assert_eq!(provider.model(), DEFAULT_MODEL);
    }

    #[tokio::test]
    #[ignore = "requires claude CLI installed"]
    async fn test_health_check() {
        let provider = ClaudeCodeProvider::new(ProviderConfig::default());
        assert!(provider.health_check().await.is_ok());
    }
}
