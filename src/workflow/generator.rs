//! LLM-backed Generation Port
//!
//! Wraps an [`LlmProvider`] so the controller can ask for typed artifacts.
//! Each request is bounded by a timeout; retryable failures (rate limits,
//! network errors, malformed output) are retried with exponential backoff
//! before the error is surfaced. A provider's `retry_after` hint raises the
//! wait before the next attempt.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use tracing::{debug, warn};

use super::port::GenerationPort;
use super::schema::{Artifact, SchemaLimits, decode};
use crate::ai::metrics::{SharedMetrics, create_shared_metrics};
use crate::ai::provider::{CompletionRequest, LlmProvider};
use crate::ai::timeout::with_timeout;
use crate::config::Config;
use crate::constants::generation::{BASE_DELAY_MS, DEFAULT_TRANSIENT_RETRIES, MAX_DELAY_SECS};
use crate::constants::network::DEFAULT_TIMEOUT_SECS;
use crate::types::{DocError, Result, preview};

pub struct LlmGenerator<P> {
    provider: P,
    limits: SchemaLimits,
    request_timeout: Duration,
    transient_retries: usize,
    min_delay: Duration,
    max_delay: Duration,
    metrics: SharedMetrics,
}

impl<P: LlmProvider> LlmGenerator<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            limits: SchemaLimits::default(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            transient_retries: DEFAULT_TRANSIENT_RETRIES,
            min_delay: Duration::from_millis(BASE_DELAY_MS),
            max_delay: Duration::from_secs(MAX_DELAY_SECS),
            metrics: create_shared_metrics(),
        }
    }

    pub fn from_config(provider: P, config: &Config) -> Self {
        Self::new(provider)
            .with_limits(SchemaLimits {
                max_outline_depth: config.workflow.max_outline_depth,
            })
            .with_request_timeout(config.generation.request_timeout())
            .with_transient_retries(config.generation.transient_retries)
    }

    pub fn with_limits(mut self, limits: SchemaLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Extra attempts after a retryable failure; 0 disables retries
    pub fn with_transient_retries(mut self, retries: usize) -> Self {
        self.transient_retries = retries;
        self
    }

    pub fn with_backoff(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.transient_retries)
            .with_jitter()
    }

    /// One provider call plus decoding
    async fn attempt<A: Artifact>(&self, request: &CompletionRequest) -> Result<A> {
        let response = match with_timeout(
            self.request_timeout,
            self.provider.complete(request),
            &format!("{} generation", A::KIND),
        )
        .await
        {
            Ok(response) => response,
            Err(e) => {
                self.metrics.record_failure(A::KIND);
                return Err(e);
            }
        };
        self.metrics.record_response(A::KIND, &response);

        debug!(
            artifact = A::KIND,
            tokens = response.usage.total(),
            ms = response.timing.total_ms,
            content = %preview(&response.content.to_string(), 300),
            "Provider response"
        );

        decode::<A>(response.content, &self.limits)
    }
}

#[async_trait]
impl<P: LlmProvider> GenerationPort for LlmGenerator<P> {
    async fn generate<A: Artifact>(&self, instructions: &str) -> Result<A> {
        let request = CompletionRequest::new(instructions, A::json_schema(), A::SCHEMA_NAME);
        debug!(artifact = A::KIND, instructions = %preview(instructions, 500), "Generating");

        (|| self.attempt::<A>(&request))
            .retry(self.backoff())
            .when(DocError::is_transient)
            .adjust(|err: &DocError, delay: Option<Duration>| {
                delay.map(|d| err.retry_after().map_or(d, |hint| d.max(hint)))
            })
            .notify(|err: &DocError, delay: Duration| {
                self.metrics.record_retry(A::KIND);
                warn!(
                    artifact = A::KIND,
                    provider = self.provider.name(),
                    ?delay,
                    error = %err,
                    "Retrying generation"
                );
            })
            .await
    }
}
