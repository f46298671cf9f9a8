//! Generation Metrics
//!
//! Counts provider calls, tokens, latency and cost, in total and per
//! artifact kind (outline, validation, document). Safe to share across
//! tasks behind an `Arc`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::ai::provider::LlmResponse;

/// Totals for one artifact kind
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArtifactMetrics {
    pub calls: u32,
    pub failures: u32,
    pub retries: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub latency_ms: u64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub total_duration_ms: u64,
    pub api_calls: u32,
    pub failures: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub avg_latency_ms: f64,
    pub total_cost_usd: f64,
    pub artifacts: BTreeMap<&'static str, ArtifactMetrics>,
}

pub struct MetricsCollector {
    start_time: Instant,
    api_calls: AtomicU32,
    failures: AtomicU32,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    total_latency_ms: AtomicU64,
    /// Microdollars, for atomic accumulation
    total_cost_micros: AtomicU64,
    artifacts: RwLock<BTreeMap<&'static str, ArtifactMetrics>>,
}

pub type SharedMetrics = Arc<MetricsCollector>;

pub fn create_shared_metrics() -> SharedMetrics {
    Arc::new(MetricsCollector::new())
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            api_calls: AtomicU32::new(0),
            failures: AtomicU32::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            total_cost_micros: AtomicU64::new(0),
            artifacts: RwLock::new(BTreeMap::new()),
        }
    }

    /// Record a successful provider call for `kind`
    pub fn record_response(&self, kind: &'static str, response: &LlmResponse) {
        let input = u64::from(response.usage.input_tokens);
        let output = u64::from(response.usage.output_tokens);

        self.api_calls.fetch_add(1, Ordering::Relaxed);
        self.input_tokens.fetch_add(input, Ordering::Relaxed);
        self.output_tokens.fetch_add(output, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(response.timing.total_ms, Ordering::Relaxed);
        self.total_cost_micros
            .fetch_add((response.cost_usd * 1_000_000.0) as u64, Ordering::Relaxed);

        self.update(kind, |m| {
            m.calls += 1;
            m.input_tokens += input;
            m.output_tokens += output;
            m.latency_ms += response.timing.total_ms;
            m.cost_usd += response.cost_usd;
        });
    }

    /// Record a failed provider call for `kind`
    pub fn record_failure(&self, kind: &'static str) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.update(kind, |m| {
            m.calls += 1;
            m.failures += 1;
        });
    }

    /// Record that a failed call for `kind` will be retried
    pub fn record_retry(&self, kind: &'static str) {
        self.update(kind, |m| m.retries += 1);
    }

    fn update(&self, kind: &'static str, f: impl FnOnce(&mut ArtifactMetrics)) {
        let mut artifacts = self.artifacts.write().unwrap_or_else(|poisoned| {
            tracing::error!("Metrics lock poisoned, recovering");
            poisoned.into_inner()
        });
        f(artifacts.entry(kind).or_default());
    }

    pub fn artifact(&self, kind: &str) -> Option<ArtifactMetrics> {
        self.artifacts
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(kind)
            .cloned()
    }

    pub fn summary(&self) -> MetricsSummary {
        let api_calls = self.api_calls.load(Ordering::Relaxed);
        let input_tokens = self.input_tokens.load(Ordering::Relaxed);
        let output_tokens = self.output_tokens.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        MetricsSummary {
            total_duration_ms: self.start_time.elapsed().as_millis() as u64,
            api_calls,
            failures: self.failures.load(Ordering::Relaxed),
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            avg_latency_ms: if api_calls > 0 {
                total_latency as f64 / api_calls as f64
            } else {
                0.0
            },
            total_cost_usd: self.total_cost_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0,
            artifacts: self
                .artifacts
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone(),
        }
    }
}

impl MetricsSummary {
    pub fn display(&self) -> String {
        format!(
            "Duration: {:.1}s\n\
             API Calls: {} ({} failed)\n\
             Tokens: {} (input: {}, output: {})\n\
             Avg Latency: {:.0}ms\n\
             Cost: ${:.4}",
            self.total_duration_ms as f64 / 1000.0,
            self.api_calls,
            self.failures,
            self.total_tokens,
            self.input_tokens,
            self.output_tokens,
            self.avg_latency_ms,
            self.total_cost_usd
        )
    }
}
