use console::style;

use crate::ai::MetricsSummary;

/// Styled status lines on stderr; stdout is reserved for results
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        eprintln!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        eprintln!("{} {}", style("ℹ").blue(), message);
    }

    pub fn section(&self, message: &str) {
        eprintln!("\n{}", style(message).bold());
        eprintln!("{}", "─".repeat(40));
    }

    pub fn metrics(&self, summary: &MetricsSummary) {
        self.section("Usage");
        eprintln!("{}", summary.display());
        for (kind, m) in &summary.artifacts {
            eprintln!(
                "  {:<10} calls: {} (failed: {}, retried: {}) tokens: {}",
                kind,
                m.calls,
                m.failures,
                m.retries,
                m.input_tokens + m.output_tokens
            );
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
