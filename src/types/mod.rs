pub mod error;

pub use error::{DocError, ErrorCategory, ErrorClassifier, LlmError, Result};

use std::fmt;

/// Identifier for one workflow run, attached to logs and progress events
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    /// Fresh random id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, enough to tell runs apart in console output
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Truncate text for log lines, appending an ellipsis when cut
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_short() {
        let id = RunId::new("0123456789abcdef");
        assert_eq!(id.short(), "01234567");
        assert_eq!(RunId::new("abc").short(), "abc");
    }

    #[test]
    fn test_generated_run_ids_differ() {
        assert_ne!(RunId::generate(), RunId::generate());
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("a longer line", 8), "a longer...");
        assert_eq!(preview("héllo wörld", 5), "héllo...");
    }
}
