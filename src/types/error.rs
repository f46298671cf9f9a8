//! Unified Error Types
//!
//! One error enum (`DocError`) for the whole crate, plus a categorized
//! `LlmError` so the generation layer can tell a transient provider hiccup
//! from a request that will never succeed.
//!
//! ## Error Categories
//!
//! - **RateLimit / Network / Transient / ParseError**: retryable inside the generator
//! - **Auth / BadRequest / TokenLimit**: fail fast
//! - **Unavailable / Unknown**: fail, surfaced to the caller as-is

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Provider failure categories used for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry
    RateLimit,
    /// Prompt or completion exceeded the model context
    TokenLimit,
    /// Authentication failed
    Auth,
    /// Connectivity issues
    Network,
    /// Provider or model not reachable
    Unavailable,
    /// Request rejected as invalid
    BadRequest,
    /// Response could not be parsed
    ParseError,
    /// Temporary server-side issue
    Transient,
    /// Anything else
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::RateLimit => "RATE_LIMIT",
            Self::TokenLimit => "TOKEN_LIMIT",
            Self::Auth => "AUTH",
            Self::Network => "NETWORK",
            Self::Unavailable => "UNAVAILABLE",
            Self::BadRequest => "BAD_REQUEST",
            Self::ParseError => "PARSE_ERROR",
            Self::Transient => "TRANSIENT",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

impl ErrorCategory {
    /// Whether another attempt against the same provider may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Network | Self::Transient | Self::ParseError
        )
    }

    /// Minimum wait before retrying this category
    pub fn recommended_delay(&self) -> Duration {
        match self {
            Self::RateLimit => Duration::from_secs(30),
            Self::Network => Duration::from_secs(5),
            Self::Transient => Duration::from_secs(2),
            Self::ParseError => Duration::from_secs(1),
            _ => Duration::from_millis(500),
        }
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Categorized provider error
#[derive(Debug, Clone)]
pub struct LlmError {
    pub category: ErrorCategory,
    pub message: String,
    pub provider: Option<String>,
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.provider {
            Some(provider) => write!(f, "[{}:{}] {}", provider, self.category, self.message),
            None => write!(f, "[{}] {}", self.category, self.message),
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    /// Attach the provider name
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Attach a suggested wait before retrying
    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Message fragments per category, checked in order. First match wins.
const MESSAGE_PATTERNS: &[(ErrorCategory, &[&str])] = &[
    (
        ErrorCategory::RateLimit,
        &["rate limit", "429", "too many requests", "quota exceeded"],
    ),
    (
        ErrorCategory::TokenLimit,
        &[
            "context length",
            "context too long",
            "maximum context",
            "too many tokens",
        ],
    ),
    (
        ErrorCategory::Auth,
        &[
            "401",
            "403",
            "api key",
            "unauthorized",
            "permission denied",
            "authentication",
        ],
    ),
    (
        ErrorCategory::Network,
        &[
            "connection",
            "network",
            "dns",
            "timed out",
            "timeout",
            "unreachable",
        ],
    ),
    (
        ErrorCategory::Unavailable,
        &[
            "503",
            "502",
            "service unavailable",
            "not installed",
            "model not found",
        ],
    ),
    (
        ErrorCategory::BadRequest,
        &["400", "bad request", "invalid request"],
    ),
    (
        ErrorCategory::ParseError,
        &["parse", "json", "syntax", "unexpected token"],
    ),
    (
        ErrorCategory::Transient,
        &["overloaded", "temporar", "internal error", "500", "non-zero status"],
    ),
];

/// Maps raw provider failures onto an `ErrorCategory`
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a free-form provider error message
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let lower = message.to_lowercase();

        let category = MESSAGE_PATTERNS
            .iter()
            .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
            .map(|(category, _)| *category)
            .unwrap_or(ErrorCategory::Unknown);

        let err = LlmError::new(category, message).provider(provider);
        match category {
            ErrorCategory::RateLimit | ErrorCategory::Network | ErrorCategory::Transient => {
                err.retry_after(category.recommended_delay())
            }
            _ => err,
        }
    }

    /// Classify an HTTP status code returned by a provider API
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        let category = match status {
            429 => ErrorCategory::RateLimit,
            401 | 403 => ErrorCategory::Auth,
            400 | 422 => ErrorCategory::BadRequest,
            404 => ErrorCategory::Unavailable,
            500 | 502 | 503 | 504 | 529 => ErrorCategory::Transient,
            _ => ErrorCategory::Unknown,
        };
        let err = LlmError::new(category, message).provider(provider);
        if category.is_retryable() {
            err.retry_after(category.recommended_delay())
        } else {
            err
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum DocError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// Categorized provider failure
    #[error("LLM error: {0}")]
    Llm(LlmError),

    /// Uncategorized provider failure
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// Provider output could not be coerced into the requested artifact
    #[error("Generated {artifact} does not match its schema: {message}")]
    Schema {
        artifact: &'static str,
        message: String,
    },

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<LlmError> for DocError {
    fn from(err: LlmError) -> Self {
        DocError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, DocError>;

impl DocError {
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn schema(artifact: &'static str, message: impl Into<String>) -> Self {
        Self::Schema {
            artifact,
            message: message.into(),
        }
    }

    /// Classify this error for the generator's retry policy
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Llm(e) => e.category,
            Self::LlmApi(msg) => ErrorClassifier::classify(msg, "unknown").category,
            Self::Timeout { .. } => ErrorCategory::Network,
            Self::Schema { .. } | Self::Json(_) => ErrorCategory::ParseError,
            Self::Config(_) | Self::InvalidInput(_) => ErrorCategory::BadRequest,
            Self::Io(_) | Self::Toml(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether the generator may retry the request that produced this error
    pub fn is_transient(&self) -> bool {
        self.category().is_retryable()
    }

    /// Minimum wait the provider asked for before the next request
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Llm(e) => e.retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::ParseError.to_string(), "PARSE_ERROR");
    }

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::RateLimit.is_retryable());
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::ParseError.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::BadRequest.is_retryable());
        assert!(!ErrorCategory::TokenLimit.is_retryable());
    }

    #[test]
    fn test_classify_messages() {
        let cases = [
            ("Rate limit exceeded, slow down", ErrorCategory::RateLimit),
            ("This model's maximum context length is 8192", ErrorCategory::TokenLimit),
            ("Incorrect API key provided", ErrorCategory::Auth),
            ("Connection refused", ErrorCategory::Network),
            ("Service unavailable", ErrorCategory::Unavailable),
            ("Failed to parse response body", ErrorCategory::ParseError),
            ("Server overloaded", ErrorCategory::Transient),
            ("Something odd happened", ErrorCategory::Unknown),
        ];
        for (message, expected) in cases {
            let err = ErrorClassifier::classify(message, "openai");
            assert_eq!(err.category, expected, "message: {message}");
        }
    }

    #[test]
    fn test_classify_http_status() {
        let err = ErrorClassifier::classify_http_status(429, "slow down", "openai");
        assert_eq!(err.category, ErrorCategory::RateLimit);
        assert!(err.retry_after.is_some());

        let err = ErrorClassifier::classify_http_status(401, "nope", "openai");
        assert_eq!(err.category, ErrorCategory::Auth);
        assert!(err.retry_after.is_none());

        let err = ErrorClassifier::classify_http_status(503, "busy", "openai");
        assert_eq!(err.category, ErrorCategory::Transient);
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::new(ErrorCategory::Auth, "bad key").provider("openai");
        assert_eq!(err.to_string(), "[openai:AUTH] bad key");

        let err = LlmError::new(ErrorCategory::Network, "down");
        assert_eq!(err.to_string(), "[NETWORK] down");
    }

    #[test]
    fn test_doc_error_transient() {
        assert!(DocError::timeout("outline", Duration::from_secs(1)).is_transient());
        assert!(DocError::schema("outline", "missing title").is_transient());
        assert!(!DocError::Config("bad".into()).is_transient());
        assert!(
            !DocError::Llm(LlmError::new(ErrorCategory::Auth, "denied")).is_transient()
        );
    }

    #[test]
    fn test_retry_after_hint_from_rate_limit_status() {
        let err: DocError = ErrorClassifier::classify_http_status(429, "slow down", "openai").into();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(DocError::LlmApi("429".into()).retry_after(), None);
        assert_eq!(
            DocError::Llm(LlmError::new(ErrorCategory::RateLimit, "x")).retry_after(),
            None
        );
    }
}
