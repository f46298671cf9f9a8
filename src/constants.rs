//! Global Constants
//!
//! Tuning values shared by configuration defaults and the runtime.

/// Draft/validate loop defaults
pub mod workflow {
    /// Maximum outline drafts before reporting failure
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// Deepest outline nesting accepted from a generator
    pub const DEFAULT_MAX_OUTLINE_DEPTH: usize = 8;

    /// Capacity of the progress event channel
    pub const PROGRESS_CHANNEL_CAPACITY: usize = 64;

    /// Prefix of the text returned when the retry budget runs out
    pub const EXHAUSTED_PREFIX: &str = "Failed to create satisfactory outline.";
}

/// Generation port defaults
pub mod generation {
    /// Extra attempts for retryable provider failures
    pub const DEFAULT_TRANSIENT_RETRIES: usize = 2;

    /// Initial backoff between transient retries (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Backoff ceiling (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Default completion token cap
    pub const DEFAULT_MAX_TOKENS: usize = 8192;
}
