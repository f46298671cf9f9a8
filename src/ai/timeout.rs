//! Timeout helper for provider calls.

use std::future::Future;
use std::time::Duration;

use crate::types::{DocError, Result};

/// Run `future`, failing with [`DocError::Timeout`] after `timeout`
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(DocError::timeout(operation_name, timeout)),
    }
}
