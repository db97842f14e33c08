//! Retry policy for chat client calls.
//!
//! Transient transport failures (connection errors, timeouts, empty
//! responses, HTTP 429/5xx) are retried with exponential backoff and
//! jitter; everything else propagates immediately.

use std::future::Future;
use tracing::warn;

use crate::error::{Result, SoulError};

/// Exponential-backoff retry policy for model calls.
///
/// # Example
///
/// ```rust,ignore
/// let policy = RetryPolicy::new().with_max_retries(5).with_base_delay_ms(500);
/// let response = policy.run("openai", || client_call()).await?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts before giving up. Default: 3.
    max_retries: u32,
    /// Base delay in milliseconds for exponential backoff. Default: 1000.
    base_delay_ms: u64,
    /// Maximum delay cap in milliseconds. Default: 30000.
    max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of retry attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay in milliseconds.
    ///
    /// The actual delay for attempt `n` is
    /// `min(base_delay_ms * 2^n + jitter, max_delay_ms)`.
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Set the maximum delay cap in milliseconds.
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Run `op`, retrying transient failures.
    ///
    /// # Arguments
    /// * `client_name` - Client identifier for the retry log line
    /// * `op` - Factory producing a fresh attempt future each call
    ///
    /// # Errors
    ///
    /// The last error once retries are exhausted, or the first
    /// non-retryable error immediately.
    pub async fn run<T, F, Fut>(&self, client_name: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !is_retryable(&err) || attempt == self.max_retries {
                        return Err(err);
                    }
                    warn!(
                        client = client_name,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %err,
                        "Retrying model call after transient error"
                    );
                    delay_with_jitter(attempt, self.base_delay_ms, self.max_delay_ms).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Check whether an error represents a transient failure worth retrying.
pub fn is_retryable(err: &SoulError) -> bool {
    match err {
        SoulError::Client(client_err) => client_err.is_retryable(),
        _ => false,
    }
}

/// Compute and sleep for the backoff delay for a given retry attempt.
///
/// Delay formula: `min(base_delay_ms * 2^attempt + jitter, max_delay_ms)`
///
/// Jitter is derived from the nanosecond component of the system clock,
/// which decorrelates concurrent retries without pulling in `rand`.
///
/// # Arguments
/// * `attempt` - The current retry attempt (0-indexed)
/// * `base_delay_ms` - Base delay in milliseconds
/// * `max_delay_ms` - Maximum delay cap in milliseconds
pub async fn delay_with_jitter(attempt: u32, base_delay_ms: u64, max_delay_ms: u64) {
    let jitter_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64 % (base_delay_ms.max(1)))
        .unwrap_or(0);

    let delay = compute_delay(attempt, base_delay_ms, max_delay_ms, jitter_ms);
    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
}

/// Compute the backoff delay for a given attempt (without sleeping).
///
/// # Arguments
/// * `attempt` - The current retry attempt (0-indexed)
/// * `base_delay_ms` - Base delay in milliseconds
/// * `max_delay_ms` - Maximum delay cap in milliseconds
/// * `jitter_ms` - Jitter value to add
///
/// # Returns
/// The computed delay in milliseconds.
pub fn compute_delay(attempt: u32, base_delay_ms: u64, max_delay_ms: u64, jitter_ms: u64) -> u64 {
    let exponential = base_delay_ms.saturating_mul(1u64 << attempt.min(16));
    exponential.saturating_add(jitter_ms).min(max_delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{classify_status, ClientError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_policy_defaults_and_builder() {
        let policy = RetryPolicy::new();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay_ms, 1000);
        assert_eq!(policy.max_delay_ms, 30_000);

        let policy = RetryPolicy::new()
            .with_max_retries(5)
            .with_base_delay_ms(500)
            .with_max_delay_ms(60_000);
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay_ms, 500);
        assert_eq!(policy.max_delay_ms, 60_000);
    }

    #[test]
    fn test_is_retryable_classification() {
        assert!(is_retryable(&SoulError::Client(classify_status(503, "x"))));
        assert!(is_retryable(&SoulError::Client(ClientError::EmptyResponse)));
        assert!(!is_retryable(&SoulError::Client(classify_status(401, "x"))));
        assert!(!is_retryable(&SoulError::Config("bad".into())));
        assert!(!is_retryable(&SoulError::Tool("boom".into())));
    }

    #[test]
    fn test_delay_calculation() {
        assert_eq!(compute_delay(0, 1000, 30_000, 0), 1000);
        assert_eq!(compute_delay(1, 1000, 30_000, 0), 2000);
        assert_eq!(compute_delay(2, 1000, 30_000, 0), 4000);
        assert_eq!(compute_delay(3, 1000, 30_000, 0), 8000);
    }

    #[test]
    fn test_delay_calculation_with_jitter() {
        assert_eq!(compute_delay(1, 1000, 30_000, 200), 2200);
    }

    #[test]
    fn test_delay_calculation_capped_at_max() {
        assert_eq!(compute_delay(10, 1000, 30_000, 0), 30_000);
        assert_eq!(compute_delay(10, 1000, 30_000, 5000), 30_000);
    }

    #[tokio::test]
    async fn test_run_succeeds_first_try() {
        let policy = RetryPolicy::new().with_base_delay_ms(1).with_max_delay_ms(5);
        let result = policy.run("test", || async { Ok::<_, SoulError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_run_retries_503_then_succeeds() {
        let policy = RetryPolicy::new()
            .with_max_retries(3)
            .with_base_delay_ms(1)
            .with_max_delay_ms(5);
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result = policy
            .run("test", move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(SoulError::Client(classify_status(503, "overloaded")))
                    } else {
                        Ok("recovered")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_no_retry_on_401() {
        let policy = RetryPolicy::new().with_base_delay_ms(1).with_max_delay_ms(5);
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result: Result<()> = policy
            .run("test", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(SoulError::Client(classify_status(401, "bad key")))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_exhausts_retries() {
        let policy = RetryPolicy::new()
            .with_max_retries(2)
            .with_base_delay_ms(1)
            .with_max_delay_ms(5);
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let result: Result<()> = policy
            .run("test", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(SoulError::Client(classify_status(429, "quota")))
                }
            })
            .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("429"));
        // Initial attempt plus two retries.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
