//! Resilient extraction client wrapper with exponential backoff retry
//!
//! Wraps any ImageExtractionPort with retry logic bounded by total elapsed time
//! rather than attempt count. OCR and structured extraction carry their own
//! budgets.

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::infrastructure::ports::{
    ExtractionError, ImageExtractionPort, StructuredExtractionRequest,
};

// Lower-cased fragments of error messages that are worth another attempt.
const TRANSIENT_MESSAGE_PATTERNS: &[&str] = &[
    "retry",
    "rate limit",
    "server error",
    "temporary",
    "content policy",
    "refusal",
    "error occurred while processing",
];

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Base delay in milliseconds before first retry
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,
    /// Jitter factor (0.0-1.0) for randomizing delays to prevent thundering herd
    pub jitter_factor: f64,
    /// No retry is scheduled once this much time has passed since the first attempt
    pub max_elapsed: Duration,
}

impl RetryConfig {
    pub fn for_text() -> Self {
        Self {
            max_elapsed: Duration::from_secs(120),
            ..Self::default()
        }
    }

    pub fn for_structured() -> Self {
        Self {
            max_elapsed: Duration::from_secs(180),
            ..Self::default()
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            jitter_factor: 0.2,
            max_elapsed: Duration::from_secs(120),
        }
    }
}

/// Wrapper that adds retry logic to any extraction client
pub struct ResilientExtractionClient {
    inner: Arc<dyn ImageExtractionPort>,
    text_config: RetryConfig,
    structured_config: RetryConfig,
}

impl ResilientExtractionClient {
    pub fn new(inner: Arc<dyn ImageExtractionPort>) -> Self {
        Self::with_configs(inner, RetryConfig::for_text(), RetryConfig::for_structured())
    }

    pub fn with_configs(
        inner: Arc<dyn ImageExtractionPort>,
        text_config: RetryConfig,
        structured_config: RetryConfig,
    ) -> Self {
        Self {
            inner,
            text_config,
            structured_config,
        }
    }

    async fn execute_with_retry<F, Fut>(
        &self,
        operation_name: &str,
        config: &RetryConfig,
        operation: F,
    ) -> Result<String, ExtractionError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<String, ExtractionError>>,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let error = match operation().await {
                Ok(text) => {
                    if attempt > 1 {
                        tracing::info!(
                            attempt,
                            operation = operation_name,
                            "Extraction succeeded after retry"
                        );
                    }
                    return Ok(text);
                }
                Err(e) => e,
            };

            if !is_retryable(&error) {
                tracing::error!(
                    error = %error,
                    operation = operation_name,
                    "Extraction failed with non-retryable error"
                );
                return Err(error);
            }

            let delay = Duration::from_millis(calculate_delay(config, attempt));
            if started.elapsed() + delay > config.max_elapsed {
                tracing::error!(
                    attempts = attempt,
                    error = %error,
                    operation = operation_name,
                    "Extraction failed, retry budget exhausted"
                );
                return Err(ExtractionError::Exhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            tracing::warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                operation = operation_name,
                "Extraction failed, retrying..."
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Calculate delay for a given attempt number using exponential backoff with jitter
fn calculate_delay(config: &RetryConfig, attempt: u32) -> u64 {
    let base = config.base_delay_ms;
    // Exponential: base * 2^(attempt-1)
    let exponential = base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    let capped = exponential.min(config.max_delay_ms);

    let jitter_range = (capped as f64 * config.jitter_factor) as i64;
    if jitter_range > 0 {
        let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
        (capped as i64 + jitter).max(0) as u64
    } else {
        capped
    }
}

fn message_is_transient(message: &str) -> bool {
    let lowered = message.to_lowercase();
    TRANSIENT_MESSAGE_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}

/// Determine if an error is retryable
pub fn is_retryable(error: &ExtractionError) -> bool {
    match error {
        ExtractionError::Network(_) | ExtractionError::Timeout(_) => true,
        ExtractionError::Refusal(_) => true,
        ExtractionError::Http { status, message } => match status {
            429 => true,
            501 => false,
            500..=599 => true,
            _ => message_is_transient(message),
        },
        ExtractionError::Api { message, .. } => message_is_transient(message),
        ExtractionError::EmptyOutput
        | ExtractionError::InvalidResponse(_)
        | ExtractionError::Image(_)
        | ExtractionError::Exhausted { .. } => false,
    }
}

#[async_trait]
impl ImageExtractionPort for ResilientExtractionClient {
    async fn extract_text(&self, image: &[u8]) -> Result<String, ExtractionError> {
        let inner = Arc::clone(&self.inner);
        self.execute_with_retry("extract_text", &self.text_config, || {
            let inner = Arc::clone(&inner);
            async move { inner.extract_text(image).await }
        })
        .await
    }

    async fn extract_structured(
        &self,
        request: &StructuredExtractionRequest,
    ) -> Result<String, ExtractionError> {
        let inner = Arc::clone(&self.inner);
        self.execute_with_retry("extract_structured", &self.structured_config, || {
            let inner = Arc::clone(&inner);
            async move { inner.extract_structured(request).await }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Mock extractor that fails a configurable number of times before succeeding
    struct FailingMockExtractor {
        failures_remaining: AtomicU32,
        calls: AtomicU32,
        error_type: ExtractionError,
    }

    impl FailingMockExtractor {
        fn new(failure_count: u32, error: ExtractionError) -> Self {
            Self {
                failures_remaining: AtomicU32::new(failure_count),
                calls: AtomicU32::new(0),
                error_type: error,
            }
        }

        fn attempt(&self) -> Result<String, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures_remaining.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
                Err(self.error_type.clone())
            } else {
                Ok("{\"ok\":true}".to_string())
            }
        }
    }

    #[async_trait]
    impl ImageExtractionPort for FailingMockExtractor {
        async fn extract_text(&self, _image: &[u8]) -> Result<String, ExtractionError> {
            self.attempt()
        }

        async fn extract_structured(
            &self,
            _request: &StructuredExtractionRequest,
        ) -> Result<String, ExtractionError> {
            self.attempt()
        }
    }

    fn fast_config() -> RetryConfig {
        RetryConfig {
            base_delay_ms: 1,
            max_delay_ms: 10,
            jitter_factor: 0.0,
            max_elapsed: Duration::from_secs(5),
        }
    }

    fn client(mock: Arc<FailingMockExtractor>, config: RetryConfig) -> ResilientExtractionClient {
        ResilientExtractionClient::with_configs(mock, config.clone(), config)
    }

    #[tokio::test]
    async fn test_succeeds_without_retry() {
        let mock = Arc::new(FailingMockExtractor::new(0, ExtractionError::EmptyOutput));
        let result = client(Arc::clone(&mock), fast_config())
            .extract_text(b"img")
            .await;

        assert_eq!(result.unwrap(), "{\"ok\":true}");
        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let error = ExtractionError::Http {
            status: 429,
            message: "Too many requests".into(),
        };
        let mock = Arc::new(FailingMockExtractor::new(2, error));
        let result = client(Arc::clone(&mock), fast_config())
            .extract_structured(&StructuredExtractionRequest::default())
            .await;

        assert!(result.is_ok());
        assert_eq!(mock.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_refusals_are_retried() {
        let mock = Arc::new(FailingMockExtractor::new(
            4,
            ExtractionError::Refusal("I'm sorry, but I can't help with that.".into()),
        ));
        let result = client(Arc::clone(&mock), fast_config())
            .extract_structured(&StructuredExtractionRequest::default())
            .await;

        assert!(result.is_ok());
        assert_eq!(mock.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_no_retry_on_bad_request() {
        let error = ExtractionError::Http {
            status: 400,
            message: "Invalid image payload".into(),
        };
        let mock = Arc::new(FailingMockExtractor::new(10, error));
        let result = client(Arc::clone(&mock), fast_config())
            .extract_text(b"img")
            .await;

        assert!(matches!(result, Err(ExtractionError::Http { status: 400, .. })));
        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_when_elapsed_budget_is_spent() {
        let mock = Arc::new(FailingMockExtractor::new(
            1000,
            ExtractionError::Network("connection reset".into()),
        ));
        let config = RetryConfig {
            base_delay_ms: 20,
            max_delay_ms: 20,
            jitter_factor: 0.0,
            max_elapsed: Duration::from_millis(100),
        };
        let result = client(Arc::clone(&mock), config).extract_text(b"img").await;

        match result {
            Err(ExtractionError::Exhausted { attempts, last }) => {
                assert!(attempts >= 2);
                assert!(attempts <= 6);
                assert!(matches!(*last, ExtractionError::Network(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classifier() {
        let http = |status: u16, message: &str| ExtractionError::Http {
            status,
            message: message.to_string(),
        };
        assert!(is_retryable(&http(429, "")));
        assert!(is_retryable(&http(500, "")));
        assert!(is_retryable(&http(502, "")));
        assert!(is_retryable(&http(503, "")));
        assert!(!is_retryable(&http(501, "not implemented")));
        assert!(!is_retryable(&http(401, "Incorrect API key")));
        assert!(is_retryable(&http(400, "Please retry your request")));
        assert!(is_retryable(&ExtractionError::Api {
            error_type: "server_error".into(),
            message: "An error occurred while processing your request.".into(),
        }));
        assert!(!is_retryable(&ExtractionError::EmptyOutput));
        assert!(!is_retryable(&ExtractionError::InvalidResponse("eof".into())));
        assert!(is_retryable(&ExtractionError::Timeout(Duration::from_secs(45))));
    }

    #[test]
    fn test_exponential_backoff() {
        let config = RetryConfig {
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            jitter_factor: 0.0,
            max_elapsed: Duration::from_secs(120),
        };

        assert_eq!(calculate_delay(&config, 1), 1000);
        assert_eq!(calculate_delay(&config, 2), 2000);
        assert_eq!(calculate_delay(&config, 3), 4000);
        assert_eq!(calculate_delay(&config, 5), 16000);
        assert_eq!(calculate_delay(&config, 6), 30000);
    }

    #[test]
    fn test_budgets_differ_by_operation() {
        assert_eq!(RetryConfig::for_text().max_elapsed, Duration::from_secs(120));
        assert_eq!(
            RetryConfig::for_structured().max_elapsed,
            Duration::from_secs(180)
        );
    }
}
