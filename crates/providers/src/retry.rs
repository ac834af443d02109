//! Rate-limit retry — sleep for the service-specified backoff and reissue.
//!
//! Wraps any provider. A [`ProviderError::RateLimited`] response puts the
//! caller to sleep for `retry_after_secs` and sends the identical request
//! again. Every other error is returned on the spot; this is the only retry
//! policy in the system.
//!
//! The reference deployment retries forever. A cap can be configured for
//! multi-tenant hosting, in which case the last rate-limit error is returned
//! once the cap is spent.

use async_trait::async_trait;
use patentrag_core::error::ProviderError;
use patentrag_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// A provider that transparently retries rate-limited requests.
pub struct RateLimitRetry {
    name: String,
    inner: Arc<dyn Provider>,
    max_retries: Option<u32>,
}

impl RateLimitRetry {
    /// Wrap `inner`, retrying without limit.
    pub fn new(inner: Arc<dyn Provider>) -> Self {
        Self {
            name: format!("{}+retry", inner.name()),
            inner,
            max_retries: None,
        }
    }

    /// Stop after `max` rate-limited retries. `None` retries forever.
    pub fn with_max_retries(mut self, max: Option<u32>) -> Self {
        self.max_retries = max;
        self
    }

    async fn backoff(&self, attempt: u32, err: ProviderError) -> Result<(), ProviderError> {
        let retry_after_secs = match err {
            ProviderError::RateLimited { retry_after_secs } => retry_after_secs,
            other => return Err(other),
        };
        if self.max_retries.is_some_and(|max| attempt >= max) {
            warn!(provider = %self.inner.name(), attempts = attempt, "Rate limited, retry budget spent");
            return Err(ProviderError::RateLimited { retry_after_secs });
        }
        warn!(
            provider = %self.inner.name(),
            retry_after_secs,
            attempt = attempt + 1,
            "Rate-limited, sleeping before retry"
        );
        tokio::time::sleep(Duration::from_secs(retry_after_secs)).await;
        Ok(())
    }
}

#[async_trait]
impl Provider for RateLimitRetry {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.inner.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => self.backoff(attempt, e).await?,
            }
            attempt += 1;
        }
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.inner.embed(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => self.backoff(attempt, e).await?,
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patentrag_core::message::Message;
    use std::sync::Mutex;

    /// Fails with the scripted errors in order, then answers.
    struct FlakyProvider {
        errors: Mutex<Vec<ProviderError>>,
        calls: Mutex<usize>,
    }

    impl FlakyProvider {
        fn new(errors: Vec<ProviderError>) -> Self {
            Self {
                errors: Mutex::new(errors),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Provider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            let mut errors = self.errors.lock().unwrap();
            if !errors.is_empty() {
                return Err(errors.remove(0));
            }
            Ok(ProviderResponse {
                message: Message::assistant("ok"),
                usage: None,
                model: request.model,
            })
        }
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "m".into(),
            messages: vec![Message::user("hi")],
            temperature: 0.0,
            max_tokens: None,
        }
    }

    fn limited(secs: u64) -> ProviderError {
        ProviderError::RateLimited { retry_after_secs: secs }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_rate_limits_until_success() {
        let inner = Arc::new(FlakyProvider::new(vec![limited(5), limited(30)]));
        let provider = RateLimitRetry::new(inner.clone());

        let started = tokio::time::Instant::now();
        let response = provider.complete(request()).await.unwrap();

        assert_eq!(response.message.content, "ok");
        assert_eq!(inner.calls(), 3);
        assert!(started.elapsed() >= Duration::from_secs(35));
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_propagate_immediately() {
        let inner = Arc::new(FlakyProvider::new(vec![ProviderError::ApiError {
            status_code: 500,
            message: "boom".into(),
        }]));
        let provider = RateLimitRetry::new(inner.clone());

        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 500, .. }));
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cap_returns_last_rate_limit() {
        let inner = Arc::new(FlakyProvider::new(vec![limited(1), limited(1), limited(1)]));
        let provider = RateLimitRetry::new(inner.clone()).with_max_retries(Some(2));

        let err = provider.complete(request()).await.unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(inner.calls(), 3);
    }

    #[test]
    fn name_mentions_inner_provider() {
        let provider = RateLimitRetry::new(Arc::new(FlakyProvider::new(vec![])));
        assert_eq!(provider.name(), "flaky+retry");
    }
}
