//! Retry wrappers for upstream collaborators.
//!
//! Transient failures (transport errors, 429, 5xx) are retried with
//! exponential backoff. Anything else is returned on the first attempt.

use super::Translator;
use crate::error::UpstreamError;
use crate::language::LanguageDetector;
use async_trait::async_trait;
use profiles_common::TranslationConfig;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Retry budget and backoff bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base backoff delay in milliseconds (doubles with each retry).
    pub base_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff_ms: 100,
            max_backoff_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_backoff_ms: config.base_backoff_ms,
            max_backoff_ms: config.max_backoff_ms,
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff delay before retry number `attempt + 1`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .base_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);
        Duration::from_millis(delay_ms)
    }

    /// Run `call` until it succeeds, fails permanently, or the budget is spent.
    pub async fn run<T, F, Fut>(&self, service: &str, mut call: F) -> Result<T, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(
                            service,
                            attempt = attempt + 1,
                            "Upstream call recovered after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.backoff_delay(attempt);
                    tracing::warn!(
                        service,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Upstream call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        tracing::error!(
                            service,
                            attempts = attempt + 1,
                            error = %e,
                            "Upstream call failed, retries exhausted"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Translator that retries transient failures of the wrapped backend.
pub struct RetryingTranslator {
    inner: Arc<dyn Translator>,
    policy: RetryPolicy,
}

impl RetryingTranslator {
    pub fn new(inner: Arc<dyn Translator>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl Translator for RetryingTranslator {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, UpstreamError> {
        let inner = &self.inner;
        self.policy
            .run(inner.name(), move || inner.translate(text, source, target))
            .await
    }
}

/// Language detector that retries transient failures of the wrapped detector.
pub struct RetryingDetector {
    inner: Arc<dyn LanguageDetector>,
    policy: RetryPolicy,
}

impl RetryingDetector {
    pub fn new(inner: Arc<dyn LanguageDetector>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl LanguageDetector for RetryingDetector {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn detect(&self, text: &str) -> Result<String, UpstreamError> {
        let inner = &self.inner;
        self.policy
            .run(inner.name(), move || inner.detect(text))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyTranslator {
        calls: Arc<AtomicUsize>,
        fail_until: usize,
        status: u16,
    }

    impl FlakyTranslator {
        fn new(fail_until: usize, status: u16) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: Arc::clone(&calls),
                    fail_until,
                    status,
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl Translator for FlakyTranslator {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn translate(
            &self,
            text: &str,
            _source: &str,
            _target: &str,
        ) -> Result<String, UpstreamError> {
            let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.fail_until {
                return Err(UpstreamError::Status {
                    service: "flaky".into(),
                    status: self.status,
                    message: "unavailable".into(),
                });
            }
            Ok(format!("translated: {text}"))
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_backoff_ms: 1,
            max_backoff_ms: 10,
        }
    }

    #[tokio::test]
    async fn succeeds_without_retry() {
        let (flaky, calls) = FlakyTranslator::new(0, 503);
        let translator = RetryingTranslator::new(Arc::new(flaky), fast_policy(2));

        let out = translator.translate("hola", "es", "en").await.unwrap();
        assert_eq!(out, "translated: hola");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let (flaky, calls) = FlakyTranslator::new(2, 503);
        let translator = RetryingTranslator::new(Arc::new(flaky), fast_policy(2));

        let out = translator.translate("hola", "es", "en").await.unwrap();
        assert_eq!(out, "translated: hola");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let (flaky, calls) = FlakyTranslator::new(usize::MAX, 503);
        let translator = RetryingTranslator::new(Arc::new(flaky), fast_policy(1));

        let err = translator.translate("hola", "es", "en").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 503, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (flaky, calls) = FlakyTranslator::new(usize::MAX, 400);
        let translator = RetryingTranslator::new(Arc::new(flaky), fast_policy(3));

        assert!(translator.translate("hola", "es", "en").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn detector_retries_transport_errors() {
        struct FlakyDetector {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl LanguageDetector for FlakyDetector {
            fn name(&self) -> &str {
                "flaky-detector"
            }

            async fn detect(&self, _text: &str) -> Result<String, UpstreamError> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(UpstreamError::Transport {
                        service: "flaky-detector".into(),
                        message: "connection reset".into(),
                    });
                }
                Ok("es".into())
            }
        }

        let inner = Arc::new(FlakyDetector {
            calls: AtomicUsize::new(0),
        });
        let detector = RetryingDetector::new(inner.clone(), fast_policy(2));

        assert_eq!(detector.detect("hola").await.unwrap(), "es");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn backoff_doubles_with_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0).as_millis(), 100);
        assert_eq!(policy.backoff_delay(1).as_millis(), 200);
        assert_eq!(policy.backoff_delay(2).as_millis(), 400);
    }

    #[test]
    fn backoff_caps_at_max() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_backoff_ms: 100,
            max_backoff_ms: 500,
        };
        assert_eq!(policy.backoff_delay(20).as_millis(), 500);
    }
}
