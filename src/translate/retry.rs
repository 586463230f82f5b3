use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use super::{BackendKind, TranslatorBackend};

/// Backoff schedule: 2^attempt seconds plus a fixed per-backend offset.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_offset: Duration,
}

impl RetryPolicy {
    pub fn with_backoff(max_attempts: u32, backoff_offset: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_offset,
        }
    }

    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            backoff_offset: Duration::ZERO,
        }
    }

    fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_secs(1u64 << attempt.min(16)) + self.backoff_offset
    }
}

/// A backend bound to its retry policy. Per-paragraph failures degrade to
/// the backend's placeholder string; this layer never returns an error.
pub struct RetryingTranslator {
    inner: Arc<dyn TranslatorBackend>,
    policy: RetryPolicy,
}

impl RetryingTranslator {
    pub fn new(inner: Arc<dyn TranslatorBackend>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    /// Translate one paragraph, retrying transient failures with backoff.
    /// Returns the translation, or the placeholder once attempts run out
    /// or a permanent failure is seen.
    pub async fn translate_or_placeholder(&self, text: &str) -> String {
        let kind = self.inner.kind();

        for attempt in 0..self.policy.max_attempts {
            match self.inner.translate(text).await {
                Ok(translation) => return translation,
                Err(failure) if !failure.is_transient() => {
                    error!("{} failed permanently: {}", kind.label(), failure);
                    return kind.placeholder().to_string();
                }
                Err(failure) => {
                    warn!(
                        "{} attempt {}/{} failed: {}",
                        kind.label(),
                        attempt + 1,
                        self.policy.max_attempts,
                        failure
                    );
                    if attempt + 1 < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.delay_after(attempt)).await;
                    }
                }
            }
        }

        error!(
            "{} failed after {} attempts",
            kind.label(),
            self.policy.max_attempts
        );
        kind.placeholder().to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::translate::TranslationFailure;

    struct FlakyBackend {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyBackend {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl TranslatorBackend for FlakyBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Llm
        }

        async fn translate(&self, text: &str) -> Result<String, TranslationFailure> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(TranslationFailure::Network("connection reset".to_string()))
            } else {
                Ok(format!("translated: {}", text))
            }
        }
    }

    struct PermanentlyBroken {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TranslatorBackend for PermanentlyBroken {
        fn kind(&self) -> BackendKind {
            BackendKind::Cloud
        }

        async fn translate(&self, _text: &str) -> Result<String, TranslationFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TranslationFailure::Api {
                status: 401,
                message: "invalid key".to_string(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_within_attempt_budget() {
        let backend = Arc::new(FlakyBackend::new(2));
        let translator = RetryingTranslator::new(
            backend.clone(),
            RetryPolicy::with_backoff(3, Duration::ZERO),
        );

        let result = translator.translate_or_placeholder("Section 1.").await;
        assert_eq!(result, "translated: Section 1.");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_yields_placeholder() {
        let backend = Arc::new(FlakyBackend::new(3));
        let translator = RetryingTranslator::new(
            backend.clone(),
            RetryPolicy::with_backoff(3, Duration::ZERO),
        );

        let result = translator.translate_or_placeholder("Section 1.").await;
        assert_eq!(result, BackendKind::Llm.placeholder());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_stops_after_one_attempt() {
        let backend = Arc::new(PermanentlyBroken {
            calls: AtomicU32::new(0),
        });
        let translator = RetryingTranslator::new(
            backend.clone(),
            RetryPolicy::with_backoff(3, Duration::from_secs(1)),
        );

        let result = translator.translate_or_placeholder("Section 1.").await;
        assert_eq!(result, BackendKind::Cloud.placeholder());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_single_attempt_policy() {
        let policy = RetryPolicy::single_attempt();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff_offset, Duration::ZERO);
    }

    #[test]
    fn test_backoff_grows_with_offset() {
        let policy = RetryPolicy::with_backoff(3, Duration::from_secs(1));
        assert_eq!(policy.delay_after(0), Duration::from_secs(2));
        assert_eq!(policy.delay_after(1), Duration::from_secs(3));
        assert_eq!(policy.delay_after(2), Duration::from_secs(5));
    }
}
