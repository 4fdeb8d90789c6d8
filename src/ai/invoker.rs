use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use super::adapter::GenerativeModel;
use crate::error::ModelError;

/// Primary/fallback model selection. The fallback is tried exactly once,
/// only after the primary fails in a retryable way, and never concurrently
/// with it (racing would double-bill a paid quota).
pub struct ModelInvoker {
    primary: Box<dyn GenerativeModel>,
    fallback: Box<dyn GenerativeModel>,
    attempt_timeout: Duration,
}

impl ModelInvoker {
    pub fn new(
        primary: Box<dyn GenerativeModel>,
        fallback: Box<dyn GenerativeModel>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            attempt_timeout,
        }
    }

    pub async fn invoke(&self, prompt: &str) -> Result<String, ModelError> {
        match self.attempt(self.primary.as_ref(), prompt).await {
            Ok(text) => Ok(text),
            Err(primary_err) if primary_err.is_retryable() => {
                warn!(
                    model = self.primary.name(),
                    fallback = self.fallback.name(),
                    error = %primary_err,
                    "primary model failed, trying fallback"
                );
                self.attempt(self.fallback.as_ref(), prompt)
                    .await
                    .map_err(|fallback_err| ModelError::Unavailable {
                        primary: primary_err.to_string(),
                        fallback: fallback_err.to_string(),
                    })
            }
            Err(e) => Err(e),
        }
    }

    async fn attempt(
        &self,
        model: &dyn GenerativeModel,
        prompt: &str,
    ) -> Result<String, ModelError> {
        match timeout(self.attempt_timeout, model.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    enum Behavior {
        Succeed(&'static str),
        Fail(fn() -> ModelError),
        Hang,
    }

    struct FakeModel {
        name: &'static str,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    impl FakeModel {
        fn boxed(
            name: &'static str,
            behavior: Behavior,
        ) -> (Box<dyn GenerativeModel>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let model = Box::new(FakeModel {
                name,
                behavior,
                calls: calls.clone(),
            });
            (model, calls)
        }
    }

    #[async_trait]
    impl GenerativeModel for FakeModel {
        fn name(&self) -> &str {
            self.name
        }

        async fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Succeed(text) => Ok((*text).to_owned()),
                Behavior::Fail(make) => Err(make()),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!()
                }
            }
        }
    }

    fn invoker(
        primary: Box<dyn GenerativeModel>,
        fallback: Box<dyn GenerativeModel>,
    ) -> ModelInvoker {
        ModelInvoker::new(primary, fallback, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let (primary, primary_calls) = FakeModel::boxed("p", Behavior::Succeed("ok"));
        let (fallback, fallback_calls) = FakeModel::boxed("f", Behavior::Succeed("unused"));

        let result = invoker(primary, fallback).invoke("prompt").await.unwrap();
        assert_eq!(result, "ok");
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_quota_failure_falls_back_exactly_once() {
        let (primary, primary_calls) =
            FakeModel::boxed("p", Behavior::Fail(|| ModelError::Quota { retry_after: None }));
        let (fallback, fallback_calls) = FakeModel::boxed("f", Behavior::Succeed("from fallback"));

        let result = invoker(primary, fallback).invoke("prompt").await.unwrap();
        assert_eq!(result, "from fallback");
        // The primary is never retried; the fallback runs once, after it.
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_propagates_without_fallback() {
        let (primary, _) =
            FakeModel::boxed("p", Behavior::Fail(|| ModelError::Auth("bad key".to_owned())));
        let (fallback, fallback_calls) = FakeModel::boxed("f", Behavior::Succeed("unused"));

        let err = invoker(primary, fallback).invoke("prompt").await.unwrap_err();
        assert!(matches!(err, ModelError::Auth(_)));
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_both_failing_yields_unavailable() {
        let (primary, _) = FakeModel::boxed(
            "p",
            Behavior::Fail(|| ModelError::Transient("503".to_owned())),
        );
        let (fallback, _) = FakeModel::boxed(
            "f",
            Behavior::Fail(|| ModelError::Transient("502".to_owned())),
        );

        let err = invoker(primary, fallback).invoke("prompt").await.unwrap_err();
        match err {
            ModelError::Unavailable { primary, fallback } => {
                assert!(primary.contains("503"));
                assert!(fallback.contains("502"));
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_primary_timeout_is_retryable() {
        let (primary, _) = FakeModel::boxed("p", Behavior::Hang);
        let (fallback, fallback_calls) = FakeModel::boxed("f", Behavior::Succeed("rescued"));

        let result = invoker(primary, fallback).invoke("prompt").await.unwrap();
        assert_eq!(result, "rescued");
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_timeout_is_terminal() {
        let (primary, _) = FakeModel::boxed("p", Behavior::Hang);
        let (fallback, _) = FakeModel::boxed("f", Behavior::Hang);

        let err = invoker(primary, fallback).invoke("prompt").await.unwrap_err();
        assert!(matches!(err, ModelError::Unavailable { .. }));
    }
}
