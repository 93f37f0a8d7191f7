//! Retry-with-backoff for chat calls
//!
//! Only rate-limit failures are retried, with exponentially growing delays
//! (`base_delay * 2^attempt`). Everything else propagates on first failure.

use crate::provider::{is_rate_limited, ChatCapability, ChatOptions, ChatReply};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use undercover_error::{Error, Result};

/// How often and how patiently to retry
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Upper bound on a single attempt; `None` waits indefinitely
    pub call_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            call_timeout: None,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Run `op` until it succeeds, fails with a non-rate-limit error, or the
/// attempts are used up. An exhausted rate limit comes back persistent.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let outcome = match policy.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, op()).await {
                Ok(result) => result,
                Err(_) => Err(Error::timeout(limit.as_secs_f64()).with_operation("retry")),
            },
            None => op().await,
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(err) if is_rate_limited(&err) && attempt + 1 < attempts => {
                let delay = policy.delay_for(attempt);
                log::warn!(
                    "[retry] rate limited (attempt {}/{}), backing off {:?}",
                    attempt + 1,
                    attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) if is_rate_limited(&err) => {
                log::warn!("[retry] still rate limited after {} attempts", attempts);
                return Err(err.persist());
            }
            Err(err) => return Err(err),
        }
    }
}

/// Decorator applying a [`RetryPolicy`] to every call of the wrapped capability
pub struct Retrying {
    inner: Arc<dyn ChatCapability>,
    policy: RetryPolicy,
}

impl Retrying {
    pub fn new(inner: Arc<dyn ChatCapability>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl ChatCapability for Retrying {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn models(&self) -> Vec<String> {
        self.inner.models()
    }

    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        options: &ChatOptions,
    ) -> Result<String> {
        retry_with_backoff(&self.policy, || {
            self.inner.complete(model, system_prompt, user_prompt, options)
        })
        .await
    }

    async fn chat(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        options: &ChatOptions,
    ) -> Result<ChatReply> {
        retry_with_backoff(&self.policy, || {
            self.inner.chat(model, system_prompt, user_prompt, options)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChat;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use undercover_error::{ErrorKind, ErrorStatus};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new().with_base_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn test_recovers_after_rate_limits() {
        let mock = Arc::new(
            MockChat::new()
                .fail(Error::rate_limited("mock"))
                .fail(Error::rate_limited("mock"))
                .reply("ok"),
        );
        let chat = Retrying::new(mock.clone(), fast_policy());

        let text = chat
            .complete("m", "sys", "user", &ChatOptions::new())
            .await
            .unwrap();
        assert_eq!(text, "ok");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mock = Arc::new(
            MockChat::new()
                .fail(Error::rate_limited("mock"))
                .fail(Error::rate_limited("mock"))
                .fail(Error::rate_limited("mock"))
                .reply("too late"),
        );
        let chat = Retrying::new(mock.clone(), fast_policy());

        let err = chat
            .complete("m", "sys", "user", &ChatOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.status(), ErrorStatus::Persistent);
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_other_errors_fail_fast() {
        let mock = Arc::new(
            MockChat::new()
                .fail(Error::network_failed("connection refused"))
                .reply("unused"),
        );
        let chat = Retrying::new(mock.clone(), fast_policy());

        let err = chat
            .complete("m", "sys", "user", &ChatOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkFailed);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_tag_in_message_is_retried() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&fast_policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(Error::api_failed(503, "upstream rate limit hit"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout_is_transport_error() {
        let mock = Arc::new(
            MockChat::new()
                .with_latency(Duration::from_millis(50))
                .reply("slow"),
        );
        let policy = fast_policy().with_call_timeout(Duration::from_millis(10));
        let chat = Retrying::new(mock.clone(), policy);

        let err = chat
            .complete("m", "sys", "user", &ChatOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.kind().is_transport());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_chat_parses_json_through_decorator() {
        let mock = Arc::new(
            MockChat::new()
                .fail(Error::rate_limited("mock"))
                .reply("```json\n{\"vote\": 4}\n```"),
        );
        let chat = Retrying::new(mock, fast_policy());

        let reply = chat
            .chat("m", "sys", "user", &ChatOptions::new().json())
            .await
            .unwrap();
        assert_eq!(reply, ChatReply::Json(json!({"vote": 4})));
    }
}
