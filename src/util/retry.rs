//! Timing primitives for talking to flaky external systems.
//!
//! Every multi-step protocol in the crate (storage reads, renderer
//! initialization, scene restore) is bounded by [`with_timeout`] and retried
//! through [`Retry`].

use std::future::Future;
use std::time::Duration;

/// Error raised when [`with_timeout`] gives up waiting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TimedOut {
    pub message: String,
    pub after: Duration,
}

/// Suspend the caller for `duration`. Never fails.
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Race `task` against a timer.
///
/// The timer is dropped as soon as the call settles, whichever side wins.
/// Losing the race only stops the wait: whatever external operation the task
/// was waiting on keeps going on its own.
pub async fn with_timeout<F, T, E>(task: F, timeout: Duration, message: &str) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimedOut>,
{
    match tokio::time::timeout(timeout, task).await {
        Ok(result) => result,
        Err(_) => Err(TimedOut {
            message: message.to_string(),
            after: timeout,
        }
        .into()),
    }
}

/// Attempt budget and backoff curve for [`Retry`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retries: u32,
    /// Wait after the first failed attempt.
    pub delay: Duration,
    /// Multiplier applied per attempt (`delay * factor^attempt`).
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            delay: Duration::from_millis(300),
            backoff_factor: 1.5,
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self {
            retries,
            delay,
            ..Self::default()
        }
    }

    /// Fixed delay between attempts.
    pub fn fixed(retries: u32, delay: Duration) -> Self {
        Self {
            retries,
            delay,
            backoff_factor: 1.0,
        }
    }

    pub fn with_backoff(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Wait applied after the failed attempt with index `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let millis = self.delay.as_millis() as f64 * self.backoff_factor.powi(attempt as i32);
        Duration::from_millis(millis.round().max(0.0) as u64)
    }
}

type ShouldRetry<'a, E> = Box<dyn Fn(&E, u32) -> bool + Send + Sync + 'a>;
type OnRetry<'a, E> = Box<dyn Fn(&E, u32) + Send + Sync + 'a>;

/// Retry driver with optional predicates.
///
/// ```no_run
/// # use std::time::Duration;
/// # use ggbpuppy::util::retry::{Retry, RetryPolicy};
/// # async fn demo() -> Result<u32, std::io::Error> {
/// Retry::new(RetryPolicy::new(3, Duration::from_millis(100)))
///     .on_retry(|err, attempt| tracing::warn!(attempt, error = %err, "retrying"))
///     .run(|_attempt| async { Ok::<_, std::io::Error>(42) })
///     .await
/// # }
/// ```
pub struct Retry<'a, E> {
    policy: RetryPolicy,
    should_retry: ShouldRetry<'a, E>,
    on_retry: Option<OnRetry<'a, E>>,
}

impl<'a, E> Retry<'a, E> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            should_retry: Box::new(|_, _| true),
            on_retry: None,
        }
    }

    /// Decide per failure whether another attempt is worth it.
    pub fn should_retry(mut self, predicate: impl Fn(&E, u32) -> bool + Send + Sync + 'a) -> Self {
        self.should_retry = Box::new(predicate);
        self
    }

    /// Observe each retry. Receives the failure and the index of the upcoming attempt.
    pub fn on_retry(mut self, observer: impl Fn(&E, u32) + Send + Sync + 'a) -> Self {
        self.on_retry = Some(Box::new(observer));
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `task(attempt)` until it succeeds or the budget is spent.
    pub async fn run<T, F, Fut>(&self, mut task: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            let error = match task(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if attempt >= self.policy.retries || !(self.should_retry)(&error, attempt) {
                return Err(error);
            }

            if let Some(on_retry) = &self.on_retry {
                on_retry(&error, attempt + 1);
            }

            sleep(self.policy.delay_for(attempt)).await;
            attempt += 1;
        }
    }
}

/// Shorthand for [`Retry::run`] without predicates.
pub async fn retry_async<T, E, F, Fut>(policy: RetryPolicy, task: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    Retry::new(policy).run(task).await
}
