//! Deadline, retry, and back-off around a single fallible async action.

use std::future::Future;

use tokio::sync::watch;
use vitals_types::{SampleError, SampleResult, UtcTime};

use crate::backoff::ExponentialBackoff;
use crate::cancel;
use crate::config::PollConfig;

/// Wraps one fallible or slow operation with a per-attempt deadline, a
/// retry budget, and exponential back-off between attempts.
///
/// Cancellation is observed while the action is in flight and while
/// sleeping between retries; it unwinds immediately as
/// [`SampleError::Cancelled`] and is never retried or wrapped.
pub struct Poller {
    config: PollConfig,
}

impl Poller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Run `action` until it succeeds or the retry budget is exhausted.
    ///
    /// A success is returned immediately. A retryable failure (timeout or
    /// retryable collection error) waits out the back-off schedule and
    /// tries again; after `max_retries` attempts (when non-zero), or on
    /// the first non-retryable failure, the last error is surfaced as
    /// [`SampleError::Exhausted`] with the attempt count.
    pub async fn execute<T, F, Fut>(
        &self,
        cancel: &mut watch::Receiver<bool>,
        action: F,
    ) -> SampleResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SampleResult<T>>,
    {
        self.run(cancel, action, |_| true).await
    }

    /// Like [`Poller::execute`], but a success whose value fails
    /// `predicate` counts as a retryable failed attempt.
    ///
    /// This is the escape hatch for delta-based collectors whose first
    /// observation is known to be meaningless: poll until a value passes
    /// the predicate, discarding the ones that do not.
    pub async fn execute_until<T, F, Fut, P>(
        &self,
        cancel: &mut watch::Receiver<bool>,
        action: F,
        predicate: P,
    ) -> SampleResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SampleResult<T>>,
        P: Fn(&T) -> bool,
    {
        self.run(cancel, action, predicate).await
    }

    async fn run<T, F, Fut, P>(
        &self,
        cancel: &mut watch::Receiver<bool>,
        mut action: F,
        predicate: P,
    ) -> SampleResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SampleResult<T>>,
        P: Fn(&T) -> bool,
    {
        let mut backoff = ExponentialBackoff::new(
            self.config.base_interval,
            self.config.max_interval,
            self.config.backoff_factor,
        );
        let mut attempts: u32 = 0;

        loop {
            if cancel::is_cancelled(cancel) {
                return Err(SampleError::Cancelled);
            }

            attempts += 1;
            let attempt_at = UtcTime::now();

            let attempt: SampleResult<T> = tokio::select! {
                biased;
                _ = cancel::cancelled(cancel) => return Err(SampleError::Cancelled),
                res = tokio::time::timeout(self.config.timeout.into(), action()) => {
                    match res {
                        Ok(inner) => inner,
                        Err(_) => Err(SampleError::Timeout {
                            elapsed: self.config.timeout,
                        }),
                    }
                }
            };

            let err = match attempt {
                Ok(value) => {
                    if predicate(&value) {
                        return Ok(value);
                    }
                    SampleError::collection("observation discarded by predicate")
                }
                Err(err) => err,
            };

            if err.is_cancelled() {
                // The action observed the signal itself; re-raise as-is.
                return Err(SampleError::Cancelled);
            }

            let budget_spent = self.config.max_retries != 0 && attempts >= self.config.max_retries;
            if budget_spent || !err.is_retryable() {
                return Err(SampleError::Exhausted {
                    attempts,
                    last_attempt_at: attempt_at,
                    source: Box::new(err),
                });
            }

            let wait = backoff.next_wait();
            tracing::debug!(attempt = attempts, wait = %wait, error = %err, "poll attempt failed, backing off");
            tokio::select! {
                biased;
                _ = cancel::cancelled(cancel) => return Err(SampleError::Cancelled),
                _ = tokio::time::sleep(wait.into()) => {}
            }
        }
    }
}
