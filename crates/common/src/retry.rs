//! Generic retry with exponential backoff.
//!
//! [`RetryPolicy`] describes how often and how long to wait; [`Retrier`]
//! applies a policy to an async operation. Retry eligibility is decided by
//! a predicate over the error (usually
//! [`ErrorClassification::is_retryable`](crate::ErrorClassification)), not
//! by error type downcasting.
//!
//! The delay progression is `delay = min(delay * backoff + jitter,
//! max_delay)`, recomputed after every failed attempt. It is exposed as the
//! pure [`RetryPolicy::next_delay`] so the sequence can be asserted in
//! tests without sleeping.

use std::fmt;
use std::time::Duration;

use futures::future::BoxFuture;
use rand::Rng;
use tracing::warn;

/// Extra randomness added to the delay between attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Jitter {
    /// No jitter.
    None,
    /// A fixed amount added each round.
    Fixed(Duration),
    /// A uniformly random amount from `[min, max)` added each round.
    Range(Duration, Duration),
}

impl Jitter {
    fn sample(&self) -> Duration {
        match self {
            Jitter::None => Duration::ZERO,
            Jitter::Fixed(amount) => *amount,
            Jitter::Range(min, max) => {
                if max <= min {
                    return *min;
                }
                let secs = rand::thread_rng().gen_range(min.as_secs_f64()..max.as_secs_f64());
                Duration::from_secs_f64(secs)
            }
        }
    }
}

/// Configuration for retry behavior. Stateless between invocations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts in total. Zero or negative means
    /// unlimited.
    pub tries: i32,
    /// Delay before the first retry.
    pub delay: Duration,
    /// Cap applied to the growing delay. `None` means no cap.
    pub max_delay: Option<Duration>,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff: f64,
    /// Randomness added on top of the scaled delay.
    pub jitter: Jitter,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            tries: 3,
            delay: Duration::from_millis(100),
            max_delay: Some(Duration::from_secs(30)),
            backoff: 2.0,
            jitter: Jitter::None,
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff without jitter.
    pub fn exponential(tries: i32, delay: Duration, max_delay: Duration, backoff: f64) -> Self {
        Self { tries, delay, max_delay: Some(max_delay), backoff, jitter: Jitter::None }
    }

    /// Add jitter to an existing policy.
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Compute the delay for the round after one that waited `current`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let scaled = current.mul_f64(self.backoff.max(0.0)) + self.jitter.sample();
        match self.max_delay {
            Some(cap) => scaled.min(cap),
            None => scaled,
        }
    }

    /// The sequence of delays this policy would sleep between attempts.
    ///
    /// Infinite; callers take as many entries as they need. Deterministic
    /// unless the policy uses ranged jitter.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let mut current = self.delay;
        std::iter::from_fn(move || {
            let this_round = current;
            current = self.next_delay(current);
            Some(this_round)
        })
    }
}

/// Applies a [`RetryPolicy`] to async operations.
///
/// The operation receives exclusive access to caller-owned state on every
/// attempt, so retried calls can reconnect or otherwise mutate what they
/// operate on.
#[derive(Debug, Clone)]
pub struct Retrier {
    policy: RetryPolicy,
}

impl Retrier {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op`, retrying while `is_retryable` approves the error and tries
    /// remain. The original error of the final attempt is returned
    /// unchanged.
    pub async fn run<S, T, E, F, P>(&self, state: &mut S, is_retryable: P, op: F) -> Result<T, E>
    where
        E: fmt::Display,
        P: Fn(&E) -> bool,
        F: for<'a> FnMut(&'a mut S) -> BoxFuture<'a, Result<T, E>>,
    {
        self.run_with_callback(state, is_retryable, op, |_, _| {}).await
    }

    /// Same as [`run`](Self::run) with a per-failure callback invoked with
    /// the error and the number of tries left before each retry.
    pub async fn run_with_callback<S, T, E, F, P, C>(
        &self,
        state: &mut S,
        is_retryable: P,
        mut op: F,
        mut on_failure: C,
    ) -> Result<T, E>
    where
        E: fmt::Display,
        P: Fn(&E) -> bool,
        F: for<'a> FnMut(&'a mut S) -> BoxFuture<'a, Result<T, E>>,
        C: FnMut(&E, i32),
    {
        let mut remaining = self.policy.tries;
        let mut delay = self.policy.delay;

        loop {
            match op(state).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !is_retryable(&error) {
                        return Err(error);
                    }

                    if self.policy.tries > 0 {
                        remaining -= 1;
                        if remaining == 0 {
                            return Err(error);
                        }
                    }

                    on_failure(&error, remaining);
                    warn!(
                        error = %error,
                        delay_ms = delay.as_millis() as u64,
                        tries_left = remaining,
                        "operation failed, retrying after backoff"
                    );

                    tokio::time::sleep(delay).await;
                    delay = self.policy.next_delay(delay);
                }
            }
        }
    }
}
