//! Retry policy with exponential backoff.
//!
//! A [`RetryPolicy`] is created per logical call and carries that call's
//! attempt count. Given a classified outcome it decides whether to retry
//! and how long to wait first. The default schedule is
//! `min(32s, 1s * 2^attempt)`: 1s, 2s, 4s, 8s, 16s, 32s, 32s, ...

use rand::Rng;
use std::time::Duration;

use crate::classify::Classification;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first transmission.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff strategy to use.
    pub backoff: BackoffStrategy,
    /// Whether a server-provided Retry-After header overrides the local schedule.
    pub respect_retry_after: bool,
    /// Maximum time to wait from Retry-After header.
    pub max_retry_after: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(32),
            backoff: BackoffStrategy::Exponential { factor: 2.0 },
            respect_retry_after: false,
            max_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the delay before the first retry.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff strategy.
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Let a server-provided Retry-After header take precedence.
    pub fn with_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = respect;
        self
    }

    /// Disable retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }
}

/// Backoff strategy for determining retry delays.
#[derive(Debug, Clone, Copy)]
pub enum BackoffStrategy {
    /// Constant delay between retries.
    Constant,
    /// Linear increase in delay (delay * attempt).
    Linear,
    /// Exponential increase in delay (delay * factor^attempt).
    Exponential { factor: f64 },
    /// Exponential with random jitter to avoid thundering herd.
    ExponentialWithJitter { factor: f64 },
}

impl BackoffStrategy {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay(&self, attempt: u32, initial_delay: Duration, max_delay: Duration) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = match self {
            BackoffStrategy::Constant => initial_delay.as_secs_f64(),
            BackoffStrategy::Linear => initial_delay.as_secs_f64() * (f64::from(attempt) + 1.0),
            BackoffStrategy::Exponential { factor } => {
                initial_delay.as_secs_f64() * factor.powi(exponent)
            }
            BackoffStrategy::ExponentialWithJitter { factor } => {
                let base_delay = initial_delay.as_secs_f64() * factor.powi(exponent);

                // Add jitter: random value between 0 and base_delay
                let jitter = rand::rng().random::<f64>() * base_delay;
                base_delay + jitter
            }
        };

        // Huge attempt counts overflow to infinity; saturate at the cap.
        Duration::try_from_secs_f64(secs)
            .map(|delay| delay.min(max_delay))
            .unwrap_or(max_delay)
    }
}

/// The default backoff schedule: `min(32s, 1s * 2^attempt)`.
pub fn backoff_delay(attempt: u32) -> Duration {
    let config = RetryConfig::default();
    config
        .backoff
        .delay(attempt, config.initial_delay, config.max_delay)
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait for the given delay, then transmit again.
    Retry(Duration),
    /// Stop and surface the last classified outcome unchanged.
    GiveUp,
}

/// Retry policy that determines when and how to retry one logical call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    attempt: u32,
}

impl RetryPolicy {
    /// Create a new retry policy from config.
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Returns the number of retries scheduled so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns the configured retry budget.
    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Returns true if the retry budget is not yet exhausted.
    pub fn should_retry(&self) -> bool {
        self.attempt < self.config.max_retries
    }

    /// Decide what to do after a classified outcome.
    ///
    /// Successes and non-retryable failures always give up; retryable
    /// failures are retried until the budget is spent.
    pub fn decide(&mut self, outcome: &Classification) -> RetryDecision {
        if !outcome.is_retryable() {
            return RetryDecision::GiveUp;
        }

        match self.next_delay(outcome.retry_after()) {
            Some(delay) => RetryDecision::Retry(delay),
            None => RetryDecision::GiveUp,
        }
    }

    /// Record an attempt and return the delay before the next retry.
    /// Returns None if we've exhausted all retries.
    pub fn next_delay(&mut self, retry_after: Option<Duration>) -> Option<Duration> {
        if !self.should_retry() {
            return None;
        }

        let delay = match retry_after {
            Some(retry_after) if self.config.respect_retry_after => {
                std::cmp::min(retry_after, self.config.max_retry_after)
            }
            _ => self.config.backoff.delay(
                self.attempt,
                self.config.initial_delay,
                self.config.max_delay,
            ),
        };

        self.attempt += 1;
        Some(delay)
    }

    /// Reset the retry policy for a new request.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
