//! Exponential backoff retry logic for GitHub API calls.
//!
//! - Default: 4 attempts (1 initial + 3 retries) with 1s, 2s, 4s base delays
//! - Each delay gets up to 10% random jitter so concurrent callers spread out
//!
//! The retry logic only applies to transient errors. Permanent errors are
//! returned immediately.

use std::future::Future;
use std::time::Duration;

use super::error::{GitHubApiError, GitHubErrorKind};

/// Configuration for exponential backoff retry.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the initial one.
    pub max_attempts: u32,

    /// Base delay before the first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries (cap for exponential growth, before jitter).
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (typically 2.0).
    pub backoff_multiplier: f64,

    /// Upper bound of the random jitter, as a fraction of the delay.
    pub jitter_fraction: f64,
}

impl RetryConfig {
    /// Default retry configuration for tracker reads and writes.
    ///
    /// - 4 attempts with 1s, 2s, 4s delays between them (plus jitter)
    /// - Total max wait: ~7.7 seconds
    pub const DEFAULT: Self = Self {
        max_attempts: 4,
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(30),
        backoff_multiplier: 2.0,
        jitter_fraction: 0.1,
    };

    /// Creates a new retry configuration with the default jitter.
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            backoff_multiplier,
            jitter_fraction: Self::DEFAULT.jitter_fraction,
        }
    }

    /// Returns a copy with jitter disabled.
    pub fn without_jitter(self) -> Self {
        Self {
            jitter_fraction: 0.0,
            ..self
        }
    }

    /// Computes the base delay for the given retry (0-indexed), without jitter.
    ///
    /// The delay grows exponentially: `initial_delay * backoff_multiplier^retry`,
    /// capped at `max_delay`.
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(retry as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped_secs)
    }

    /// The base delay plus a random jitter in `[0, jitter_fraction * delay]`.
    pub fn jittered_delay(&self, retry: u32) -> Duration {
        let base = self.delay_for_attempt(retry);
        if self.jitter_fraction <= 0.0 {
            return base;
        }
        let unit: f64 = rand::random();
        base + base.mul_f64(self.jitter_fraction * unit)
    }

    /// Returns an iterator over all base retry delays.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts.saturating_sub(1)).map(|retry| self.delay_for_attempt(retry))
    }

    /// Computes the total base wait time for all retries, excluding jitter.
    pub fn total_max_wait(&self) -> Duration {
        self.delays().sum()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Retry policy for controlling retry behavior at runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry transient errors with exponential backoff.
    #[default]
    RetryTransient,

    /// Do not retry - return errors immediately.
    NoRetry,
}

/// Result of a retry attempt.
#[derive(Debug)]
pub enum RetryResult<T> {
    /// The operation succeeded.
    Success(T),

    /// A transient error occurred after exhausting all retries.
    ExhaustedRetries {
        /// The last error encountered.
        last_error: GitHubApiError,
        /// Number of attempts made (including the initial attempt).
        attempts: u32,
    },

    /// A permanent error occurred (not retriable).
    PermanentError(GitHubApiError),
}

impl<T> RetryResult<T> {
    /// Converts to a Result, treating exhausted retries and permanent errors as Err.
    pub fn into_result(self) -> Result<T, GitHubApiError> {
        match self {
            RetryResult::Success(v) => Ok(v),
            RetryResult::ExhaustedRetries {
                last_error,
                attempts,
            } => {
                tracing::warn!(attempts, error = %last_error, "Giving up after retries");
                Err(last_error)
            }
            RetryResult::PermanentError(e) => Err(e),
        }
    }

    /// Returns true if the result is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success(_))
    }
}

/// Executes an async operation with retry logic.
///
/// The operation is retried according to the provided configuration when it
/// returns a transient error. Permanent errors are returned immediately.
///
/// # Arguments
///
/// * `config` - Retry configuration (delays, max attempts)
/// * `policy` - Whether to actually retry or return immediately
/// * `operation` - The async operation to execute. Called repeatedly until
///   success, permanent error, or max attempts exhausted.
pub async fn retry_with_backoff<T, F, Fut>(
    config: RetryConfig,
    policy: RetryPolicy,
    mut operation: F,
) -> RetryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GitHubApiError>>,
{
    let mut attempt = 0;
    let max_attempts = if policy == RetryPolicy::NoRetry {
        1
    } else {
        config.max_attempts.max(1)
    };

    loop {
        match operation().await {
            Ok(value) => return RetryResult::Success(value),
            Err(e) => {
                attempt += 1;

                match e.kind {
                    GitHubErrorKind::Permanent => return RetryResult::PermanentError(e),
                    GitHubErrorKind::Transient => {
                        if attempt >= max_attempts {
                            return RetryResult::ExhaustedRetries {
                                last_error: e,
                                attempts: attempt,
                            };
                        }

                        let delay = config.jittered_delay(attempt - 1);
                        tracing::debug!(
                            attempt,
                            max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Transient GitHub error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}
