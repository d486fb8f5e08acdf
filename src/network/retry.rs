//! Retry budget and exponential backoff for chapter fetches.
//!
//! A failed fetch is classified into a [`FailureType`] and the
//! [`RetryPolicy`] decides whether another attempt is made and after what
//! delay. The default budget is two attempts per chapter, so a retryable
//! failure is retried exactly once.
//!
//! # Example
//!
//! ```
//! use novel_importer::network::{NetworkError, RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::default();
//! let error = NetworkError::http_status("https://example.com/1.html", 503);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { attempt, .. } => assert_eq!(attempt, 2),
//!     RetryDecision::DoNotRetry { reason } => panic!("unexpected: {reason}"),
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::NetworkError;

/// Default number of attempts per request, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Wait before the first retry.
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Ceiling for any single backoff.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(16);

const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Default upper bound of the random jitter added to every delay.
const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(250);

/// Classification of fetch failures for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Timeouts and 5xx responses.
    Transient,
    /// Everything that will fail the same way again (4xx, offline, bad URL).
    Permanent,
    /// HTTP 429; retried, honouring `Retry-After` when present.
    RateLimited,
}

/// Outcome of [`RetryPolicy::should_retry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    Retry {
        /// Backoff to sleep before the next attempt.
        delay: Duration,
        /// Which attempt number this will be (first retry is attempt 2).
        attempt: u32,
    },

    /// Give up and surface the error.
    DoNotRetry {
        reason: String,
    },
}

/// Retry budget with exponential backoff.
///
/// ```text
/// delay = min(base_delay * multiplier^(attempt-1), max_delay) + jitter
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f32,
    max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Fully custom policy with the default jitter.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            backoff_multiplier,
            ..Self::default()
        }
    }

    /// Default delays with a different attempt budget (at least 1).
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// A policy whose delays are all zero. Intended for tests and local mirrors.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            max_jitter: Duration::ZERO,
        }
    }

    /// Attempts per request, first one included.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[instrument(level = "debug", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure, same result on retry".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "retry budget spent");
            return RetryDecision::DoNotRetry {
                reason: format!("all {} attempts exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "scheduling retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * f64::from(self.backoff_multiplier).powf(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        Duration::from_millis(capped_ms as u64) + self.calculate_jitter()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn calculate_jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

/// Classifies a network error into a failure type.
///
/// | Failure | Type |
/// |---------|------|
/// | 429 | `RateLimited` |
/// | timeout, 5xx | `Transient` |
/// | other status, offline, unreachable, transport | `Permanent` |
#[must_use]
pub fn classify_error(error: &NetworkError) -> FailureType {
    if error.status_code == Some(429) {
        FailureType::RateLimited
    } else if error.is_retryable() {
        FailureType::Transient
    } else {
        FailureType::Permanent
    }
}
