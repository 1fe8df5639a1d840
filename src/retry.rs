//! Retry delay policies and predicates for handling transient failures.
//!
//! A logical request makes up to `1 + max_retries` attempts. After each
//! failed attempt [`evaluate`] decides whether to surface the error or wait
//! and try again.

use crate::rate_limit::{RateLimitConfig, RateLimitInfo};
use crate::Error;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Base delay of the default backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(1000);

/// Cap of the default backoff.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_millis(8000);

/// How long to wait between attempts.
///
/// # Examples
///
/// ```
/// use reviewfetch::RetryDelay;
/// use std::time::Duration;
///
/// // Default: 1s, 2s, 4s, 8s, 8s... ceilings, each jittered into [ceiling/2, ceiling]
/// let backoff = RetryDelay::default();
///
/// // Always wait 250ms
/// let fixed = RetryDelay::Fixed(Duration::from_millis(250));
///
/// // Anything else
/// let custom = RetryDelay::Custom {
///     delay_fn: |attempt, _error| Duration::from_millis(100 * (attempt as u64 + 1)),
/// };
/// ```
#[derive(Debug, Clone)]
pub enum RetryDelay {
    /// Exponential backoff with jitter.
    ///
    /// For 0-based attempt `n` the ceiling is `min(base * 2^n, cap)` and the
    /// delay is drawn uniformly from `[ceiling / 2, ceiling]`.
    Backoff {
        /// Delay ceiling for attempt 0.
        base: Duration,
        /// Upper bound on any ceiling.
        cap: Duration,
    },

    /// The same delay after every failure.
    Fixed(Duration),

    /// Custom delay logic.
    Custom {
        /// Takes the 0-based index of the attempt that just failed and its
        /// error, and returns how long to wait before the next one.
        delay_fn: fn(attempt: usize, error: &Error) -> Duration,
    },
}

impl Default for RetryDelay {
    fn default() -> Self {
        RetryDelay::Backoff {
            base: DEFAULT_BACKOFF_BASE,
            cap: DEFAULT_BACKOFF_CAP,
        }
    }
}

impl RetryDelay {
    /// Returns the delay to wait after the failure of attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: usize, error: &Error) -> Duration {
        match self {
            RetryDelay::Backoff { base, cap } => {
                let ceiling = backoff_ceiling(attempt, *base, *cap);
                let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                ceiling.mul_f64(jitter_factor)
            }
            RetryDelay::Fixed(delay) => *delay,
            RetryDelay::Custom { delay_fn } => delay_fn(attempt, error),
        }
    }
}

/// `min(base * 2^attempt, cap)`, saturating instead of overflowing.
pub fn backoff_ceiling(attempt: usize, base: Duration, cap: Duration) -> Duration {
    let exponent = u32::try_from(attempt).unwrap_or(u32::MAX);
    let multiplier = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
    base.saturating_mul(multiplier).min(cap)
}

/// Decides whether a failed attempt may be retried.
///
/// Any `Fn(&Error, usize) -> bool` closure is a predicate too.
///
/// # Examples
///
/// ```
/// use reviewfetch::{Error, RetryPredicate};
///
/// struct RetryOnRateLimit;
///
/// impl RetryPredicate for RetryOnRateLimit {
///     fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
///         error.status().map(|s| s.as_u16()) == Some(429)
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// Returns `true` if the request should be tried again.
    ///
    /// # Arguments
    ///
    /// * `error` - The failure, carrying the response status and headers when there was a response
    /// * `attempt` - The 0-based index of the attempt that failed
    fn should_retry(&self, error: &Error, attempt: usize) -> bool;
}

impl<F> RetryPredicate for F
where
    F: Fn(&Error, usize) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self(error, attempt)
    }
}

/// Retry every error that [`Error::is_retryable`] accepts.
///
/// This is the default: 408, 429 and 5xx responses, transport failures and timeouts.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnRetryable;

impl RetryPredicate for RetryOnRetryable {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        error.is_retryable()
    }
}

/// Retry only on 5xx server errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryOn5xx;

impl RetryPredicate for RetryOn5xx {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        matches!(error, Error::HttpError { status, .. } if status.is_server_error())
    }
}

/// Retry only on timeouts.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnTimeout;

impl RetryPredicate for RetryOnTimeout {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        matches!(error, Error::Timeout(_))
    }
}

/// Retry only on low-level transport failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnConnectionError;

impl RetryPredicate for RetryOnConnectionError {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        matches!(error, Error::Network(_))
    }
}

/// Retries if ANY of the predicates returns `true`.
///
/// # Examples
///
/// ```
/// use reviewfetch::retry::{OrPredicate, RetryOn5xx, RetryOnTimeout};
///
/// let predicate = OrPredicate::new(vec![
///     Box::new(RetryOn5xx),
///     Box::new(RetryOnTimeout),
/// ]);
/// ```
pub struct OrPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl OrPredicate {
    /// Creates a new `OrPredicate` from a list of predicates.
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for OrPredicate {
    fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self.predicates
            .iter()
            .any(|p| p.should_retry(error, attempt))
    }
}

/// Retries only if ALL of the predicates return `true`.
pub struct AndPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl AndPredicate {
    /// Creates a new `AndPredicate` from a list of predicates.
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for AndPredicate {
    fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self.predicates
            .iter()
            .all(|p| p.should_retry(error, attempt))
    }
}

/// Shared handle to a predicate, as stored by the client and request options.
pub type SharedPredicate = Arc<dyn RetryPredicate>;

/// Outcome of evaluating a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then make the next attempt.
    Retry {
        /// How long to wait.
        delay: Duration,
    },
    /// Give up and hand the error to the caller.
    Surface,
}

/// The retry policy in effect for one logical request.
pub(crate) struct RetryPlan<'a> {
    pub max_attempts: usize,
    pub predicate: &'a dyn RetryPredicate,
    pub delay: &'a RetryDelay,
    pub rate_limit: &'a RateLimitConfig,
}

/// Decides what happens after attempt `attempt` (0-based) failed with `error`.
///
/// Caller cancellation always surfaces. Otherwise the predicate is consulted,
/// then the attempt budget, and only then is a delay computed.
pub(crate) fn evaluate(error: &Error, attempt: usize, plan: &RetryPlan<'_>) -> RetryDecision {
    if error.is_cancelled() {
        return RetryDecision::Surface;
    }
    if !plan.predicate.should_retry(error, attempt) {
        return RetryDecision::Surface;
    }
    if attempt + 1 >= plan.max_attempts {
        return RetryDecision::Surface;
    }

    let delay = server_requested_delay(error, plan.rate_limit)
        .unwrap_or_else(|| plan.delay.delay_for(attempt, error));
    RetryDecision::Retry { delay }
}

fn server_requested_delay(error: &Error, config: &RateLimitConfig) -> Option<Duration> {
    if !config.enabled {
        return None;
    }
    let info = RateLimitInfo::from_headers(error.headers()?);
    let delay = if config.respect_retry_after {
        info.delay(config.max_wait)
    } else {
        info.reset_delay(config.max_wait)
    }?;
    tracing::info!(
        rate_limit_delay_ms = delay.as_millis(),
        max_wait_secs = config.max_wait.as_secs(),
        "Rate limited - waiting before retry"
    );
    Some(delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, HeaderValue, StatusCode};

    fn server_error(code: u16) -> Error {
        Error::HttpError {
            message: String::new(),
            status: StatusCode::from_u16(code).unwrap(),
            body: None,
            url: "https://api.example.com/reviews".parse().unwrap(),
            headers: HeaderMap::new(),
        }
    }

    fn plan<'a>(
        max_attempts: usize,
        predicate: &'a dyn RetryPredicate,
        delay: &'a RetryDelay,
        rate_limit: &'a RateLimitConfig,
    ) -> RetryPlan<'a> {
        RetryPlan {
            max_attempts,
            predicate,
            delay,
            rate_limit,
        }
    }

    #[test]
    fn test_backoff_ceilings() {
        let expected = [1000, 2000, 4000, 8000, 8000, 8000];
        for (attempt, ms) in expected.iter().enumerate() {
            assert_eq!(
                backoff_ceiling(attempt, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_CAP),
                Duration::from_millis(*ms)
            );
        }
        assert_eq!(
            backoff_ceiling(usize::MAX, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_CAP),
            DEFAULT_BACKOFF_CAP
        );
    }

    #[test]
    fn test_backoff_delay_within_bounds() {
        let policy = RetryDelay::default();
        let err = server_error(500);
        for attempt in 0..8 {
            let ceiling = backoff_ceiling(attempt, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_CAP);
            for _ in 0..50 {
                let delay = policy.delay_for(attempt, &err);
                assert!(delay >= ceiling / 2, "{:?} below {:?}", delay, ceiling / 2);
                assert!(delay <= ceiling, "{:?} above {:?}", delay, ceiling);
            }
        }
    }

    #[test]
    fn test_fixed_and_custom_delays() {
        let err = server_error(503);
        assert_eq!(
            RetryDelay::Fixed(Duration::from_millis(7)).delay_for(3, &err),
            Duration::from_millis(7)
        );
        let custom = RetryDelay::Custom {
            delay_fn: |attempt, _| Duration::from_millis(attempt as u64 * 10),
        };
        assert_eq!(custom.delay_for(4, &err), Duration::from_millis(40));
    }

    #[test]
    fn test_evaluate_respects_attempt_budget() {
        let delay = RetryDelay::Fixed(Duration::from_millis(1));
        let rate_limit = RateLimitConfig::disabled();
        let always = |_: &Error, _: usize| true;
        let plan = plan(3, &always, &delay, &rate_limit);
        let err = server_error(500);

        assert_eq!(
            evaluate(&err, 0, &plan),
            RetryDecision::Retry { delay: Duration::from_millis(1) }
        );
        assert!(matches!(evaluate(&err, 1, &plan), RetryDecision::Retry { .. }));
        assert_eq!(evaluate(&err, 2, &plan), RetryDecision::Surface);
    }

    #[test]
    fn test_evaluate_never_retries_cancellation() {
        let delay = RetryDelay::Fixed(Duration::ZERO);
        let rate_limit = RateLimitConfig::disabled();
        let always = |_: &Error, _: usize| true;
        let plan = plan(10, &always, &delay, &rate_limit);
        assert_eq!(evaluate(&Error::Cancelled, 0, &plan), RetryDecision::Surface);
    }

    #[test]
    fn test_evaluate_consults_predicate() {
        let delay = RetryDelay::Fixed(Duration::ZERO);
        let rate_limit = RateLimitConfig::disabled();
        let plan = plan(10, &RetryOnRetryable, &delay, &rate_limit);
        assert_eq!(evaluate(&server_error(404), 0, &plan), RetryDecision::Surface);
        assert!(matches!(
            evaluate(&server_error(429), 0, &plan),
            RetryDecision::Retry { .. }
        ));
    }

    #[test]
    fn test_retry_after_overrides_delay_when_enabled() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("3"));
        let err = Error::HttpError {
            message: String::new(),
            status: StatusCode::TOO_MANY_REQUESTS,
            body: None,
            url: "https://api.example.com/reviews".parse().unwrap(),
            headers,
        };
        let delay = RetryDelay::Fixed(Duration::from_millis(1));

        let enabled = RateLimitConfig::builder().enabled(true).build();
        let plan_on = plan(3, &RetryOnRetryable, &delay, &enabled);
        assert_eq!(
            evaluate(&err, 0, &plan_on),
            RetryDecision::Retry { delay: Duration::from_secs(3) }
        );

        let disabled = RateLimitConfig::disabled();
        let plan_off = plan(3, &RetryOnRetryable, &delay, &disabled);
        assert_eq!(
            evaluate(&err, 0, &plan_off),
            RetryDecision::Retry { delay: Duration::from_millis(1) }
        );
    }

    #[test]
    fn test_predicate_combinators() {
        let or = OrPredicate::new(vec![Box::new(RetryOn5xx), Box::new(RetryOnTimeout)]);
        assert!(or.should_retry(&server_error(502), 0));
        assert!(or.should_retry(&Error::Timeout(Duration::from_secs(1)), 0));
        assert!(!or.should_retry(&server_error(429), 0));

        let and = AndPredicate::new(vec![
            Box::new(RetryOn5xx),
            Box::new(|_: &Error, attempt: usize| attempt < 1),
        ]);
        assert!(and.should_retry(&server_error(500), 0));
        assert!(!and.should_retry(&server_error(500), 1));
        assert!(!RetryOnConnectionError.should_retry(&server_error(500), 0));
    }
}
