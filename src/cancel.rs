//! Per-attempt cancellation and timeouts.
//!
//! Each attempt runs inside an [`AbortScope`], which folds the caller's
//! [`CancellationToken`] and the attempt's timeout into a single internal
//! signal. The scope reports which of the two fired, so the retry loop can
//! retry a timeout but never a caller cancellation.

use std::future::Future;
use std::time::Duration;

pub use tokio_util::sync::CancellationToken;

/// Why an attempt was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The caller's token was cancelled.
    Caller,
    /// The attempt's timeout elapsed.
    Timeout,
}

/// Merges caller cancellation with a timeout for one attempt.
///
/// The caller listener and the timer only live inside [`AbortScope::run`],
/// so both are released whichever way the attempt settles.
///
/// # Examples
///
/// ```
/// use reviewfetch::cancel::{AbortReason, AbortScope, CancellationToken};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let caller = CancellationToken::new();
/// caller.cancel();
///
/// let scope = AbortScope::new(Some(&caller), Duration::from_secs(5));
/// let outcome = scope.run(async { 42 }).await;
/// assert_eq!(outcome, Err(AbortReason::Caller));
/// assert!(scope.signal().is_cancelled());
/// # }
/// ```
#[derive(Debug)]
pub struct AbortScope {
    internal: CancellationToken,
    caller: Option<CancellationToken>,
    timeout: Duration,
}

impl AbortScope {
    /// Creates a scope for one attempt.
    pub fn new(caller: Option<&CancellationToken>, timeout: Duration) -> Self {
        Self {
            internal: CancellationToken::new(),
            caller: caller.cloned(),
            timeout,
        }
    }

    /// The merged signal; cancelled once either abort source fires.
    pub fn signal(&self) -> &CancellationToken {
        &self.internal
    }

    /// The timeout this scope enforces.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Drives `attempt` until it completes or an abort source fires.
    ///
    /// If the caller's token is already cancelled the attempt is never polled.
    pub async fn run<F: Future>(&self, attempt: F) -> Result<F::Output, AbortReason> {
        if self.caller.as_ref().is_some_and(|c| c.is_cancelled()) {
            self.internal.cancel();
            return Err(AbortReason::Caller);
        }

        let caller_cancelled = async {
            match &self.caller {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = caller_cancelled => Err(AbortReason::Caller),
            output = attempt => Ok(output),
            _ = tokio::time::sleep(self.timeout) => Err(AbortReason::Timeout),
        };

        if let Err(reason) = outcome {
            tracing::debug!(reason = ?reason, timeout_ms = self.timeout.as_millis(), "Attempt aborted");
            self.internal.cancel();
        }
        outcome
    }
}

/// Sleeps for `delay` unless `caller` is cancelled first.
///
/// Returns `Err(AbortReason::Caller)` on cancellation.
pub async fn sleep_unless_cancelled(
    delay: Duration,
    caller: Option<&CancellationToken>,
) -> Result<(), AbortReason> {
    match caller {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(AbortReason::Caller),
            _ = tokio::time::sleep(delay) => Ok(()),
        },
        None => {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}
