//! Request and response observer hooks.

use crate::cancel::CancellationToken;
use crate::error::BoxError;
use http::{HeaderMap, Method, StatusCode};
use url::Url;

/// What an observer sees about the attempt in flight.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    method: &'a Method,
    url: &'a Url,
    headers: &'a HeaderMap,
    attempt: usize,
    signal: &'a CancellationToken,
}

impl<'a> RequestContext<'a> {
    pub(crate) fn new(
        method: &'a Method,
        url: &'a Url,
        headers: &'a HeaderMap,
        attempt: usize,
        signal: &'a CancellationToken,
    ) -> Self {
        Self {
            method,
            url,
            headers,
            attempt,
            signal,
        }
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        self.method
    }

    /// The resolved request URL.
    pub fn url(&self) -> &Url {
        self.url
    }

    /// The final request headers.
    pub fn headers(&self) -> &HeaderMap {
        self.headers
    }

    /// The 0-based attempt index.
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    /// The attempt's merged cancellation signal.
    pub fn signal(&self) -> &CancellationToken {
        self.signal
    }
}

/// Hooks invoked once per attempt.
///
/// An `Err` from either hook fails the attempt with
/// [`Error::Observer`](crate::Error::Observer), which is never retried, unless
/// the client was built with
/// [`suppress_observer_errors`](crate::ClientBuilder::suppress_observer_errors).
///
/// # Examples
///
/// ```
/// use reviewfetch::{RequestContext, RequestObserver};
/// use reviewfetch::error::BoxError;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct CountAttempts(AtomicUsize);
///
/// impl RequestObserver for CountAttempts {
///     fn on_request(&self, _ctx: &RequestContext<'_>) -> Result<(), BoxError> {
///         self.0.fetch_add(1, Ordering::Relaxed);
///         Ok(())
///     }
/// }
/// ```
pub trait RequestObserver: Send + Sync {
    /// Called before the request is sent.
    fn on_request(&self, _ctx: &RequestContext<'_>) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called once response headers arrive, before the status is checked.
    fn on_response(
        &self,
        _ctx: &RequestContext<'_>,
        _status: StatusCode,
        _headers: &HeaderMap,
    ) -> Result<(), BoxError> {
        Ok(())
    }
}
