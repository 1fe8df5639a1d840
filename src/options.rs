//! Per-request options.

use crate::cancel::CancellationToken;
use crate::codec::RequestBody;
use crate::endpoint::{Query, QueryValue};
use crate::parse::ParseMode;
use crate::retry::{RetryDelay, RetryPredicate, SharedPredicate};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Overrides for one logical request, retries included.
///
/// Anything left unset falls back to the client's configuration.
///
/// # Examples
///
/// ```
/// use reviewfetch::{CancellationToken, ParseMode, Query, RequestOptions};
/// use std::time::Duration;
///
/// let cancel = CancellationToken::new();
/// let options = RequestOptions::new()
///     .query(Query::new().set("page", 2))
///     .timeout(Duration::from_secs(5))
///     .retries(1)
///     .parse(ParseMode::Json)
///     .signal(cancel.clone());
/// ```
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// The HTTP method. Defaults to GET.
    pub method: Method,
    /// Headers that replace same-named client defaults.
    pub headers: HeaderMap,
    /// The request body.
    pub body: Option<RequestBody>,
    /// Query data appended to the URL.
    pub query: Option<Query>,
    /// Caller-owned cancellation token.
    pub signal: Option<CancellationToken>,
    /// Per-attempt timeout override.
    pub timeout: Option<Duration>,
    /// Retry count override (attempts = 1 + retries).
    pub retries: Option<usize>,
    /// How to decode the response body.
    pub parse: ParseMode,
    /// Retry predicate override.
    pub retry_predicate: Option<SharedPredicate>,
    /// Retry delay override.
    pub retry_delay: Option<RetryDelay>,
}

impl RequestOptions {
    /// Creates options with every field at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, crate::Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Replaces all request headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the request body.
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a JSON body from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, crate::Error> {
        self.body = Some(RequestBody::json(value)?);
        Ok(self)
    }

    /// Replaces the query data.
    pub fn query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    /// Sets one query parameter, keeping the others.
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.get_or_insert_with(Query::new).insert(key, value);
        self
    }

    /// Attaches a cancellation token.
    pub fn signal(mut self, token: CancellationToken) -> Self {
        self.signal = Some(token);
        self
    }

    /// Overrides the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the number of retries.
    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Sets the parse mode.
    pub fn parse(mut self, mode: ParseMode) -> Self {
        self.parse = mode;
        self
    }

    /// Overrides the retry predicate.
    pub fn retry_predicate(mut self, predicate: impl RetryPredicate + 'static) -> Self {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Overrides the retry delay policy.
    pub fn retry_delay(mut self, delay: RetryDelay) -> Self {
        self.retry_delay = Some(delay);
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("query", &self.query)
            .field("signal", &self.signal)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("parse", &self.parse)
            .field("retry_predicate", &self.retry_predicate.is_some())
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}
