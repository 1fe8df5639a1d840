//! HTTP client with retry logic and rich error handling.
//!
//! The [`Client`] type is the main entry point for making HTTP requests.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    cancel::{self, AbortReason, AbortScope, CancellationToken},
    codec,
    endpoint::{BaseUrl, UrlBuilder, DEFAULT_ORIGIN},
    error::BoxError,
    observer::{RequestContext, RequestObserver},
    options::RequestOptions,
    parse::{self, ParseMode, Payload},
    rate_limit::RateLimitConfig,
    retry::{self, RetryDecision, RetryDelay, RetryOnRetryable, RetryPlan, RetryPredicate, SharedPredicate},
    Error, Response, Result,
};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Per-attempt timeout used when neither the client nor the request sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// An HTTP client for making API calls with retry logic and rich error handling.
///
/// The client is cheap to clone and designed to be reused. Its configuration
/// is fixed at build time and shared read-only by every request.
///
/// # Examples
///
/// ```no_run
/// use reviewfetch::{Client, RequestOptions, Response};
/// use std::time::Duration;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize)]
/// struct Reply {
///     body: String,
/// }
///
/// #[derive(Deserialize)]
/// struct Review {
///     id: String,
///     title: String,
/// }
///
/// # async fn example() -> Result<(), reviewfetch::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(12))
///     .max_retries(2)
///     .build()?;
///
/// let review: Response<Option<Review>> = client.get("/reviews/123", RequestOptions::new()).await?;
/// if let Some(review) = &review.data {
///     println!("{}: {}", review.id, review.title);
/// }
///
/// let reply = Reply { body: "Thanks for the feedback!".to_string() };
/// client
///     .post::<_, serde_json::Value>("/reviews/123/responses", &reply, RequestOptions::new())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientConfig>,
}

/// Immutable client configuration, shared by all requests.
pub struct ClientConfig {
    http_client: reqwest::Client,
    urls: UrlBuilder,
    default_headers: HeaderMap,
    timeout: Duration,
    max_retries: usize,
    retry_delay: RetryDelay,
    retry_predicate: SharedPredicate,
    observers: Vec<Arc<dyn RequestObserver>>,
    suppress_observer_errors: bool,
    rate_limit_config: RateLimitConfig,
}

impl ClientConfig {
    /// The base relative paths resolve against.
    pub fn base_url(&self) -> &BaseUrl {
        self.urls.base()
    }

    /// The execution origin used for relative bases.
    pub fn origin(&self) -> &Url {
        self.urls.origin()
    }

    /// Headers sent with every request unless overridden.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// Default per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Default number of retries after the first attempt.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Default retry delay policy.
    pub fn retry_delay(&self) -> &RetryDelay {
        &self.retry_delay
    }

    /// Server-directed delay configuration.
    pub fn rate_limit_config(&self) -> &RateLimitConfig {
        &self.rate_limit_config
    }
}

/// One attempt's fixed inputs.
struct Exchange<'a> {
    method: &'a Method,
    url: &'a Url,
    headers: &'a HeaderMap,
    body: Option<Bytes>,
    parse: ParseMode,
    attempt: usize,
}

type Settled = (StatusCode, HeaderMap, Option<Payload>);

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use reviewfetch::Client;
    ///
    /// # fn example() -> Result<(), reviewfetch::Error> {
    /// let client = Client::builder()
    ///     .base_url("/api")?
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The client's configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner
    }

    /// Makes a request and returns the decoded payload.
    ///
    /// This is the generic entry point: it resolves the URL, encodes the
    /// body, runs each attempt under its timeout and the caller's token, and
    /// retries failures the retry predicate accepts. `data` is `None` for
    /// no-content responses.
    ///
    /// # Errors
    ///
    /// URL and encoding problems fail before any attempt. Otherwise the error
    /// of the last attempt is returned as-is.
    pub async fn send(
        &self,
        path: impl AsRef<str>,
        options: RequestOptions,
    ) -> Result<Response<Option<Payload>>> {
        let config = &*self.inner;
        let start_time = Instant::now();

        let url = config.urls.build(path.as_ref(), options.query.as_ref())?;
        let (headers, body) =
            codec::encode(&config.default_headers, &options.headers, options.body.as_ref())?;
        let timeout = options.timeout.unwrap_or(config.timeout);
        let plan = RetryPlan {
            max_attempts: options
                .retries
                .unwrap_or(config.max_retries)
                .saturating_add(1),
            predicate: options
                .retry_predicate
                .as_deref()
                .unwrap_or(&*config.retry_predicate),
            delay: options.retry_delay.as_ref().unwrap_or(&config.retry_delay),
            rate_limit: &config.rate_limit_config,
        };

        let mut attempt = 0;
        loop {
            let exchange = Exchange {
                method: &options.method,
                url: &url,
                headers: &headers,
                body: body.clone(),
                parse: options.parse,
                attempt,
            };

            match self.attempt(exchange, options.signal.as_ref(), timeout).await {
                Ok((status, response_headers, data)) => {
                    let latency = start_time.elapsed();
                    return Ok(Response::new(
                        data,
                        status,
                        response_headers,
                        url,
                        latency,
                        attempt + 1,
                    ));
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        attempt = attempt,
                        method = %options.method,
                        url = %url,
                        "Request failed"
                    );

                    match retry::evaluate(&e, attempt, &plan) {
                        RetryDecision::Surface => return Err(e),
                        RetryDecision::Retry { delay } => {
                            tracing::info!(
                                delay_ms = delay.as_millis(),
                                attempt = attempt,
                                "Retrying request after delay"
                            );
                            if cancel::sleep_unless_cancelled(delay, options.signal.as_ref())
                                .await
                                .is_err()
                            {
                                return Err(Error::Cancelled);
                            }
                            attempt += 1;
                        }
                    }
                }
            }
        }
    }

    /// Runs one attempt inside its own abort scope.
    async fn attempt(
        &self,
        exchange: Exchange<'_>,
        signal: Option<&CancellationToken>,
        timeout: Duration,
    ) -> Result<Settled> {
        let scope = AbortScope::new(signal, timeout);
        match scope.run(self.execute(&exchange, scope.signal())).await {
            Ok(settled) => settled,
            Err(AbortReason::Caller) => Err(Error::Cancelled),
            Err(AbortReason::Timeout) => Err(Error::Timeout(timeout)),
        }
    }

    /// Sends the request and reads the response.
    async fn execute(&self, exchange: &Exchange<'_>, signal: &CancellationToken) -> Result<Settled> {
        tracing::debug!(
            method = %exchange.method,
            url = %exchange.url,
            attempt = exchange.attempt,
            "Executing HTTP request"
        );

        let ctx = RequestContext::new(
            exchange.method,
            exchange.url,
            exchange.headers,
            exchange.attempt,
            signal,
        );
        self.notify("request", |observer| observer.on_request(&ctx))?;

        let mut request = self
            .inner
            .http_client
            .request(exchange.method.clone(), exchange.url.clone())
            .headers(exchange.headers.clone());
        if let Some(body) = &exchange.body {
            request = request.body(body.clone());
        }

        let response = request.send().await.map_err(Error::Network)?;
        let status = response.status();
        let headers = response.headers().clone();

        self.notify("response", |observer| {
            observer.on_response(&ctx, status, &headers)
        })?;

        tracing::info!(
            status = status.as_u16(),
            attempt = exchange.attempt,
            "Received HTTP response"
        );

        if !status.is_success() {
            return Err(http_error(response, exchange.url).await);
        }

        let data = parse::read_body(response, exchange.parse).await?;
        Ok((status, headers, data))
    }

    fn notify<F>(&self, stage: &'static str, hook: F) -> Result<()>
    where
        F: Fn(&dyn RequestObserver) -> std::result::Result<(), BoxError>,
    {
        for observer in &self.inner.observers {
            if let Err(source) = hook(observer.as_ref()) {
                if !self.inner.suppress_observer_errors {
                    return Err(Error::Observer { stage, source });
                }
                tracing::warn!(stage = stage, error = %source, "Observer failed, continuing");
            }
        }
        Ok(())
    }

    /// Makes a request and deserializes the payload into `Res`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use reviewfetch::{Client, Query, RequestOptions};
    /// use http::Method;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Page { total: u64 }
    ///
    /// # async fn example() -> Result<(), reviewfetch::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    ///
    /// let options = RequestOptions::new()
    ///     .method(Method::GET)
    ///     .query(Query::new().set("page", 1).set("count", 25));
    /// let page = client.request::<Page>("/reviews", options).await?;
    /// println!("{:?} total", page.data.map(|p| p.total));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn request<Res>(
        &self,
        path: impl AsRef<str>,
        options: RequestOptions,
    ) -> Result<Response<Option<Res>>>
    where
        Res: DeserializeOwned,
    {
        let response = self.send(path, options).await?;
        let status = response.status;
        response.try_map(|payload| payload.map(|p| p.decode::<Res>(status)).transpose())
    }

    /// Makes a GET request.
    pub async fn get<Res>(
        &self,
        path: impl AsRef<str>,
        options: RequestOptions,
    ) -> Result<Response<Option<Res>>>
    where
        Res: DeserializeOwned,
    {
        self.request(path, options.method(Method::GET)).await
    }

    /// Makes a POST request with a JSON body.
    pub async fn post<Req, Res>(
        &self,
        path: impl AsRef<str>,
        body: &Req,
        options: RequestOptions,
    ) -> Result<Response<Option<Res>>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        self.request(path, options.method(Method::POST).json(body)?)
            .await
    }

    /// Makes a PUT request with a JSON body.
    pub async fn put<Req, Res>(
        &self,
        path: impl AsRef<str>,
        body: &Req,
        options: RequestOptions,
    ) -> Result<Response<Option<Res>>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        self.request(path, options.method(Method::PUT).json(body)?)
            .await
    }

    /// Makes a PATCH request with a JSON body.
    pub async fn patch<Req, Res>(
        &self,
        path: impl AsRef<str>,
        body: &Req,
        options: RequestOptions,
    ) -> Result<Response<Option<Res>>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        self.request(path, options.method(Method::PATCH).json(body)?)
            .await
    }

    /// Makes a DELETE request.
    pub async fn delete<Res>(
        &self,
        path: impl AsRef<str>,
        options: RequestOptions,
    ) -> Result<Response<Option<Res>>>
    where
        Res: DeserializeOwned,
    {
        self.request(path, options.method(Method::DELETE)).await
    }
}

async fn http_error(response: reqwest::Response, url: &Url) -> Error {
    let status = response.status();
    let headers = response.headers().clone();
    let body = parse::read_error_body(response).await;
    let message = error_message(status, body.as_ref());

    if status.is_client_error() {
        tracing::error!(status = status.as_u16(), message = %message, "Client error (4xx)");
    } else if status.is_server_error() {
        tracing::warn!(status = status.as_u16(), message = %message, "Server error (5xx)");
    }

    Error::HttpError {
        message,
        status,
        body,
        url: url.clone(),
        headers,
    }
}

/// The body's `error` field when it carries something, else `"<code> <reason>"`.
fn error_message(status: StatusCode, body: Option<&Payload>) -> String {
    use serde_json::Value;

    let from_body = body
        .and_then(Payload::as_json)
        .and_then(|json| json.get("error"))
        .and_then(|error| match error {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        });

    from_body.unwrap_or_else(|| {
        format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        )
        .trim_end()
        .to_string()
    })
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use reviewfetch::{ClientBuilder, RetryDelay};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), reviewfetch::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com/v1")?
///     .timeout(Duration::from_secs(12))
///     .max_retries(2)
///     .retry_delay(RetryDelay::Fixed(Duration::from_millis(500)))
///     .default_header("User-Agent", "reviews-browser/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: BaseUrl,
    origin: Option<Url>,
    default_headers: HeaderMap,
    timeout: Duration,
    max_retries: usize,
    retry_delay: RetryDelay,
    retry_predicate: Option<SharedPredicate>,
    observers: Vec<Arc<dyn RequestObserver>>,
    suppress_observer_errors: bool,
    rate_limit_config: RateLimitConfig,
    http_client: Option<reqwest::Client>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: BaseUrl::Origin,
            origin: None,
            default_headers: HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: 0,
            retry_delay: RetryDelay::default(),
            retry_predicate: None,
            observers: Vec::new(),
            suppress_observer_errors: false,
            rate_limit_config: RateLimitConfig::default(),
            http_client: None,
        }
    }

    /// Sets the base URL: empty, root-relative (`/api`) or absolute.
    ///
    /// # Errors
    ///
    /// Returns an error if an absolute URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = BaseUrl::parse(url.as_ref())?;
        Ok(self)
    }

    /// Sets the execution origin relative bases resolve against.
    ///
    /// Defaults to `http://localhost`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn origin(mut self, origin: impl AsRef<str>) -> Result<Self> {
        self.origin = Some(Url::parse(origin.as_ref())?);
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the default per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the default number of retries after the first attempt.
    pub fn max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the default delay policy between attempts.
    pub fn retry_delay(mut self, delay: RetryDelay) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets a custom retry predicate.
    ///
    /// By default, requests are retried based on `Error::is_retryable()`.
    pub fn retry_predicate(mut self, predicate: impl RetryPredicate + 'static) -> Self {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Registers an observer invoked on every attempt.
    pub fn observer(mut self, observer: impl RequestObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Logs observer failures instead of failing the request.
    pub fn suppress_observer_errors(mut self, suppress: bool) -> Self {
        self.suppress_observer_errors = suppress;
        self
    }

    /// Sets the server-directed delay configuration. Disabled by default.
    pub fn rate_limit_config(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit_config = config;
        self
    }

    /// Uses an existing `reqwest::Client` for transport.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be initialised.
    pub fn build(self) -> Result<Client> {
        let origin = match self.origin {
            Some(origin) => origin,
            None => Url::parse(DEFAULT_ORIGIN)?,
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder().build().map_err(|e| {
                Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?,
        };

        let retry_predicate = self
            .retry_predicate
            .unwrap_or_else(|| Arc::new(RetryOnRetryable));

        Ok(Client {
            inner: Arc::new(ClientConfig {
                http_client,
                urls: UrlBuilder::new(self.base_url, origin),
                default_headers: self.default_headers,
                timeout: self.timeout,
                max_retries: self.max_retries,
                retry_delay: self.retry_delay,
                retry_predicate,
                observers: self.observers,
                suppress_observer_errors: self.suppress_observer_errors,
                rate_limit_config: self.rate_limit_config,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_prefers_body_field() {
        let body = Payload::Json(json!({ "error": "Invalid rating filter" }));
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, Some(&body)),
            "Invalid rating filter"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_status() {
        assert_eq!(
            error_message(StatusCode::SERVICE_UNAVAILABLE, None),
            "503 Service Unavailable"
        );
        let text = Payload::Text("upstream exploded".into());
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, Some(&text)),
            "502 Bad Gateway"
        );
        let empty = Payload::Json(json!({ "error": "" }));
        assert_eq!(error_message(StatusCode::NOT_FOUND, Some(&empty)), "404 Not Found");
        let structured = Payload::Json(json!({ "error": { "code": 7 } }));
        assert_eq!(
            error_message(StatusCode::CONFLICT, Some(&structured)),
            r#"{"code":7}"#
        );
    }

    #[test]
    fn test_builder_defaults() {
        let client = Client::builder().build().unwrap();
        let config = client.config();
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.max_retries(), 0);
        assert_eq!(config.base_url(), &BaseUrl::Origin);
        assert_eq!(config.origin().as_str(), "http://localhost/");
        assert!(!config.rate_limit_config().enabled);
        assert!(matches!(config.retry_delay(), RetryDelay::Backoff { .. }));
    }

    #[test]
    fn test_builder_rejects_bad_input() {
        assert!(matches!(
            Client::builder().default_header("bad header", "x"),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            Client::builder().base_url("https://"),
            Err(Error::InvalidUrl(_))
        ));
    }
}
