//! Response wrapper that keeps the parsed data together with transfer details.

use http::{HeaderMap, StatusCode};
use std::time::Duration;
use url::Url;

/// A successful response.
///
/// `T` is the decoded body. Entry points yield `Response<Option<T>>`, where
/// `None` means there was no content (`204` or [`ParseMode::None`](crate::ParseMode::None)).
///
/// # Examples
///
/// ```no_run
/// use reviewfetch::{Client, RequestOptions};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Summary {
///     total: u64,
/// }
///
/// # async fn example() -> Result<(), reviewfetch::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// let response = client.get::<Summary>("/reviews/summary", RequestOptions::new()).await?;
///
/// if let Some(summary) = &response.data {
///     println!("{} reviews", summary.total);
/// }
/// println!("Request took {:?} over {} attempt(s)", response.latency, response.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded response data.
    pub data: T,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The resolved request URL.
    pub url: Url,

    /// Time from the first attempt until the successful response was decoded,
    /// retry delays included.
    pub latency: Duration,

    /// The number of attempts made; `1` when the first try succeeded.
    pub attempts: usize,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        status: StatusCode,
        headers: HeaderMap,
        url: Url,
        latency: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            data,
            status,
            headers,
            url,
            latency,
            attempts,
        }
    }

    /// Maps the response data, keeping the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use reviewfetch::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     42,
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     "https://api.example.com/n".parse().unwrap(),
    ///     Duration::from_millis(100),
    ///     1,
    /// );
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            status: self.status,
            headers: self.headers,
            url: self.url,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Like [`Response::map`], for conversions that can fail.
    pub fn try_map<U, E, F>(self, f: F) -> Result<Response<U>, E>
    where
        F: FnOnce(T) -> Result<U, E>,
    {
        Ok(Response {
            data: f(self.data)?,
            status: self.status,
            headers: self.headers,
            url: self.url,
            latency: self.latency,
            attempts: self.attempts,
        })
    }

    /// Returns `true` if the request needed more than one attempt.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use reviewfetch::Response;
    /// # use http::{HeaderMap, HeaderValue, StatusCode};
    /// # use std::time::Duration;
    /// let mut headers = HeaderMap::new();
    /// headers.insert("content-type", HeaderValue::from_static("application/json"));
    ///
    /// let response = Response::new(
    ///     (),
    ///     StatusCode::OK,
    ///     headers,
    ///     "https://api.example.com/".parse().unwrap(),
    ///     Duration::from_millis(100),
    ///     1,
    /// );
    ///
    /// assert_eq!(response.header("content-type"), Some("application/json"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
