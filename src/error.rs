//! Error types for review API calls.
//!
//! Every failure a request can end in is a variant of [`Error`]. HTTP status
//! failures keep the resolved URL, the response headers and whatever could be
//! parsed out of the error body, so callers can present or log them without
//! re-issuing the request.

use crate::parse::{ParseMode, Payload};
use http::{HeaderMap, StatusCode};
use std::time::Duration;
use url::Url;

/// Boxed error returned by [`RequestObserver`](crate::RequestObserver) hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for review API calls.
///
/// # Examples
///
/// ```no_run
/// use reviewfetch::{Client, Error, RequestOptions};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// match client.get::<serde_json::Value>("/reviews", RequestOptions::new()).await {
///     Ok(response) => println!("Success: {:?}", response.data),
///     Err(Error::HttpError { status, message, url, .. }) => {
///         eprintln!("{} failed with {}: {}", url, status, message);
///     }
///     Err(Error::Cancelled) => eprintln!("Request was cancelled"),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A low-level transport failure (connection refused, DNS lookup failed,
    /// connection reset while reading the body, ...).
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The attempt did not settle within its timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The caller's cancellation token fired. Never retried.
    #[error("Request cancelled by caller")]
    Cancelled,

    /// The server answered with a non-2xx status.
    #[error("HTTP error {status}: {message}")]
    HttpError {
        /// Message taken from the error body's `error` field, or `"<code> <reason>"`.
        message: String,
        /// The HTTP status code
        status: StatusCode,
        /// The error body, when it could be read
        body: Option<Payload>,
        /// The resolved request URL
        url: Url,
        /// The response headers
        headers: HeaderMap,
    },

    /// The response body did not match the parse mode.
    #[error("Failed to decode response as {mode} (status {status}): {message}")]
    Decode {
        /// The parse mode that was applied
        mode: ParseMode,
        /// The HTTP status code of the response
        status: StatusCode,
        /// What the decoder reported
        message: String,
    },

    /// The request path or base URL could not be resolved.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid configuration was provided, such as a bad header name.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The request body could not be serialized.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// A request or response observer failed.
    #[error("Observer failed during {stage}: {source}")]
    Observer {
        /// `"request"` or `"response"`
        stage: &'static str,
        /// The observer's own error
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// Returns `true` if this error is transient under the default policy.
    ///
    /// HTTP 408, 429 and 5xx responses, transport failures and timeouts are
    /// retryable. Caller cancellation, decode failures and configuration
    /// problems are not.
    ///
    /// # Examples
    ///
    /// ```
    /// use reviewfetch::Error;
    /// use http::{HeaderMap, StatusCode};
    ///
    /// let err = Error::HttpError {
    ///     message: "503 Service Unavailable".to_string(),
    ///     status: StatusCode::SERVICE_UNAVAILABLE,
    ///     body: None,
    ///     url: "https://api.example.com/reviews".parse().unwrap(),
    ///     headers: HeaderMap::new(),
    /// };
    /// assert!(err.is_retryable());
    /// assert!(!Error::Cancelled.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Timeout(_) => true,
            Error::HttpError { status, .. } => {
                let code = status.as_u16();
                code == 408 || code == 429 || status.is_server_error()
            }
            Error::Cancelled => false,
            Error::Decode { .. } => false,
            Error::InvalidUrl(_) => false,
            Error::ConfigurationError(_) => false,
            Error::SerializationFailed(_) => false,
            Error::Observer { .. } => false,
        }
    }

    /// Returns `true` if the caller cancelled the request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpError { status, .. } => Some(*status),
            Error::Decode { status, .. } => Some(*status),
            Error::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Returns the request URL, when it is known.
    pub fn url(&self) -> Option<&Url> {
        match self {
            Error::HttpError { url, .. } => Some(url),
            Error::Network(e) => e.url(),
            _ => None,
        }
    }

    /// Returns the response headers of an HTTP status failure.
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            Error::HttpError { headers, .. } => Some(headers),
            _ => None,
        }
    }

    /// Returns the parsed error body of an HTTP status failure.
    pub fn body(&self) -> Option<&Payload> {
        match self {
            Error::HttpError { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

/// A specialized `Result` type for review API calls.
pub type Result<T> = std::result::Result<T, Error>;
