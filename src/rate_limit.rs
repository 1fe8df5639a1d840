//! Server-directed retry delays.
//!
//! When enabled, a failed response that says how long to back off
//! (`Retry-After`, `X-RateLimit-Reset`, `RateLimit-Reset`) overrides the
//! client's computed retry delay. Disabled by default.

use http::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Back-off hints parsed from response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// When the limit resets (`X-RateLimit-Reset` / `RateLimit-Reset`).
    pub reset_at: Option<SystemTime>,
    /// How long to wait (`Retry-After`, seconds or HTTP date).
    pub retry_after: Option<Duration>,
    /// Requests left in the current window (`X-RateLimit-Remaining`).
    pub remaining: Option<u64>,
}

impl RateLimitInfo {
    /// Extracts back-off hints from response headers.
    ///
    /// # Examples
    ///
    /// ```
    /// use reviewfetch::rate_limit::RateLimitInfo;
    /// use http::HeaderMap;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("retry-after", "60".parse().unwrap());
    ///
    /// let info = RateLimitInfo::from_headers(&headers);
    /// assert_eq!(info.retry_after, Some(std::time::Duration::from_secs(60)));
    /// ```
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            reset_at: parse_reset(headers),
            retry_after: parse_retry_after(headers),
            remaining: header_str(headers, "x-ratelimit-remaining").and_then(|v| v.parse().ok()),
        }
    }

    /// The delay the server asked for, preferring `Retry-After`, capped by `max_wait`.
    pub fn delay(&self, max_wait: Duration) -> Option<Duration> {
        match self.retry_after {
            Some(retry_after) => Some(retry_after.min(max_wait)),
            None => self.reset_delay(max_wait),
        }
    }

    /// Time until the reset instant, capped by `max_wait`.
    pub fn reset_delay(&self, max_wait: Duration) -> Option<Duration> {
        let until_reset = self.reset_at?.duration_since(SystemTime::now()).ok()?;
        Some(until_reset.min(max_wait))
    }
}

/// Configuration for server-directed delays.
///
/// # Examples
///
/// ```
/// use reviewfetch::rate_limit::RateLimitConfig;
/// use std::time::Duration;
///
/// let config = RateLimitConfig::builder()
///     .enabled(true)
///     .max_wait(Duration::from_secs(30))
///     .build();
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Whether response headers may override the retry delay.
    pub enabled: bool,
    /// Longest delay a server may impose. Defaults to 60 seconds.
    pub max_wait: Duration,
    /// Whether to honor `Retry-After`; reset timestamps are honored either way.
    pub respect_retry_after: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_wait: Duration::from_secs(60),
            respect_retry_after: true,
        }
    }
}

impl RateLimitConfig {
    /// Creates a new builder.
    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::default()
    }

    /// A configuration that never overrides the retry delay.
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Builder for [`RateLimitConfig`].
#[derive(Debug, Default)]
pub struct RateLimitConfigBuilder {
    enabled: Option<bool>,
    max_wait: Option<Duration>,
    respect_retry_after: Option<bool>,
}

impl RateLimitConfigBuilder {
    /// Sets whether server-directed delays are used.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Sets the longest delay a server may impose.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Sets whether to honor the `Retry-After` header.
    pub fn respect_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = Some(respect);
        self
    }

    /// Builds the configuration. `enabled` defaults to `true` once the builder is used.
    pub fn build(self) -> RateLimitConfig {
        let default = RateLimitConfig::default();
        RateLimitConfig {
            enabled: self.enabled.unwrap_or(true),
            max_wait: self.max_wait.unwrap_or(default.max_wait),
            respect_retry_after: self
                .respect_retry_after
                .unwrap_or(default.respect_retry_after),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

/// Parses `Retry-After` as delay-seconds or an HTTP date.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = header_str(headers, "retry-after")?.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = httpdate::parse_http_date(value).ok()?;
    Some(at.duration_since(SystemTime::now()).unwrap_or(Duration::ZERO))
}

/// Parses a Unix-timestamp reset header, `X-RateLimit-Reset` first.
///
/// A timestamp past what `SystemTime` can hold counts as absent.
fn parse_reset(headers: &HeaderMap) -> Option<SystemTime> {
    ["x-ratelimit-reset", "ratelimit-reset"]
        .iter()
        .find_map(|name| header_str(headers, name)?.trim().parse::<u64>().ok())
        .and_then(|timestamp| UNIX_EPOCH.checked_add(Duration::from_secs(timestamp)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("60"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let when = SystemTime::now() + Duration::from_secs(120);
        let mut headers = HeaderMap::new();
        headers.insert(
            "retry-after",
            HeaderValue::from_str(&httpdate::fmt_http_date(when)).unwrap(),
        );
        let delay = parse_retry_after(&headers).unwrap();
        assert!(delay > Duration::from_secs(110) && delay <= Duration::from_secs(120));
    }

    #[test]
    fn test_reset_headers_and_remaining() {
        let reset = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 30;
        let mut headers = HeaderMap::new();
        headers.insert(
            "ratelimit-reset",
            HeaderValue::from_str(&reset.to_string()).unwrap(),
        );
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));

        let info = RateLimitInfo::from_headers(&headers);
        assert!(info.retry_after.is_none());
        assert_eq!(info.remaining, Some(0));
        let delay = info.delay(Duration::from_secs(300)).unwrap();
        assert!(delay >= Duration::from_secs(28) && delay <= Duration::from_secs(30));
    }

    #[test]
    fn test_unrepresentable_reset_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-ratelimit-reset",
            HeaderValue::from_static("18446744073709551615"),
        );
        headers.insert("retry-after", HeaderValue::from_static("5"));

        let info = RateLimitInfo::from_headers(&headers);
        assert_eq!(info.reset_at, None);
        assert_eq!(
            info.delay(Duration::from_secs(60)),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_delay_capped_by_max_wait() {
        let info = RateLimitInfo {
            reset_at: None,
            retry_after: Some(Duration::from_secs(600)),
            remaining: None,
        };
        assert_eq!(
            info.delay(Duration::from_secs(60)),
            Some(Duration::from_secs(60))
        );
        assert_eq!(info.reset_delay(Duration::from_secs(60)), None);
    }

    #[test]
    fn test_config_defaults() {
        assert!(!RateLimitConfig::default().enabled);
        assert!(RateLimitConfig::builder().build().enabled);
        assert!(!RateLimitConfig::builder().enabled(false).build().enabled);
    }
}
