//! Response body decoding.
//!
//! A response is decoded according to a [`ParseMode`]. Under
//! [`ParseMode::Auto`] the declared `Content-Type` picks the decoder.

use crate::{Error, Result};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;

/// How to decode a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Choose from the response's `Content-Type`.
    #[default]
    Auto,
    /// Always decode as JSON.
    Json,
    /// Always decode as UTF-8 text.
    Text,
    /// Raw bytes together with their declared content type.
    Blob,
    /// Raw bytes only.
    Bytes,
    /// Discard the body.
    None,
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseMode::Auto => "auto",
            ParseMode::Json => "json",
            ParseMode::Text => "text",
            ParseMode::Blob => "blob",
            ParseMode::Bytes => "bytes",
            ParseMode::None => "none",
        };
        f.write_str(name)
    }
}

/// Binary data along with the content type it was served with.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    /// The response's `Content-Type`, if any.
    pub content_type: Option<String>,
    /// The raw body.
    pub data: Bytes,
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A JSON document.
    Json(serde_json::Value),
    /// A text body.
    Text(String),
    /// A binary body with its content type.
    Blob(Blob),
    /// A binary body.
    Bytes(Bytes),
}

impl Payload {
    /// Returns the JSON document, if this is one.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the text body, if this is one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the raw bytes of a binary payload.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Payload::Blob(blob) => Some(&blob.data),
            Payload::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Converts the payload into a typed value.
    ///
    /// JSON documents deserialize directly; text deserializes as a JSON
    /// string, so `String` targets accept text bodies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] when the payload does not fit `T` or is binary.
    pub fn decode<T: DeserializeOwned>(self, status: StatusCode) -> Result<T> {
        let (mode, value) = match self {
            Payload::Json(value) => (ParseMode::Json, value),
            Payload::Text(text) => (ParseMode::Text, serde_json::Value::String(text)),
            Payload::Blob(_) | Payload::Bytes(_) => {
                return Err(Error::Decode {
                    mode: ParseMode::Bytes,
                    status,
                    message: "binary payload cannot be decoded into a typed value".to_string(),
                })
            }
        };
        serde_json::from_value(value).map_err(|e| Error::Decode {
            mode,
            status,
            message: e.to_string(),
        })
    }
}

/// Decodes a buffered response body.
///
/// A `None` result means there is no value: the mode was [`ParseMode::None`]
/// or the status was `204 No Content`.
///
/// # Examples
///
/// ```
/// use reviewfetch::parse::{decode, ParseMode, Payload};
/// use http::StatusCode;
///
/// let payload = decode(StatusCode::OK, Some("application/json"), br#"{"total":3}"#, ParseMode::Auto)
///     .unwrap()
///     .unwrap();
/// assert_eq!(payload, Payload::Json(serde_json::json!({ "total": 3 })));
///
/// assert!(decode(StatusCode::NO_CONTENT, None, b"", ParseMode::Json).unwrap().is_none());
/// ```
pub fn decode(
    status: StatusCode,
    content_type: Option<&str>,
    body: &[u8],
    mode: ParseMode,
) -> Result<Option<Payload>> {
    if mode == ParseMode::None || status == StatusCode::NO_CONTENT {
        return Ok(None);
    }

    let declared = content_type.unwrap_or("");
    let auto = mode == ParseMode::Auto;

    if mode == ParseMode::Json || (auto && declared.contains("application/json")) {
        return serde_json::from_slice(body)
            .map(|value| Some(Payload::Json(value)))
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    status = status.as_u16(),
                    "Failed to decode JSON response"
                );
                Error::Decode {
                    mode: ParseMode::Json,
                    status,
                    message: e.to_string(),
                }
            });
    }

    match mode {
        ParseMode::Blob => Ok(Some(Payload::Blob(Blob {
            content_type: content_type.map(str::to_string),
            data: Bytes::copy_from_slice(body),
        }))),
        ParseMode::Bytes => Ok(Some(Payload::Bytes(Bytes::copy_from_slice(body)))),
        _ => Ok(Some(Payload::Text(
            String::from_utf8_lossy(body).into_owned(),
        ))),
    }
}

/// Reads the whole body of `response` and decodes it with `mode`.
pub(crate) async fn read_body(
    response: reqwest::Response,
    mode: ParseMode,
) -> Result<Option<Payload>> {
    let status = response.status();
    if mode == ParseMode::None || status == StatusCode::NO_CONTENT {
        return Ok(None);
    }

    let content_type = content_type(response.headers());
    let body = response.bytes().await.map_err(Error::Network)?;
    decode(status, content_type.as_deref(), &body, mode)
}

/// Best-effort decode of an error response body. Failures yield `None`.
pub(crate) async fn read_error_body(response: reqwest::Response) -> Option<Payload> {
    let is_json = content_type(response.headers())
        .is_some_and(|ct| ct.contains("application/json"));
    let body = response.bytes().await.ok()?;
    if is_json {
        serde_json::from_slice(&body).ok().map(Payload::Json)
    } else {
        Some(Payload::Text(String::from_utf8_lossy(&body).into_owned()))
    }
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_no_content_is_absent_for_every_mode() {
        for mode in [
            ParseMode::Auto,
            ParseMode::Json,
            ParseMode::Text,
            ParseMode::Blob,
            ParseMode::Bytes,
            ParseMode::None,
        ] {
            let parsed = decode(StatusCode::NO_CONTENT, Some("application/json"), b"", mode).unwrap();
            assert!(parsed.is_none(), "mode {} should yield nothing", mode);
        }
    }

    #[test]
    fn test_none_mode_discards_body() {
        let parsed = decode(StatusCode::OK, Some("application/json"), b"{}", ParseMode::None).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_auto_mode_follows_content_type() {
        let json = decode(
            StatusCode::OK,
            Some("application/json; charset=utf-8"),
            br#"{"a":1}"#,
            ParseMode::Auto,
        )
        .unwrap();
        assert_eq!(json, Some(Payload::Json(json!({ "a": 1 }))));

        let text = decode(StatusCode::OK, Some("text/html"), b"<p>hi</p>", ParseMode::Auto).unwrap();
        assert_eq!(text, Some(Payload::Text("<p>hi</p>".into())));

        let fallback = decode(StatusCode::OK, None, br#"{"a":1}"#, ParseMode::Auto).unwrap();
        assert_eq!(fallback, Some(Payload::Text(r#"{"a":1}"#.into())));
    }

    #[test]
    fn test_explicit_modes_override_content_type() {
        let json = decode(StatusCode::OK, Some("text/plain"), b"[1,2]", ParseMode::Json).unwrap();
        assert_eq!(json, Some(Payload::Json(json!([1, 2]))));

        let text = decode(StatusCode::OK, Some("application/json"), b"[1,2]", ParseMode::Text).unwrap();
        assert_eq!(text, Some(Payload::Text("[1,2]".into())));

        let blob = decode(StatusCode::OK, Some("image/png"), &[1, 2, 3], ParseMode::Blob)
            .unwrap()
            .unwrap();
        assert_eq!(
            blob,
            Payload::Blob(Blob {
                content_type: Some("image/png".into()),
                data: Bytes::from_static(&[1, 2, 3]),
            })
        );
        assert_eq!(blob.as_bytes().map(|b| b.len()), Some(3));

        let raw = decode(StatusCode::OK, Some("application/json"), &[9], ParseMode::Bytes).unwrap();
        assert_eq!(raw, Some(Payload::Bytes(Bytes::from_static(&[9]))));
    }

    #[test]
    fn test_malformed_json_is_reported() {
        let err = decode(StatusCode::OK, Some("application/json"), b"not json", ParseMode::Auto)
            .unwrap_err();
        match err {
            Error::Decode { mode, status, .. } => {
                assert_eq!(mode, ParseMode::Json);
                assert_eq!(status, StatusCode::OK);
            }
            other => panic!("Expected Decode, got {:?}", other),
        }
    }

    #[test]
    fn test_payload_decode_into_types() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Page {
            total: u32,
        }

        let page: Page = Payload::Json(json!({ "total": 7 })).decode(StatusCode::OK).unwrap();
        assert_eq!(page, Page { total: 7 });

        let text: String = Payload::Text("plain".into()).decode(StatusCode::OK).unwrap();
        assert_eq!(text, "plain");

        let err = Payload::Bytes(Bytes::new()).decode::<Page>(StatusCode::OK).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));

        let err = Payload::Json(json!({ "total": "many" }))
            .decode::<Page>(StatusCode::OK)
            .unwrap_err();
        assert!(matches!(err, Error::Decode { mode: ParseMode::Json, .. }));
    }
}
