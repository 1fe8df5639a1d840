//! Request header merging and body encoding.

use crate::{Error, Result};
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use serde::Serialize;

/// `Accept` header sent when the caller does not choose one.
pub const DEFAULT_ACCEPT: &str = "application/json, text/plain;q=0.9, */*;q=0.8";

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// A request body before encoding.
///
/// Structured data is JSON-encoded; text, binary and form payloads pass
/// through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Structured data, sent as JSON. `Null` sends no body at all.
    Json(serde_json::Value),
    /// A plain text payload.
    Text(String),
    /// A binary payload, sent untouched.
    Bytes(Bytes),
    /// URL-encoded form fields.
    Form(Vec<(String, String)>),
}

impl RequestBody {
    /// Converts any serializable value into a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if `value` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| Error::SerializationFailed(e.to_string()))
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<String> for RequestBody {
    fn from(value: String) -> Self {
        RequestBody::Text(value)
    }
}

impl From<&str> for RequestBody {
    fn from(value: &str) -> Self {
        RequestBody::Text(value.to_string())
    }
}

impl From<Bytes> for RequestBody {
    fn from(value: Bytes) -> Self {
        RequestBody::Bytes(value)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(value: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(value))
    }
}

/// Merges headers and encodes the body for transport.
///
/// Headers in `overrides` replace same-named headers from `defaults`. Neither
/// input is modified.
///
/// # Examples
///
/// ```
/// use reviewfetch::codec::{encode, RequestBody};
/// use http::HeaderMap;
///
/// let body = RequestBody::json(&serde_json::json!({ "rating": 5 })).unwrap();
/// let (headers, bytes) = encode(&HeaderMap::new(), &HeaderMap::new(), Some(&body)).unwrap();
///
/// assert_eq!(headers["content-type"], "application/json");
/// assert_eq!(bytes.unwrap().as_ref(), br#"{"rating":5}"#);
/// ```
pub fn encode(
    defaults: &HeaderMap,
    overrides: &HeaderMap,
    body: Option<&RequestBody>,
) -> Result<(HeaderMap, Option<Bytes>)> {
    let mut headers = merge_headers(defaults, overrides);

    let payload = match body {
        None | Some(RequestBody::Json(serde_json::Value::Null)) => None,
        Some(RequestBody::Json(value)) => {
            let encoded = serde_json::to_vec(value)
                .map_err(|e| Error::SerializationFailed(e.to_string()))?;
            set_default(&mut headers, CONTENT_TYPE, JSON_CONTENT_TYPE);
            Some(Bytes::from(encoded))
        }
        Some(RequestBody::Text(text)) => {
            set_default(&mut headers, CONTENT_TYPE, TEXT_CONTENT_TYPE);
            Some(Bytes::from(text.clone()))
        }
        Some(RequestBody::Bytes(bytes)) => Some(bytes.clone()),
        Some(RequestBody::Form(fields)) => {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(fields)
                .finish();
            set_default(&mut headers, CONTENT_TYPE, FORM_CONTENT_TYPE);
            Some(Bytes::from(encoded))
        }
    };

    set_default(&mut headers, ACCEPT, DEFAULT_ACCEPT);
    Ok((headers, payload))
}

fn merge_headers(defaults: &HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    let mut merged = defaults.clone();
    for name in overrides.keys() {
        merged.remove(name);
    }
    for (name, value) in overrides {
        merged.append(name.clone(), value.clone());
    }
    merged
}

fn set_default(headers: &mut HeaderMap, name: http::header::HeaderName, value: &'static str) {
    if !headers.contains_key(&name) {
        headers.insert(name, HeaderValue::from_static(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let body = RequestBody::json(&json!({ "keyword": "crash", "page": 2 })).unwrap();
        let (headers, bytes) = encode(&HeaderMap::new(), &HeaderMap::new(), Some(&body)).unwrap();

        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[ACCEPT], DEFAULT_ACCEPT);
        let decoded: serde_json::Value = serde_json::from_slice(&bytes.unwrap()).unwrap();
        assert_eq!(decoded, json!({ "keyword": "crash", "page": 2 }));
    }

    #[test]
    fn test_explicit_headers_are_kept() {
        let overrides = headers(&[
            ("content-type", "application/vnd.api+json"),
            ("accept", "text/csv"),
        ]);
        let body = RequestBody::Json(json!([1, 2]));
        let (merged, _) = encode(&HeaderMap::new(), &overrides, Some(&body)).unwrap();

        assert_eq!(merged[CONTENT_TYPE], "application/vnd.api+json");
        assert_eq!(merged[ACCEPT], "text/csv");
    }

    #[test]
    fn test_call_headers_override_defaults() {
        let defaults = headers(&[("x-client", "web"), ("x-trace", "a"), ("x-trace", "b")]);
        let overrides = headers(&[("x-trace", "c")]);
        let (merged, body) = encode(&defaults, &overrides, None).unwrap();

        assert!(body.is_none());
        assert_eq!(merged["x-client"], "web");
        let traces: Vec<_> = merged.get_all("x-trace").iter().collect();
        assert_eq!(traces, vec!["c"]);
        assert!(!merged.contains_key(CONTENT_TYPE));
        assert_eq!(defaults.get_all("x-trace").iter().count(), 2);
    }

    #[test]
    fn test_binary_passes_through() {
        let raw = Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]);
        let (headers, bytes) = encode(
            &HeaderMap::new(),
            &HeaderMap::new(),
            Some(&RequestBody::Bytes(raw.clone())),
        )
        .unwrap();

        assert_eq!(bytes, Some(raw));
        assert!(!headers.contains_key(CONTENT_TYPE));
    }

    #[test]
    fn test_form_and_text_bodies() {
        let form = RequestBody::Form(vec![("q".into(), "a b".into()), ("page".into(), "1".into())]);
        let (headers, bytes) = encode(&HeaderMap::new(), &HeaderMap::new(), Some(&form)).unwrap();
        assert_eq!(headers[CONTENT_TYPE], FORM_CONTENT_TYPE);
        assert_eq!(bytes.unwrap().as_ref(), b"q=a+b&page=1");

        let (headers, bytes) =
            encode(&HeaderMap::new(), &HeaderMap::new(), Some(&"hello".into())).unwrap();
        assert_eq!(headers[CONTENT_TYPE], TEXT_CONTENT_TYPE);
        assert_eq!(bytes.unwrap().as_ref(), b"hello");
    }

    #[test]
    fn test_null_json_sends_nothing() {
        let (headers, bytes) = encode(
            &HeaderMap::new(),
            &HeaderMap::new(),
            Some(&RequestBody::Json(serde_json::Value::Null)),
        )
        .unwrap();
        assert!(bytes.is_none());
        assert!(!headers.contains_key(CONTENT_TYPE));
    }
}
