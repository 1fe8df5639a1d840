//! URL resolution and query construction.
//!
//! [`UrlBuilder`] turns a request path plus optional [`Query`] into one
//! absolute [`Url`], resolving relative paths against the configured
//! [`BaseUrl`] and execution origin.

use crate::Result;
use url::Url;

/// Origin used to resolve relative bases when none is configured.
pub const DEFAULT_ORIGIN: &str = "http://localhost";

/// The base every relative request path is resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseUrl {
    /// No base configured; paths resolve against the execution origin.
    Origin,
    /// An absolute `http(s)://` base, always stored with a trailing slash.
    Absolute(Url),
    /// A root-relative base such as `/api`, stored without surrounding slashes.
    Relative(String),
}

impl BaseUrl {
    /// Classifies a configured base URL string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`](crate::Error::InvalidUrl) if an absolute
    /// base does not parse.
    ///
    /// # Examples
    ///
    /// ```
    /// use reviewfetch::endpoint::BaseUrl;
    ///
    /// assert_eq!(BaseUrl::parse("").unwrap(), BaseUrl::Origin);
    /// assert_eq!(BaseUrl::parse("/api/").unwrap(), BaseUrl::Relative("api".into()));
    /// assert!(matches!(BaseUrl::parse("https://api.example.com").unwrap(), BaseUrl::Absolute(_)));
    /// ```
    pub fn parse(base: &str) -> Result<Self> {
        if base.is_empty() {
            return Ok(BaseUrl::Origin);
        }
        if is_absolute(base) {
            let mut url = Url::parse(base)?;
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            return Ok(BaseUrl::Absolute(url));
        }
        Ok(BaseUrl::Relative(
            base.trim_start_matches('/').trim_end_matches('/').to_string(),
        ))
    }
}

impl Default for BaseUrl {
    fn default() -> Self {
        BaseUrl::Origin
    }
}

/// A single query parameter value.
///
/// Scalars are stringified, [`QueryValue::Absent`] is omitted, and lists
/// expand to one repeated key per element.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// Skipped when the URL is built.
    Absent,
    /// A string value.
    Text(String),
    /// An integer value.
    Integer(i64),
    /// A floating-point value.
    Number(f64),
    /// A boolean, rendered as `true` or `false`.
    Bool(bool),
    /// Repeated values for the same key, kept in order.
    List(Vec<QueryValue>),
}

impl QueryValue {
    /// Renders the value the way it appears in a query string.
    ///
    /// Returns `None` for [`QueryValue::Absent`]. Nested lists render as their
    /// elements joined by commas.
    pub fn render(&self) -> Option<String> {
        match self {
            QueryValue::Absent => None,
            QueryValue::Text(s) => Some(s.clone()),
            QueryValue::Integer(i) => Some(i.to_string()),
            QueryValue::Number(n) => Some(render_number(*n)),
            QueryValue::Bool(b) => Some(b.to_string()),
            QueryValue::List(items) => Some(
                items
                    .iter()
                    .map(|item| item.render().unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        }
    }
}

fn render_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<&String> for QueryValue {
    fn from(value: &String) -> Self {
        QueryValue::Text(value.clone())
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Number(value)
    }
}

macro_rules! integer_query_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for QueryValue {
                fn from(value: $ty) -> Self {
                    QueryValue::Integer(value as i64)
                }
            }
        )*
    };
}

integer_query_value!(i32, i64, u8, u16, u32, usize);

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(QueryValue::Absent, Into::into)
    }
}

impl<T: Into<QueryValue>> From<Vec<T>> for QueryValue {
    fn from(values: Vec<T>) -> Self {
        QueryValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Query data for one request: keys in insertion order, one value per key.
///
/// # Examples
///
/// ```
/// use reviewfetch::Query;
///
/// let query = Query::new()
///     .set("q", "crash")
///     .set("tag", vec!["ios", "android"])
///     .set("version", None::<String>);
/// assert_eq!(query.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    entries: Vec<(String, QueryValue)>,
}

impl Query {
    /// Creates an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing an earlier value for the same key in place.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// In-place form of [`Query::set`].
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Returns the value stored for `key`.
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Number of keys, absent ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no keys are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the keys and values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Writes the query onto `url`.
    ///
    /// Scalars replace any pair with the same key already on the URL; list
    /// elements are appended in order. When nothing renders, `url` is left as is.
    pub fn apply_to(&self, url: &mut Url) {
        if self.is_empty() {
            return;
        }

        let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let mut written = false;
        for (key, value) in &self.entries {
            match value {
                QueryValue::Absent => {}
                QueryValue::List(items) => {
                    for item in items {
                        if let Some(rendered) = item.render() {
                            pairs.push((key.clone(), rendered));
                            written = true;
                        }
                    }
                }
                scalar => {
                    if let Some(rendered) = scalar.render() {
                        set_pair(&mut pairs, key, rendered);
                        written = true;
                    }
                }
            }
        }

        // Pairs that render to nothing leave the URL's own query as written.
        if written {
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }
    }
}

fn set_pair(pairs: &mut Vec<(String, String)>, key: &str, value: String) {
    match pairs.iter().position(|(k, _)| k == key) {
        Some(first) => {
            pairs[first].1 = value;
            let mut index = 0;
            pairs.retain(|(k, _)| {
                let keep = index <= first || k != key;
                index += 1;
                keep
            });
        }
        None => pairs.push((key.to_string(), value)),
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Query::new();
        for (key, value) in iter {
            query.insert(key, value);
        }
        query
    }
}

/// Resolves request paths into absolute URLs.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    base: BaseUrl,
    origin: Url,
}

impl UrlBuilder {
    /// Creates a builder from a base and the execution origin.
    pub fn new(base: BaseUrl, origin: Url) -> Self {
        Self { base, origin }
    }

    /// The configured base.
    pub fn base(&self) -> &BaseUrl {
        &self.base
    }

    /// The execution origin used for relative bases.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Builds the absolute URL for `path`, appending `query` if given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`](crate::Error::InvalidUrl) when the
    /// resulting URL does not parse.
    ///
    /// # Examples
    ///
    /// ```
    /// use reviewfetch::endpoint::{BaseUrl, UrlBuilder};
    /// use reviewfetch::Query;
    ///
    /// let builder = UrlBuilder::new(
    ///     BaseUrl::parse("https://api.example.com/v1").unwrap(),
    ///     "http://localhost".parse().unwrap(),
    /// );
    /// let url = builder
    ///     .build("/reviews", Some(&Query::new().set("page", 2)))
    ///     .unwrap();
    /// assert_eq!(url.as_str(), "https://api.example.com/v1/reviews?page=2");
    /// ```
    pub fn build(&self, path: &str, query: Option<&Query>) -> Result<Url> {
        let mut url = if is_absolute(path) {
            Url::parse(path)?
        } else {
            self.absolute_base()?.join(path.trim_start_matches('/'))?
        };

        if let Some(query) = query {
            query.apply_to(&mut url);
        }
        Ok(url)
    }

    fn absolute_base(&self) -> Result<Url> {
        let origin = self.origin.origin().ascii_serialization();
        let base = match &self.base {
            BaseUrl::Origin => Url::parse(&format!("{}/", origin))?,
            BaseUrl::Absolute(url) => url.clone(),
            BaseUrl::Relative(path) if path.is_empty() => Url::parse(&format!("{}/", origin))?,
            BaseUrl::Relative(path) => Url::parse(&format!("{}/{}/", origin, path))?,
        };
        Ok(base)
    }
}

fn is_absolute(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(base: &str) -> UrlBuilder {
        UrlBuilder::new(
            BaseUrl::parse(base).unwrap(),
            Url::parse(DEFAULT_ORIGIN).unwrap(),
        )
    }

    #[test]
    fn test_absolute_base_single_separator() {
        for base in ["https://api.example.com/v1", "https://api.example.com/v1/"] {
            for path in ["reviews", "/reviews", "//reviews"] {
                let url = builder(base).build(path, None).unwrap();
                assert_eq!(url.as_str(), "https://api.example.com/v1/reviews");
            }
        }
    }

    #[test]
    fn test_no_base_uses_origin() {
        let url = builder("").build("/reviews", None).unwrap();
        assert_eq!(url.as_str(), "http://localhost/reviews");
    }

    #[test]
    fn test_relative_base_resolves_against_origin() {
        let custom = UrlBuilder::new(
            BaseUrl::parse("/api/").unwrap(),
            Url::parse("https://reviews.example.com:8443/some/page").unwrap(),
        );
        let url = custom.build("reviews", None).unwrap();
        assert_eq!(url.as_str(), "https://reviews.example.com:8443/api/reviews");

        let url = builder("api").build("/reviews", None).unwrap();
        assert_eq!(url.as_str(), "http://localhost/api/reviews");
    }

    #[test]
    fn test_absolute_path_ignores_base() {
        let url = builder("/api")
            .build(
                "HTTPS://other.example.com/x",
                Some(&Query::new().set("a", 1)),
            )
            .unwrap();
        assert_eq!(url.as_str(), "https://other.example.com/x?a=1");
    }

    #[test]
    fn test_lists_repeat_and_absent_skipped() {
        let query = Query::new()
            .set("tag", vec!["b", "a", "c"])
            .set("skip", QueryValue::Absent)
            .set("maybe", vec![Some("x"), None, Some("y")])
            .set("flag", true);
        let url = builder("https://api.example.com")
            .build("/r", Some(&query))
            .unwrap();
        assert_eq!(url.query(), Some("tag=b&tag=a&tag=c&maybe=x&maybe=y&flag=true"));
    }

    #[test]
    fn test_scalar_replaces_existing_pair() {
        let query = Query::new().set("page", 3).set("count", 25);
        let url = builder("https://api.example.com")
            .build("/r?page=1&x=y&page=9", Some(&query))
            .unwrap();
        assert_eq!(url.query(), Some("page=3&x=y&count=25"));
    }

    #[test]
    fn test_value_rendering() {
        assert_eq!(QueryValue::Number(2.0).render().as_deref(), Some("2"));
        assert_eq!(QueryValue::Number(2.5).render().as_deref(), Some("2.5"));
        assert_eq!(QueryValue::Integer(-4).render().as_deref(), Some("-4"));
        assert_eq!(QueryValue::Absent.render(), None);
        assert_eq!(
            QueryValue::from(vec![1, 2]).render().as_deref(),
            Some("1,2")
        );
    }

    #[test]
    fn test_encoding_and_empty_query() {
        let url = builder("https://api.example.com")
            .build("/r", Some(&Query::new().set("q", "app crash&burn")))
            .unwrap();
        assert_eq!(url.query(), Some("q=app+crash%26burn"));

        let url = builder("https://api.example.com")
            .build("/r", Some(&Query::new().set("q", None::<&str>)))
            .unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_absent_values_leave_existing_query_untouched() {
        let query = Query::new()
            .set("skip", None::<&str>)
            .set("tags", Vec::<String>::new());
        let url = builder("https://api.example.com")
            .build("/r?flag&a=~", Some(&query))
            .unwrap();
        assert_eq!(url.query(), Some("flag&a=~"));
    }

    #[test]
    fn test_query_set_replaces_in_place() {
        let query = Query::new().set("a", 1).set("b", 2).set("a", 3);
        let keys: Vec<_> = query.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(query.get("a"), Some(&QueryValue::Integer(3)));
    }
}
