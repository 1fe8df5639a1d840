//! The app-store reviews endpoint.
//!
//! [`FilterState`] turns the user's filters into query parameters,
//! [`ReviewRecord`] is the wire shape of one review and [`Review`] the shape
//! handed to callers. [`ReviewsApi`] ties them to a [`Client`].

use crate::{CancellationToken, Client, ClientBuilder, Query, RequestOptions, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Reviews requested per page.
pub const PAGE_SIZE: u32 = 25;

/// Sort order sent with every request: newest first.
pub const SORT_ORDER: &str = "-date";

/// The public reviews endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://appfigures.com/_u/careers/api/reviews";

/// Star rating filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatingFilter {
    /// Any rating.
    #[default]
    All,
    /// Exactly this many stars, `1..=5`.
    Stars(u8),
}

impl fmt::Display for RatingFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingFilter::All => f.write_str("all"),
            RatingFilter::Stars(stars) => write!(f, "{}", stars),
        }
    }
}

/// Returned when a rating filter is neither `all` nor `1`..`5`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid rating filter: {0:?}")]
pub struct InvalidRating(pub String);

impl FromStr for RatingFilter {
    type Err = InvalidRating;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "all" | "" => Ok(RatingFilter::All),
            other => match other.parse::<u8>() {
                Ok(stars @ 1..=5) => Ok(RatingFilter::Stars(stars)),
                _ => Err(InvalidRating(s.to_string())),
            },
        }
    }
}

/// The user's current filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    /// Free-text search; empty means no search.
    pub keyword: String,
    /// Star rating filter.
    pub rating: RatingFilter,
    /// 1-based page number.
    pub page: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            rating: RatingFilter::All,
            page: 1,
        }
    }
}

impl FilterState {
    /// Query parameters for these filters: `q`, `rating`, `page`, `count`, `sort`.
    ///
    /// `q` is left out when the keyword is empty and `rating` when it is
    /// [`RatingFilter::All`].
    ///
    /// # Examples
    ///
    /// ```
    /// use reviewfetch::reviews::{FilterState, RatingFilter};
    ///
    /// let filters = FilterState {
    ///     keyword: "crash".to_string(),
    ///     rating: RatingFilter::Stars(3),
    ///     page: 2,
    /// };
    /// let mut url = url::Url::parse("https://example.com/reviews").unwrap();
    /// filters.to_query().apply_to(&mut url);
    /// assert_eq!(url.query(), Some("q=crash&rating=3&page=2&count=25&sort=-date"));
    /// ```
    pub fn to_query(&self) -> Query {
        let keyword = (!self.keyword.is_empty()).then(|| self.keyword.clone());
        let rating = match self.rating {
            RatingFilter::All => None,
            RatingFilter::Stars(stars) => Some(stars),
        };

        Query::new()
            .set("q", keyword)
            .set("rating", rating)
            .set("page", self.page)
            .set("count", PAGE_SIZE)
            .set("sort", SORT_ORDER)
    }
}

/// One review as the endpoint sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Upstream review id.
    pub id: String,
    /// Reviewer's display name.
    pub author: String,
    /// Review headline, possibly translated.
    pub title: String,
    /// Review text, possibly translated.
    pub review: String,
    /// Headline in the reviewer's language, when translated.
    #[serde(default)]
    pub original_title: Option<String>,
    /// Text in the reviewer's language, when translated.
    #[serde(default)]
    pub original_review: Option<String>,
    /// Decimal star rating, e.g. `"4.00"`.
    pub stars: String,
    /// ISO country code.
    pub iso: String,
    /// App version the review was written against.
    pub version: String,
    /// ISO date-time.
    pub date: String,
    /// Removed from the store.
    #[serde(default)]
    pub deleted: bool,
    /// The developer has replied.
    #[serde(default)]
    pub has_response: bool,
    /// Internal product id.
    #[serde(default)]
    pub product: Option<u64>,
    /// Store-side product id.
    #[serde(default)]
    pub product_id: Option<u64>,
    /// App name.
    pub product_name: String,
    /// Vendor's own id for the product.
    #[serde(default)]
    pub vendor_id: Option<String>,
    /// Store the review came from, e.g. `apple`.
    pub store: String,
    /// Relevance weight.
    #[serde(default)]
    pub weight: Option<f64>,
    /// Languages the text was detected as.
    #[serde(default)]
    pub predicted_langs: Vec<String>,
}

/// The endpoint's response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewsEnvelope {
    /// Reviews on this page.
    pub reviews: Vec<ReviewRecord>,
    /// Matching reviews across all pages.
    pub total: u64,
    /// 1-based number of this page.
    pub this_page: u32,
    /// Number of pages.
    pub pages: u32,
}

/// A review ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    /// Upstream review id.
    pub id: String,
    /// Whole stars, 0 when the upstream value is not a number.
    pub rating: u8,
    /// Headline.
    pub title: String,
    /// Review text.
    pub body: String,
    /// Reviewer's display name.
    pub author: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// App version reviewed.
    pub version: String,
    /// ISO country code.
    pub country: String,
    /// Store the review came from.
    pub store: String,
    /// App name.
    pub product_name: String,
    /// The developer has replied.
    pub has_response: bool,
    /// Removed from the store.
    pub is_deleted: bool,
    /// Untranslated headline, if any.
    pub original_title: Option<String>,
    /// Untranslated text, if any.
    pub original_review: Option<String>,
}

impl From<ReviewRecord> for Review {
    fn from(record: ReviewRecord) -> Self {
        let rating = record
            .stars
            .trim()
            .parse::<f64>()
            .map(|stars| stars.round().clamp(0.0, u8::MAX as f64) as u8)
            .unwrap_or(0);
        let date = match record.date.split_once('T') {
            Some((day, _)) => day.to_string(),
            None => record.date,
        };

        Self {
            id: record.id,
            rating,
            title: record.title,
            body: record.review,
            author: record.author,
            date,
            version: record.version,
            country: record.iso,
            store: record.store,
            product_name: record.product_name,
            has_response: record.has_response,
            is_deleted: record.deleted,
            original_title: record.original_title,
            original_review: record.original_review,
        }
    }
}

/// One page of reviews.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReviewsPage {
    /// Reviews on this page.
    pub reviews: Vec<Review>,
    /// Matching reviews across all pages.
    pub total: u64,
    /// 1-based number of this page.
    pub page: u32,
    /// Number of pages.
    pub pages: u32,
}

impl ReviewsPage {
    /// Returns `true` if there are pages after this one.
    pub fn has_more(&self) -> bool {
        self.page < self.pages
    }
}

impl From<ReviewsEnvelope> for ReviewsPage {
    fn from(envelope: ReviewsEnvelope) -> Self {
        Self {
            reviews: envelope.reviews.into_iter().map(Review::from).collect(),
            total: envelope.total,
            page: envelope.this_page,
            pages: envelope.pages,
        }
    }
}

/// Client for the reviews endpoint.
///
/// # Examples
///
/// ```no_run
/// use reviewfetch::reviews::{FilterState, ReviewsApi};
///
/// # async fn example() -> Result<(), reviewfetch::Error> {
/// let api = ReviewsApi::new(ReviewsApi::client_builder()?.build()?);
/// let page = api.fetch(&FilterState::default(), None).await?;
/// println!("{} of {} reviews", page.reviews.len(), page.total);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ReviewsApi {
    client: Client,
    endpoint: String,
}

impl ReviewsApi {
    /// Uses the public endpoint.
    pub fn new(client: Client) -> Self {
        Self::with_endpoint(client, DEFAULT_ENDPOINT)
    }

    /// Uses another endpoint, absolute or relative to the client's base URL.
    pub fn with_endpoint(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// A client builder with the settings the reviews browser uses:
    /// `/api` base, 12 second timeout and two retries.
    ///
    /// # Errors
    ///
    /// Propagates [`ClientBuilder::base_url`] failures.
    pub fn client_builder() -> Result<ClientBuilder> {
        Ok(Client::builder()
            .base_url("/api")?
            .timeout(Duration::from_secs(12))
            .max_retries(2))
    }

    /// The endpoint requests go to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetches the page of reviews matching `filters`.
    ///
    /// A response without content yields an empty page.
    ///
    /// # Errors
    ///
    /// Returns the client's error when the request fails.
    pub async fn fetch(
        &self,
        filters: &FilterState,
        signal: Option<CancellationToken>,
    ) -> Result<ReviewsPage> {
        let mut options = RequestOptions::new().query(filters.to_query());
        if let Some(signal) = signal {
            options = options.signal(signal);
        }

        tracing::debug!(
            keyword = %filters.keyword,
            rating = %filters.rating,
            page = filters.page,
            "Fetching reviews"
        );

        let response = self
            .client
            .get::<ReviewsEnvelope>(&self.endpoint, options)
            .await?;
        let page = response.data.map(ReviewsPage::from).unwrap_or_default();

        tracing::info!(
            count = page.reviews.len(),
            total = page.total,
            page = page.page,
            pages = page.pages,
            "Fetched reviews"
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn record(stars: &str, date: &str) -> ReviewRecord {
        ReviewRecord {
            id: "r1".into(),
            author: "sam".into(),
            title: "Crashes".into(),
            review: "Crashes on launch".into(),
            original_title: None,
            original_review: None,
            stars: stars.into(),
            iso: "US".into(),
            version: "2.1".into(),
            date: date.into(),
            deleted: false,
            has_response: true,
            product: Some(7),
            product_id: Some(7),
            product_name: "Widget".into(),
            vendor_id: None,
            store: "apple".into(),
            weight: None,
            predicted_langs: vec!["en".into()],
        }
    }

    fn query_string(filters: &FilterState) -> Option<String> {
        let mut url = Url::parse("https://example.com/reviews").unwrap();
        filters.to_query().apply_to(&mut url);
        url.query().map(str::to_string)
    }

    #[test]
    fn test_full_filter_query() {
        let filters = FilterState {
            keyword: "crash".into(),
            rating: RatingFilter::Stars(3),
            page: 2,
        };
        assert_eq!(
            query_string(&filters).as_deref(),
            Some("q=crash&rating=3&page=2&count=25&sort=-date")
        );
    }

    #[test]
    fn test_default_filter_query_omits_keyword_and_rating() {
        assert_eq!(
            query_string(&FilterState::default()).as_deref(),
            Some("page=1&count=25&sort=-date")
        );
    }

    #[test]
    fn test_keyword_is_form_encoded() {
        let filters = FilterState {
            keyword: "login screen".into(),
            ..FilterState::default()
        };
        assert_eq!(
            query_string(&filters).as_deref(),
            Some("q=login+screen&page=1&count=25&sort=-date")
        );
    }

    #[test]
    fn test_rating_filter_parse_and_display() {
        assert_eq!("all".parse::<RatingFilter>(), Ok(RatingFilter::All));
        assert_eq!("4".parse::<RatingFilter>(), Ok(RatingFilter::Stars(4)));
        assert!("0".parse::<RatingFilter>().is_err());
        assert!("6".parse::<RatingFilter>().is_err());
        assert!("three".parse::<RatingFilter>().is_err());
        assert_eq!(RatingFilter::Stars(5).to_string(), "5");
        assert_eq!(RatingFilter::All.to_string(), "all");
    }

    #[test]
    fn test_review_from_record() {
        let review = Review::from(record("3.00", "2024-03-05T10:22:01"));
        assert_eq!(review.rating, 3);
        assert_eq!(review.date, "2024-03-05");
        assert_eq!(review.body, "Crashes on launch");
        assert_eq!(review.country, "US");
        assert!(review.has_response);
        assert!(!review.is_deleted);
    }

    #[test]
    fn test_review_rating_rounds_and_tolerates_garbage() {
        assert_eq!(Review::from(record("4.50", "2024-01-01")).rating, 5);
        assert_eq!(Review::from(record("1.49", "2024-01-01")).rating, 1);
        assert_eq!(Review::from(record("n/a", "2024-01-01")).rating, 0);
        assert_eq!(Review::from(record("2", "2024-01-01")).date, "2024-01-01");
    }

    #[test]
    fn test_envelope_deserializes_sparse_records() {
        let envelope: ReviewsEnvelope = serde_json::from_value(serde_json::json!({
            "reviews": [{
                "id": "a",
                "author": "kim",
                "title": "Nice",
                "review": "Works well",
                "stars": "5.00",
                "iso": "GB",
                "version": "1.0",
                "date": "2024-02-29T00:00:00",
                "product_name": "Widget",
                "store": "google_play"
            }],
            "total": 51,
            "this_page": 1,
            "pages": 3
        }))
        .unwrap();

        let page = ReviewsPage::from(envelope);
        assert_eq!(page.reviews.len(), 1);
        assert_eq!(page.reviews[0].rating, 5);
        assert!(page.has_more());
        assert!(!ReviewsPage::default().has_more());
    }

    #[test]
    fn test_client_builder_settings() {
        let client = ReviewsApi::client_builder().unwrap().build().unwrap();
        assert_eq!(client.config().timeout(), Duration::from_secs(12));
        assert_eq!(client.config().max_retries(), 2);
        assert_eq!(ReviewsApi::new(client).endpoint(), DEFAULT_ENDPOINT);
    }
}
