//! State for the reviews browser.
//!
//! Both states are plain values updated by pure `apply` transitions.
//! [`ReviewsStore`] owns a [`ReviewState`] and drives it from a
//! [`ReviewsApi`].

use crate::reviews::{FilterState, RatingFilter, Review, ReviewsApi};

/// A change to the filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAction {
    /// Replace the search text.
    SetKeyword(String),
    /// Replace the star filter.
    SetRating(RatingFilter),
    /// Jump to a 1-based page.
    SetPage(u32),
    /// Back to an empty keyword, any rating, page 1.
    Reset,
}

impl FilterState {
    /// Returns the filters after `action`.
    ///
    /// # Examples
    ///
    /// ```
    /// use reviewfetch::reviews::{FilterState, RatingFilter};
    /// use reviewfetch::store::FilterAction;
    ///
    /// let filters = FilterState::default()
    ///     .apply(FilterAction::SetKeyword("crash".into()))
    ///     .apply(FilterAction::SetRating(RatingFilter::Stars(1)));
    /// assert_eq!(filters.keyword, "crash");
    /// assert_eq!(filters.apply(FilterAction::Reset), FilterState::default());
    /// ```
    pub fn apply(self, action: FilterAction) -> Self {
        match action {
            FilterAction::SetKeyword(keyword) => Self { keyword, ..self },
            FilterAction::SetRating(rating) => Self { rating, ..self },
            FilterAction::SetPage(page) => Self { page, ..self },
            FilterAction::Reset => Self::default(),
        }
    }
}

/// What the reviews list shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReviewState {
    /// Every review loaded so far, in page order.
    pub reviews: Vec<Review>,
    /// The subset currently shown.
    pub filtered_reviews: Vec<Review>,
    /// A fetch is in flight.
    pub is_loading: bool,
    /// Message of the last failed fetch.
    pub error: Option<String>,
    /// Reviews matching the filters across all pages.
    pub total_count: u64,
    /// 0 until the first page has loaded.
    pub current_page: u32,
    /// Whether another page can be loaded.
    pub has_more: bool,
}

/// A change to the review list.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewAction {
    /// Mark a fetch as started or finished.
    SetLoading(bool),
    /// Record or clear the error message.
    SetError(Option<String>),
    /// Replace the list with a first page.
    SetReviews {
        reviews: Vec<Review>,
        total_count: u64,
        has_more: bool,
    },
    /// Add a following page to the list.
    AppendReviews { reviews: Vec<Review>, has_more: bool },
    /// Replace only the shown subset.
    SetFilteredReviews(Vec<Review>),
    /// Move to the next page number.
    IncrementPage,
    /// Back to page 1.
    ResetPage,
}

impl ReviewState {
    /// Returns the state after `action`.
    pub fn apply(self, action: ReviewAction) -> Self {
        match action {
            ReviewAction::SetLoading(is_loading) => Self { is_loading, ..self },
            ReviewAction::SetError(error) => Self { error, ..self },
            ReviewAction::SetReviews {
                reviews,
                total_count,
                has_more,
            } => Self {
                filtered_reviews: reviews.clone(),
                reviews,
                total_count,
                has_more,
                current_page: 1,
                is_loading: false,
                error: None,
            },
            ReviewAction::AppendReviews { reviews, has_more } => {
                let mut all = self.reviews;
                all.extend(reviews);
                Self {
                    filtered_reviews: all.clone(),
                    reviews: all,
                    has_more,
                    is_loading: false,
                    ..self
                }
            }
            ReviewAction::SetFilteredReviews(filtered_reviews) => Self {
                filtered_reviews,
                ..self
            },
            ReviewAction::IncrementPage => Self {
                current_page: self.current_page.saturating_add(1),
                ..self
            },
            ReviewAction::ResetPage => Self {
                current_page: 1,
                ..self
            },
        }
    }
}

/// Holds the review list and loads pages into it.
///
/// # Examples
///
/// ```no_run
/// use reviewfetch::reviews::{FilterState, ReviewsApi};
/// use reviewfetch::store::ReviewsStore;
///
/// # async fn example() -> Result<(), reviewfetch::Error> {
/// let api = ReviewsApi::new(ReviewsApi::client_builder()?.build()?);
/// let mut store = ReviewsStore::new(api);
///
/// let filters = FilterState::default();
/// store.load(&filters, false).await;
/// while store.state().has_more {
///     store.load_more(&filters).await;
/// }
/// println!("{} reviews loaded", store.state().reviews.len());
/// # Ok(())
/// # }
/// ```
pub struct ReviewsStore {
    api: ReviewsApi,
    state: ReviewState,
}

impl ReviewsStore {
    /// Creates a store with an empty list that fetches through `api`.
    pub fn new(api: ReviewsApi) -> Self {
        Self {
            api,
            state: ReviewState::default(),
        }
    }

    /// The current state.
    pub fn state(&self) -> &ReviewState {
        &self.state
    }

    /// Applies `action` to the held state.
    pub fn dispatch(&mut self, action: ReviewAction) {
        self.state = std::mem::take(&mut self.state).apply(action);
    }

    /// Fetches the page `filters` point at.
    ///
    /// With `append` the page is added to the list, otherwise it replaces it.
    /// A failed fetch leaves the list alone and records the error message.
    pub async fn load(&mut self, filters: &FilterState, append: bool) {
        self.dispatch(ReviewAction::SetLoading(true));
        self.dispatch(ReviewAction::SetError(None));

        match self.api.fetch(filters, None).await {
            Ok(page) => {
                let has_more = page.has_more();
                let action = if append {
                    ReviewAction::AppendReviews {
                        reviews: page.reviews,
                        has_more,
                    }
                } else {
                    ReviewAction::SetReviews {
                        reviews: page.reviews,
                        total_count: page.total,
                        has_more,
                    }
                };
                self.dispatch(action);
            }
            Err(e) => {
                tracing::warn!(error = %e, page = filters.page, "Failed to load reviews");
                self.dispatch(ReviewAction::SetError(Some(e.to_string())));
                self.dispatch(ReviewAction::SetLoading(false));
            }
        }
    }

    /// Loads the page after the current one and appends it.
    pub async fn load_more(&mut self, filters: &FilterState) {
        let next = filters
            .clone()
            .apply(FilterAction::SetPage(self.state.current_page.saturating_add(1)));
        self.dispatch(ReviewAction::IncrementPage);
        self.load(&next, true).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: &str) -> Review {
        Review {
            id: id.into(),
            rating: 4,
            title: String::new(),
            body: String::new(),
            author: String::new(),
            date: "2024-01-01".into(),
            version: "1.0".into(),
            country: "US".into(),
            store: "apple".into(),
            product_name: "Widget".into(),
            has_response: false,
            is_deleted: false,
            original_title: None,
            original_review: None,
        }
    }

    #[test]
    fn test_filter_updates_keep_other_fields() {
        let filters = FilterState::default()
            .apply(FilterAction::SetPage(3))
            .apply(FilterAction::SetKeyword("slow".into()));
        assert_eq!(filters.page, 3);
        assert_eq!(filters.keyword, "slow");
        assert_eq!(filters.rating, RatingFilter::All);
    }

    #[test]
    fn test_set_reviews_resets_page_and_error() {
        let state = ReviewState {
            error: Some("boom".into()),
            current_page: 4,
            is_loading: true,
            ..ReviewState::default()
        }
        .apply(ReviewAction::SetReviews {
            reviews: vec![review("a")],
            total_count: 10,
            has_more: true,
        });

        assert_eq!(state.current_page, 1);
        assert_eq!(state.error, None);
        assert!(!state.is_loading);
        assert_eq!(state.total_count, 10);
        assert_eq!(state.filtered_reviews, state.reviews);
    }

    #[test]
    fn test_append_extends_list() {
        let state = ReviewState::default()
            .apply(ReviewAction::SetReviews {
                reviews: vec![review("a")],
                total_count: 2,
                has_more: true,
            })
            .apply(ReviewAction::IncrementPage)
            .apply(ReviewAction::AppendReviews {
                reviews: vec![review("b")],
                has_more: false,
            });

        let ids: Vec<_> = state.reviews.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(state.filtered_reviews.len(), 2);
        assert_eq!(state.current_page, 2);
        assert_eq!(state.total_count, 2);
        assert!(!state.has_more);
    }

    #[test]
    fn test_filtered_reviews_and_page_reset() {
        let state = ReviewState::default()
            .apply(ReviewAction::SetFilteredReviews(vec![review("z")]))
            .apply(ReviewAction::IncrementPage)
            .apply(ReviewAction::IncrementPage)
            .apply(ReviewAction::ResetPage);
        assert_eq!(state.filtered_reviews.len(), 1);
        assert!(state.reviews.is_empty());
        assert_eq!(state.current_page, 1);
    }

    #[test]
    fn test_increment_page_stops_at_max() {
        let state = ReviewState {
            current_page: u32::MAX,
            ..ReviewState::default()
        }
        .apply(ReviewAction::IncrementPage);
        assert_eq!(state.current_page, u32::MAX);
    }
}
