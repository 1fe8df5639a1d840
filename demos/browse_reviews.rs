//! Example paging through app-store reviews.
//!
//! This example shows how to:
//! - Configure a client for the reviews endpoint
//! - Update filters with actions
//! - Load a first page and append the following ones
//!
//! Run with: `cargo run --example browse_reviews -- [keyword] [rating]`

use reviewfetch::reviews::{FilterState, RatingFilter, ReviewsApi};
use reviewfetch::store::{FilterAction, ReviewsStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("reviewfetch=info,browse_reviews=info")
        .init();

    let mut args = std::env::args().skip(1);
    let keyword = args.next().unwrap_or_default();
    let rating: RatingFilter = args.next().as_deref().unwrap_or("all").parse()?;

    let client = ReviewsApi::client_builder()?.build()?;
    let mut store = ReviewsStore::new(ReviewsApi::new(client));

    let filters = FilterState::default()
        .apply(FilterAction::SetKeyword(keyword))
        .apply(FilterAction::SetRating(rating));

    store.load(&filters, false).await;
    for _ in 0..2 {
        if !store.state().has_more {
            break;
        }
        store.load_more(&filters).await;
    }

    let state = store.state();
    if let Some(error) = &state.error {
        eprintln!("Could not load reviews: {}", error);
        return Ok(());
    }

    println!(
        "Loaded {} of {} reviews ({} pages)",
        state.reviews.len(),
        state.total_count,
        state.current_page
    );
    for review in &state.reviews {
        println!(
            "{} {} [{}] {}: {}",
            review.date,
            "*".repeat(review.rating as usize),
            review.country,
            review.author,
            review.title
        );
    }

    Ok(())
}
