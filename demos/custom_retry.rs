//! Example demonstrating retry predicates and delay policies.
//!
//! This example shows how to:
//! - Write a predicate that inspects the parsed error body
//! - Combine stock predicates with AND/OR
//! - Pick a delay policy and honor server `Retry-After` headers
//! - Override retry settings for a single request
//!
//! Run with: `cargo run --example custom_retry`

use reviewfetch::rate_limit::RateLimitConfig;
use reviewfetch::retry::{AndPredicate, OrPredicate, RetryOn5xx, RetryOnTimeout};
use reviewfetch::{Client, Error, RequestOptions, RetryDelay, RetryPredicate};
use std::time::Duration;

/// Retries when the error body's message says the upstream is busy.
struct RetryOnBusyMessage {
    patterns: Vec<&'static str>,
}

impl RetryPredicate for RetryOnBusyMessage {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        match error {
            Error::HttpError { message, .. } => {
                let message = message.to_lowercase();
                self.patterns.iter().any(|pattern| message.contains(pattern))
            }
            _ => false,
        }
    }
}

/// Stops retrying after the given 0-based attempt.
struct UpToAttempt(usize);

impl RetryPredicate for UpToAttempt {
    fn should_retry(&self, _error: &Error, attempt: usize) -> bool {
        attempt < self.0
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("reviewfetch=info,custom_retry=info")
        .init();

    println!("=== Example 1: Retry on Error Messages ===");
    let client = Client::builder()
        .base_url("https://httpbin.org")?
        .max_retries(2)
        .retry_delay(RetryDelay::Fixed(Duration::from_millis(200)))
        .retry_predicate(RetryOnBusyMessage {
            patterns: vec!["temporarily unavailable", "try again later"],
        })
        .build()?;

    match client.send("/status/503", RequestOptions::new()).await {
        Ok(response) => println!("Success! Attempts: {}", response.attempts),
        Err(e) => println!("Failed without retrying: {}", e),
    }
    println!();

    println!("=== Example 2: (5xx OR timeout) AND first two attempts ===");
    let predicate = AndPredicate::new(vec![
        Box::new(OrPredicate::new(vec![
            Box::new(RetryOn5xx),
            Box::new(RetryOnTimeout),
        ])),
        Box::new(UpToAttempt(2)),
    ]);

    let client = Client::builder()
        .base_url("https://httpbin.org")?
        .max_retries(5) // the predicate stops earlier
        .retry_delay(RetryDelay::Backoff {
            base: Duration::from_millis(100),
            cap: Duration::from_secs(1),
        })
        .retry_predicate(predicate)
        .build()?;

    match client.send("/status/500", RequestOptions::new()).await {
        Ok(_) => println!("Unexpected success"),
        Err(e) => println!("Gave up: {}", e),
    }
    println!();

    println!("=== Example 3: Honoring Retry-After ===");
    let client = Client::builder()
        .base_url("https://httpbin.org")?
        .max_retries(1)
        .rate_limit_config(
            RateLimitConfig::builder()
                .max_wait(Duration::from_secs(5))
                .build(),
        )
        .build()?;

    let start = std::time::Instant::now();
    match client
        .send("/response-headers?Retry-After=2&status=429", RequestOptions::new())
        .await
    {
        Ok(response) => println!("Status {} after {:?}", response.status, start.elapsed()),
        Err(e) => println!("Failed after {:?}: {}", start.elapsed(), e),
    }
    println!();

    println!("=== Example 4: Per-request Overrides ===");
    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .build()?;

    let options = RequestOptions::new()
        .retries(3)
        .retry_delay(RetryDelay::Custom {
            delay_fn: |attempt, _error| Duration::from_millis(150 * (attempt as u64 + 1)),
        })
        .retry_predicate(|error: &Error, _attempt: usize| error.is_retryable());

    match client.get::<serde_json::Value>("/posts/1", options).await {
        Ok(response) => {
            println!("Success!");
            println!("  Attempts: {}", response.attempts);
            println!("  Latency: {:?}", response.latency);
        }
        Err(e) => println!("Failed: {}", e),
    }

    Ok(())
}
