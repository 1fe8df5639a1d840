//! Example demonstrating timeouts and caller cancellation.
//!
//! This example shows how to:
//! - Bound each attempt with a timeout
//! - Cancel an in-flight request from another task
//! - Tell a timeout apart from a cancellation
//!
//! Run with: `cargo run --example cancellation`

use reviewfetch::{CancellationToken, Client, Error, RequestOptions};
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("reviewfetch=debug,cancellation=info")
        .init();

    let client = Client::builder()
        .base_url("https://httpbin.org")?
        .timeout(Duration::from_secs(2))
        .max_retries(1)
        .build()?;

    println!("=== Example 1: Timeout ===");
    let start = Instant::now();
    match client.send("/delay/5", RequestOptions::new()).await {
        Ok(_) => println!("Unexpected success"),
        Err(Error::Timeout(after)) => {
            println!("Each attempt timed out after {:?}", after);
            println!("Total time including one retry: {:?}", start.elapsed());
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 2: Cancelling from another task ===");
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        println!("Cancelling...");
        canceller.cancel();
    });

    let start = Instant::now();
    let options = RequestOptions::new().signal(token).timeout(Duration::from_secs(10));
    match client.send("/delay/5", options).await {
        Ok(_) => println!("Unexpected success"),
        Err(e) if e.is_cancelled() => {
            println!("Cancelled after {:?}, no retry attempted", start.elapsed());
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 3: Already-cancelled token ===");
    let token = CancellationToken::new();
    token.cancel();
    match client.send("/get", RequestOptions::new().signal(token)).await {
        Ok(_) => println!("Unexpected success"),
        Err(e) => println!("Failed immediately: {}", e),
    }

    Ok(())
}
