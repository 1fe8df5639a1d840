//! Example demonstrating error handling.
//!
//! This example shows how to:
//! - Tell HTTP, decode, timeout and network failures apart
//! - Read the message, parsed body and headers of an HTTP error
//! - Check whether an error would be retried
//!
//! Run with: `cargo run --example error_handling`

use reviewfetch::{Client, Error, Payload, RequestOptions};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    id: u32,
    title: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("reviewfetch=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .build()?;

    println!("=== Example 1: Handling HTTP Errors ===");
    match client.get::<Post>("/posts/999999", RequestOptions::new()).await {
        Ok(response) => println!("Success: {:?}", response.data),
        Err(Error::HttpError {
            message,
            status,
            body,
            url,
            headers,
        }) => {
            println!("HTTP Error!");
            println!("  URL: {}", url);
            println!("  Status: {}", status);
            println!("  Message: {}", message);
            println!("  Is client error (4xx): {}", status.is_client_error());
            println!("  Parsed body: {:?}", body);
            println!("  Content-Type: {:?}", headers.get("content-type"));
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 2: Handling Decode Errors ===");
    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct WrongSchema {
        nonexistent_field: String,
    }

    match client.get::<WrongSchema>("/posts/1", RequestOptions::new()).await {
        Ok(_) => println!("Unexpected success"),
        Err(Error::Decode {
            mode,
            status,
            message,
        }) => {
            println!("Decode Failed!");
            println!("  Mode: {}", mode);
            println!("  Status: {}", status);
            println!("  Reason: {}", message);
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 3: Handling Timeouts ===");
    let options = RequestOptions::new().timeout(Duration::from_millis(1));
    match client.send("/posts", options).await {
        Ok(_) => println!("Unexpectedly fast"),
        Err(e @ Error::Timeout(_)) => {
            println!("{}", e);
            println!("  Is retryable: {}", e.is_retryable());
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 4: Handling Network Errors ===");
    let bad_client = Client::builder()
        .base_url("https://this-domain-does-not-exist-12345.com")?
        .build()?;

    match bad_client.send("/", RequestOptions::new()).await {
        Ok(_) => println!("Unexpected success"),
        Err(Error::Network(e)) => {
            println!("Network Error!");
            println!("  Error: {}", e);
            println!("  Is connect error: {}", e.is_connect());
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 5: Using Error Methods ===");
    if let Err(e) = client.send("/posts/999999", RequestOptions::new()).await {
        println!("Error occurred: {}", e);

        if e.is_retryable() {
            println!("  This error is retryable (408, 429, 5xx, timeout or network issue)");
        } else {
            println!("  This error is NOT retryable");
        }

        if let Some(status) = e.status() {
            println!("  HTTP status: {}", status);
        }
        if let Some(url) = e.url() {
            println!("  URL: {}", url);
        }
        if let Some(Payload::Json(body)) = e.body() {
            println!("  JSON body: {}", body);
        }
    }

    Ok(())
}
