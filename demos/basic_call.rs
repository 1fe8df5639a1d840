//! Basic example demonstrating simple GET and POST requests.
//!
//! This example shows how to:
//! - Create a client with a base URL
//! - Make GET requests with query parameters
//! - Make POST requests with a JSON body
//! - Access response data and metadata
//!
//! Run with: `cargo run --example basic_call`

use reviewfetch::{Client, Error, Query, RequestOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Comment {
    #[serde(rename = "postId")]
    post_id: u32,
    id: u32,
    name: String,
    email: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewComment {
    name: String,
    body: String,
    #[serde(rename = "postId")]
    post_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("reviewfetch=debug,basic_call=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .build()?;

    println!("=== GET Request Example ===");
    let options = RequestOptions::new().query(Query::new().set("postId", 1));
    let response = client.get::<Vec<Comment>>("/comments", options).await?;

    let comments = response.data.unwrap_or_default();
    println!("Fetched {} comments from {}", comments.len(), response.url);
    if let Some(first) = comments.first() {
        println!("First: {} <{}>", first.name, first.email);
    }
    println!("Request latency: {:?}", response.latency);
    println!("Status code: {}", response.status);
    println!();

    println!("=== POST Request Example ===");
    let new_comment = NewComment {
        name: "Works offline now".to_string(),
        body: "The 2.1 update fixed the sync issue for me.".to_string(),
        post_id: 1,
    };

    let response = client
        .post::<_, serde_json::Value>("/comments", &new_comment, RequestOptions::new())
        .await?;

    println!("Created: {:?}", response.data);
    println!();

    println!("=== Accessing Response Metadata ===");
    println!("Content-Type: {:?}", response.header("content-type"));
    println!("Attempts: {}", response.attempts);
    println!("Was retried: {}", response.was_retried());

    Ok(())
}
