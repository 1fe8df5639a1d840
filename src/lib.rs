//! # reviewfetch - fetch app-store reviews over a retry-aware HTTP client
//!
//! The crate is built around a generic HTTP [`Client`] on top of `reqwest`.
//! It resolves paths against a base URL, encodes bodies and headers, bounds
//! every attempt with a timeout, honors caller cancellation, decodes
//! responses by content type, and retries transient failures with jittered
//! exponential backoff. The [`reviews`] and [`store`] modules use it to page
//! through an app-store reviews endpoint.
//!
//! ## Quick Start
//!
//! ```no_run
//! use reviewfetch::{Client, RequestOptions};
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct Reply {
//!     body: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct Summary {
//!     total: u64,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), reviewfetch::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")?
//!         .timeout(Duration::from_secs(12))
//!         .max_retries(2)
//!         .build()?;
//!
//!     let summary = client
//!         .get::<Summary>("/reviews/summary", RequestOptions::new().query_param("rating", 5))
//!         .await?;
//!     println!("{:?} reviews in {:?}", summary.data.map(|s| s.total), summary.latency);
//!
//!     let reply = Reply { body: "Fixed in 2.1".to_string() };
//!     client
//!         .post::<_, serde_json::Value>("/reviews/42/replies", &reply, RequestOptions::new())
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Base URL resolution** - Absolute, root-relative or empty bases, with repeated query keys for lists
//! - **Body encoding** - JSON, text, form and raw bodies with matching `Content-Type` defaults
//! - **Response parsing** - Auto-detected JSON/text, or forced JSON, text, blob, bytes or none
//! - **Timeouts and cancellation** - Per-attempt timeouts plus caller-owned `CancellationToken`s
//! - **Retries** - Jittered exponential backoff and pluggable retry predicates
//! - **Observers** - Hooks that see every attempt and its response headers
//! - **Automatic logging** - Structured logging with `tracing`
//!
//! ## Error Handling
//!
//! Failed requests carry what is needed to report them:
//!
//! ```no_run
//! use reviewfetch::{Client, Error, RequestOptions};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().base_url("https://api.example.com")?.build()?;
//! match client.get::<serde_json::Value>("/reviews", RequestOptions::new()).await {
//!     Ok(response) => println!("Success: {:?}", response.data),
//!     Err(Error::HttpError { status, message, url, .. }) => {
//!         eprintln!("{} returned {}: {}", url, status, message);
//!     }
//!     Err(Error::Timeout(after)) => eprintln!("Gave up after {:?}", after),
//!     Err(Error::Cancelled) => eprintln!("Cancelled"),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Retries
//!
//! ```no_run
//! use reviewfetch::{Client, RetryDelay, retry::{OrPredicate, RetryOn5xx, RetryOnTimeout}};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), reviewfetch::Error> {
//! let client = Client::builder()
//!     .base_url("https://api.example.com")?
//!     .max_retries(3)
//!     .retry_delay(RetryDelay::Backoff {
//!         base: Duration::from_millis(250),
//!         cap: Duration::from_secs(4),
//!     })
//!     .retry_predicate(OrPredicate::new(vec![
//!         Box::new(RetryOn5xx),
//!         Box::new(RetryOnTimeout),
//!     ]))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

pub mod cancel;
mod client;
pub mod codec;
pub mod endpoint;
pub mod error;
mod observer;
mod options;
pub mod parse;
pub mod rate_limit;
mod response;
pub mod retry;
pub mod reviews;
pub mod store;

pub use cancel::CancellationToken;
pub use client::{Client, ClientBuilder, ClientConfig, DEFAULT_TIMEOUT};
pub use codec::RequestBody;
pub use endpoint::{Query, QueryValue};
pub use error::{Error, Result};
pub use observer::{RequestContext, RequestObserver};
pub use options::RequestOptions;
pub use parse::{ParseMode, Payload};
pub use response::Response;
pub use retry::{RetryDelay, RetryPredicate};
