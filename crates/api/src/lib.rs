//! # outpost-api
//!
//! The client applications talk to. [`ApiClient`] composes the outpost
//! pieces into one pipeline per call:
//!
//! - bearer authorization from the credential vault
//! - classification of every transport outcome
//! - bounded retry with exponential backoff (1s, 2s, 4s ... capped at 32s)
//! - one single-flight token refresh and replay on 401
//! - offline queueing of writes, drained in order on reconnect
//!
//! ## Example
//!
//! ```rust,ignore
//! use outpost_api::{ApiClient, ApiConfig, Outcome, WriteOptions};
//!
//! let client = ApiClient::builder(ApiConfig::from_env()?).build().await?;
//!
//! let me: serde_json::Value = client.get_json("/users/me", &[]).await?;
//!
//! match client
//!     .post("/messages", serde_json::json!({"text": "hi"}), WriteOptions::queued())
//!     .await?
//! {
//!     Outcome::Completed(response) => println!("sent: {}", response.status()),
//!     Outcome::Queued(request) => println!("queued {}", request.id()),
//! }
//!
//! // Called by the platform connectivity detector.
//! client.set_connectivity(false);
//! client.set_connectivity(true); // drains the queue in the background
//! ```

mod client;
mod config;
mod connectivity;

pub use client::{ApiClient, ApiClientBuilder, Outcome, WriteOptions};
pub use config::{ApiConfig, ApiConfigBuilder, BASE_URL_ENV, MAX_RETRIES_ENV};
pub use connectivity::Connectivity;
