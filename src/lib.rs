//! # outpost
//!
//! Network resilience layer for mobile API clients.
//!
//! Outpost sits between an application and its JSON-over-HTTP backend and
//! absorbs the failures a phone sees every day: flaky networks, throttling,
//! expired sessions and no connectivity at all.
//!
//! ## Security
//!
//! - Tokens are redacted in Debug output
//! - Tracing skips credential parameters
//! - Error messages sanitize bearer tokens and JWTs
//!
//! ## Crates
//!
//! - **outpost-client** - Transport, response classification, retry with exponential backoff
//! - **outpost-auth** - Secure storage, bearer authorization, single-flight token refresh
//! - **outpost-queue** - Durable, creation-ordered offline write queue
//! - **outpost-api** - The `ApiClient` pipeline and connectivity state
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use outpost::{ApiClient, ApiConfig, WriteOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::builder(ApiConfig::new("https://api.example.com"))
//!         .build()
//!         .await?;
//!
//!     let conversations: Vec<serde_json::Value> =
//!         client.get_json("/conversations", &[("page", "1")]).await?;
//!
//!     let outcome = client
//!         .post("/messages", serde_json::json!({"text": "hello"}), WriteOptions::queued())
//!         .await?;
//!     if outcome.is_queued() {
//!         println!("offline; will send on reconnect");
//!     }
//!
//!     Ok(())
//! }
//! ```

// Re-export all crates for convenient access
#[cfg(feature = "api")]
pub use outpost_api as api;
#[cfg(feature = "auth")]
pub use outpost_auth as auth;
#[cfg(feature = "client")]
pub use outpost_client as client;
#[cfg(feature = "queue")]
pub use outpost_queue as queue;

// Re-export commonly used types at the top level
#[cfg(feature = "api")]
pub use outpost_api::{ApiClient, ApiConfig, Outcome, WriteOptions};
#[cfg(feature = "auth")]
pub use outpost_auth::{AuthState, Credential};
#[cfg(feature = "client")]
pub use outpost_client::{Error, ErrorKind, Result, RetryConfig};
#[cfg(feature = "queue")]
pub use outpost_queue::QueuedRequest;
