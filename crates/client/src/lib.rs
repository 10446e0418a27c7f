//! # outpost-client
//!
//! Core HTTP plumbing for the outpost resilience layer.
//!
//! This crate provides the leaf pieces of the request pipeline:
//! - A [`Transport`] seam with a pooled `reqwest` implementation
//! - A total [`Classification`] of transport outcomes
//! - A per-call [`RetryPolicy`] with exponential backoff (1s, 2s, 4s ... 32s)
//! - A [`Clock`] abstraction so backoff can be tested without waiting
//! - Shared error types and response decoding (`{success, message, data}`)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ApiClient (outpost-api)                │
//! │  connectivity, offline queue, single-flight token refresh   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │        AuthorizationStage + TokenRefreshCoordinator         │
//! │                       (outpost-auth)                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   Transport → Classification → RetryPolicy (this crate)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use outpost_client::{Classification, ReqwestTransport, Request, RequestMethod, Transport};
//!
//! let transport = ReqwestTransport::default_transport()?;
//! let request = Request::new(RequestMethod::Get, "https://api.example.com/health");
//! match Classification::from_transport(transport.issue(&request).await) {
//!     Classification::Success(response) => println!("{}", response.status()),
//!     other => eprintln!("failed: {}", other.label()),
//! }
//! ```

mod classify;
mod clock;
mod config;
mod error;
mod request;
mod response;
mod retry;
mod transport;

pub use classify::Classification;
pub use clock::{Clock, MockClock, SystemClock};
pub use config::{env_duration_secs, ClientConfig, ClientConfigBuilder, TIMEOUT_ENV};
pub use error::{is_retryable_status, Error, ErrorKind, Result};
pub use request::{Request, RequestBody, RequestMethod};
pub use response::{sanitize_error_message, ApiEnvelope, Response};
pub use retry::{backoff_delay, BackoffStrategy, RetryConfig, RetryDecision, RetryPolicy};
pub use transport::Transport;

#[cfg(feature = "native")]
pub use transport::ReqwestTransport;

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("outpost/", env!("CARGO_PKG_VERSION"));
