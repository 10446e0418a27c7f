//! # outpost-auth
//!
//! Credential storage, bearer authorization and token refresh for outpost.
//!
//! ## Security
//!
//! - Tokens are redacted in Debug output
//! - Tracing skips credential parameters
//! - Error messages from the refresh endpoint are sanitized
//! - File-backed storage writes atomically with owner-only permissions
//!
//! ## Pieces
//!
//! - [`SecureStore`]: durable string storage ([`FileSecureStore`], [`MemoryStore`])
//! - [`CredentialVault`]: credential persistence with a cached access token
//! - [`AuthorizationStage`]: attaches `Authorization: Bearer <token>`
//! - [`TokenRefreshCoordinator`]: single-flight refresh on 401
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use outpost_auth::{CredentialVault, FileSecureStore, HttpTokenRefresher, TokenRefreshCoordinator};
//! use outpost_client::ReqwestTransport;
//!
//! let vault = Arc::new(CredentialVault::new(Arc::new(FileSecureStore::new()?)));
//! vault.load().await?;
//!
//! let transport = Arc::new(ReqwestTransport::default_transport()?);
//! let refresher = HttpTokenRefresher::new(transport, "https://api.example.com");
//! let coordinator = TokenRefreshCoordinator::new(vault, Arc::new(refresher));
//! ```

mod authorization;
mod credentials;
mod error;
mod refresh;
mod storage;

pub use authorization::AuthorizationStage;
pub use credentials::{Credential, CredentialVault};
pub use error::{Error, ErrorKind, Result};
pub use refresh::{
    AuthState, HttpTokenRefresher, RefreshOutcome, TokenPair, TokenRefreshCoordinator,
    TokenRefresher, DEFAULT_REFRESH_PATH,
};
pub use storage::{
    default_store_dir, FileSecureStore, MemoryStore, SecureStore, ACCESS_TOKEN_KEY,
    OFFLINE_QUEUE_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY,
};
