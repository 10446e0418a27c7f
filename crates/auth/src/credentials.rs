//! Credentials and the vault that persists them.
//!
//! The secure store is the source of truth. The vault keeps a synchronous
//! cached copy of the access token only, so the authorization stage can
//! read it without touching storage on every request.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::storage::{SecureStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY};

/// A bearer credential pair.
///
/// Sensitive fields are redacted in Debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Bearer access token.
    pub access_token: String,
    /// Refresh token, if the backend issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Credential {
    /// Create a credential with only an access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
        }
    }

    /// Attach a refresh token.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }
}

/// Persists credentials in a [`SecureStore`] and caches the access token.
#[derive(Debug)]
pub struct CredentialVault {
    store: Arc<dyn SecureStore>,
    cached_access_token: RwLock<Option<String>>,
}

impl CredentialVault {
    /// Create a vault over a store. The cache starts cold; call
    /// [`load`](Self::load) to warm it.
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self {
            store,
            cached_access_token: RwLock::new(None),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn SecureStore> {
        &self.store
    }

    /// Warm the cache from storage. Returns whether an access token exists.
    pub async fn load(&self) -> Result<bool> {
        let token = self.store.read(ACCESS_TOKEN_KEY).await?;
        let present = token.is_some();
        self.set_cached(token);
        debug!(present, "Loaded access token from secure store");
        Ok(present)
    }

    /// The cached access token, without touching storage.
    pub fn cached_access_token(&self) -> Option<String> {
        self.cached_access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The current access token: the cached copy, or the stored one
    /// (which then warms the cache).
    pub async fn access_token(&self) -> Result<Option<String>> {
        if let Some(token) = self.cached_access_token() {
            return Ok(Some(token));
        }
        let token = self.store.read(ACCESS_TOKEN_KEY).await?;
        if token.is_some() {
            self.set_cached(token.clone());
        }
        Ok(token)
    }

    /// The stored refresh token.
    pub async fn refresh_token(&self) -> Result<Option<String>> {
        self.store.read(REFRESH_TOKEN_KEY).await
    }

    /// Persist a credential. The cache is updated first so in-flight
    /// requests pick up the new token even if persistence fails.
    #[instrument(skip_all)]
    pub async fn save(&self, credential: &Credential) -> Result<()> {
        self.set_cached(Some(credential.access_token.clone()));
        self.store
            .write(ACCESS_TOKEN_KEY, &credential.access_token)
            .await?;
        if let Some(ref refresh_token) = credential.refresh_token {
            self.store.write(REFRESH_TOKEN_KEY, refresh_token).await?;
        }
        Ok(())
    }

    /// Persist the signed-in user's serialized profile.
    pub async fn save_user_data(&self, user_data: &str) -> Result<()> {
        self.store.write(USER_DATA_KEY, user_data).await
    }

    /// The signed-in user's serialized profile.
    pub async fn user_data(&self) -> Result<Option<String>> {
        self.store.read(USER_DATA_KEY).await
    }

    /// Remove access token, refresh token and cached user.
    ///
    /// Every key is attempted even if an earlier delete fails; the first
    /// failure is returned.
    #[instrument(skip_all)]
    pub async fn clear(&self) -> Result<()> {
        self.set_cached(None);
        let mut first_error = None;
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY] {
            if let Err(e) = self.store.delete(key).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn set_cached(&self, token: Option<String>) {
        *self
            .cached_access_token
            .write()
            .unwrap_or_else(|e| e.into_inner()) = token;
    }
}
