//! Single-flight access token refresh.
//!
//! When a call comes back 401 the pipeline asks the
//! [`TokenRefreshCoordinator`] for a fresh token. At most one refresh runs
//! at a time; every caller that hits a 401 while it is pending awaits the
//! same result. The refresh itself runs on its own task, so a caller that
//! gives up waiting does not cancel it for the others.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use outpost_client::{Request, RequestMethod, Transport};

use crate::credentials::{Credential, CredentialVault};
use crate::error::{Error, ErrorKind, Result};

/// Default path of the refresh endpoint, relative to the API base URL.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Tokens returned by the refresh endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// New access token.
    pub access_token: String,
    /// Rotated refresh token, when the backend issues one.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Exchanges a refresh token for new tokens.
#[async_trait]
pub trait TokenRefresher: Send + Sync + std::fmt::Debug {
    /// Perform one exchange. Any error means the refresh failed.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair>;
}

/// Refresher calling `POST {base_url}/auth/refresh` with
/// `{"refreshToken": ...}`.
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher {
    transport: Arc<dyn Transport>,
    endpoint: String,
}

impl HttpTokenRefresher {
    /// Create a refresher for the default endpoint under `base_url`.
    pub fn new(transport: Arc<dyn Transport>, base_url: &str) -> Self {
        Self::with_endpoint(
            transport,
            format!("{}{}", base_url.trim_end_matches('/'), DEFAULT_REFRESH_PATH),
        )
    }

    /// Create a refresher for an explicit endpoint URL.
    pub fn with_endpoint(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    /// The endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    #[instrument(skip(self, refresh_token), fields(endpoint = %self.endpoint))]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let request = Request::new(RequestMethod::Post, &self.endpoint)
            .json_value(serde_json::json!({ "refreshToken": refresh_token }));

        let response = self.transport.issue(&request).await?;

        if !response.is_success() {
            return Err(Error::new(ErrorKind::RefreshRejected {
                status: response.status(),
                message: response.error_message(),
            }));
        }

        let pair: TokenPair = response.envelope_data().map_err(|e| {
            Error::with_source(
                ErrorKind::InvalidTokenResponse("missing accessToken".to_string()),
                e,
            )
        })?;

        if pair.access_token.is_empty() {
            return Err(Error::new(ErrorKind::InvalidTokenResponse(
                "empty accessToken".to_string(),
            )));
        }

        Ok(pair)
    }
}

/// Authentication state, observable by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// A credential is held and believed valid.
    Authenticated,
    /// A refresh is in flight.
    Refreshing,
    /// No usable credential. Only `login` leaves this state.
    Unauthenticated,
}

/// Result of asking the coordinator for a fresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new access token is available; replay with it.
    Refreshed {
        /// The token to replay with.
        access_token: String,
    },
    /// The refresh failed and every stored credential was cleared.
    Expired,
    /// No refresh token is stored; nothing was attempted or cleared.
    Unavailable,
}

type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Coordinates token refreshes so at most one is in flight.
#[derive(Debug, Clone)]
pub struct TokenRefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    vault: Arc<CredentialVault>,
    refresher: Arc<dyn TokenRefresher>,
    in_flight: Mutex<Option<SharedRefresh>>,
    state: watch::Sender<AuthState>,
}

impl std::fmt::Debug for CoordinatorInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorInner")
            .field("refresher", &self.refresher)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl TokenRefreshCoordinator {
    /// Create a coordinator. The initial state follows the vault's cached
    /// token, so load the vault first.
    pub fn new(vault: Arc<CredentialVault>, refresher: Arc<dyn TokenRefresher>) -> Self {
        let initial = if vault.cached_access_token().is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        };
        let (state, _) = watch::channel(initial);

        Self {
            inner: Arc::new(CoordinatorInner {
                vault,
                refresher,
                in_flight: Mutex::new(None),
                state,
            }),
        }
    }

    /// The credential vault.
    pub fn vault(&self) -> &Arc<CredentialVault> {
        &self.inner.vault
    }

    /// Current authentication state.
    pub fn state(&self) -> AuthState {
        *self.inner.state.borrow()
    }

    /// Subscribe to authentication state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Obtain a token to replay a request that failed with 401.
    ///
    /// `sent_with` is the token the failing request carried. If the vault
    /// already holds a different one, a refresh completed in the meantime
    /// and that token is returned without another exchange.
    pub async fn refresh(&self, sent_with: Option<&str>) -> RefreshOutcome {
        let flight = {
            let mut slot = self.inner.in_flight.lock().unwrap_or_else(|e| e.into_inner());

            // A completed flight left behind by abandoned waiters is stale.
            let pending = slot
                .as_ref()
                .filter(|pending| pending.peek().is_none())
                .cloned();

            match pending {
                Some(pending) => {
                    debug!("Joining in-flight token refresh");
                    pending
                }
                None => {
                    if let Some(current) = self.inner.vault.cached_access_token() {
                        if sent_with != Some(current.as_str()) {
                            debug!("Access token already rotated; skipping refresh");
                            return RefreshOutcome::Refreshed {
                                access_token: current,
                            };
                        }
                    }

                    let flight = self.start_flight();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        let outcome = flight.clone().await;

        let mut slot = self.inner.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if slot
            .as_ref()
            .is_some_and(|pending| Shared::ptr_eq(pending, &flight))
        {
            *slot = None;
        }

        outcome
    }

    /// Store a credential obtained from an explicit sign-in.
    #[instrument(skip_all)]
    pub async fn login(&self, credential: &Credential) -> Result<()> {
        self.inner.vault.save(credential).await?;
        self.inner.state.send_replace(AuthState::Authenticated);
        info!("Signed in");
        Ok(())
    }

    /// Clear every stored credential.
    #[instrument(skip_all)]
    pub async fn logout(&self) -> Result<()> {
        let result = self.inner.vault.clear().await;
        self.inner.state.send_replace(AuthState::Unauthenticated);
        info!("Signed out");
        result
    }

    fn start_flight(&self) -> SharedRefresh {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn({
            let inner = Arc::clone(&inner);
            async move { inner.run_refresh().await }
        });

        async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "Token refresh task failed");
                    inner.state.send_if_modified(|state| {
                        let changed = *state == AuthState::Refreshing;
                        if changed {
                            *state = AuthState::Authenticated;
                        }
                        changed
                    });
                    RefreshOutcome::Unavailable
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl CoordinatorInner {
    async fn run_refresh(&self) -> RefreshOutcome {
        let refresh_token = match self.vault.refresh_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No refresh token stored");
                return RefreshOutcome::Unavailable;
            }
            Err(e) => {
                warn!(error = %e, "Could not read refresh token");
                return RefreshOutcome::Unavailable;
            }
        };

        self.state.send_replace(AuthState::Refreshing);

        match self.refresher.refresh(&refresh_token).await {
            Ok(pair) => {
                let credential = Credential {
                    access_token: pair.access_token,
                    refresh_token: pair.refresh_token,
                };
                // The vault caches before persisting, so a storage failure
                // still leaves the new token usable for this session.
                if let Err(e) = self.vault.save(&credential).await {
                    warn!(error = %e, "Could not persist refreshed credential");
                }
                self.state.send_replace(AuthState::Authenticated);
                info!("Access token refreshed");
                RefreshOutcome::Refreshed {
                    access_token: credential.access_token,
                }
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed; clearing credentials");
                if let Err(e) = self.vault.clear().await {
                    warn!(error = %e, "Could not clear credentials");
                }
                self.state.send_replace(AuthState::Unauthenticated);
                RefreshOutcome::Expired
            }
        }
    }
}
