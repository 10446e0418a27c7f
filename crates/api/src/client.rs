//! The request pipeline.
//!
//! Every call runs the same fixed sequence of stages:
//!
//! ```text
//! authorize → transmit → classify ─┬─ success ───────────────────────→ Ok
//!                                  ├─ 401 (first) → refresh → replay ↺
//!                                  ├─ retryable → backoff → transmit ↺
//!                                  └─ otherwise ─────────────────────→ Err
//! ```
//!
//! Writes flagged `queue_if_offline` skip the pipeline entirely while the
//! device is offline and are persisted for replay instead.

use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use outpost_auth::{
    AuthState, AuthorizationStage, Credential, CredentialVault, FileSecureStore,
    HttpTokenRefresher, RefreshOutcome, SecureStore, TokenRefreshCoordinator, TokenRefresher,
};
use outpost_client::{
    Classification, Clock, Error, ErrorKind, ReqwestTransport, Request, RequestMethod, Response,
    Result, RetryDecision, RetryPolicy, SystemClock, Transport,
};
use outpost_queue::{DrainReport, OfflineQueueManager, QueuedRequest, ReplayStatus};

use crate::config::ApiConfig;
use crate::connectivity::Connectivity;

/// Result of a write.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The backend answered with 2xx.
    Completed(Response),
    /// The device was offline; the write was persisted for replay.
    Queued(QueuedRequest),
}

impl Outcome {
    /// Returns true if the write was deferred.
    pub fn is_queued(&self) -> bool {
        matches!(self, Outcome::Queued(_))
    }

    /// The response, if the write completed.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Outcome::Completed(response) => Some(response),
            Outcome::Queued(_) => None,
        }
    }

    /// Decode the envelope `data` of a completed write. `None` if queued.
    pub fn data<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.response().map(Response::envelope_data).transpose()
    }
}

/// Per-write options.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Query parameters.
    pub query: BTreeMap<String, String>,
    /// Persist the write for later replay when offline.
    pub queue_if_offline: bool,
}

impl WriteOptions {
    /// Options that queue the write when offline.
    pub fn queued() -> Self {
        Self {
            queue_if_offline: true,
            ..Default::default()
        }
    }

    /// Add a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }
}

/// Resilient API client.
///
/// Cheap to clone; clones share credentials, queue and connectivity.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    config: ApiConfig,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    authorization: AuthorizationStage,
    refresh: TokenRefreshCoordinator,
    queue: OfflineQueueManager,
    connectivity: Connectivity,
}

impl ApiClient {
    /// Create a builder.
    pub fn builder(config: ApiConfig) -> ApiClientBuilder {
        ApiClientBuilder::new(config)
    }

    /// The configuration in use.
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    // =========================================================================
    // HTTP verbs
    // =========================================================================

    /// GET a path.
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response> {
        let request = Request::new(RequestMethod::Get, self.inner.config.url(path))
            .query_pairs(query.iter().copied());
        self.send(request).await
    }

    /// GET a path and decode the envelope `data`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        self.get(path, query).await?.envelope_data()
    }

    /// POST a JSON body.
    pub async fn post(&self, path: &str, body: serde_json::Value, options: WriteOptions) -> Result<Outcome> {
        self.write(RequestMethod::Post, path, Some(body), options).await
    }

    /// PUT a JSON body.
    pub async fn put(&self, path: &str, body: serde_json::Value, options: WriteOptions) -> Result<Outcome> {
        self.write(RequestMethod::Put, path, Some(body), options).await
    }

    /// PATCH a JSON body.
    pub async fn patch(&self, path: &str, body: serde_json::Value, options: WriteOptions) -> Result<Outcome> {
        self.write(RequestMethod::Patch, path, Some(body), options).await
    }

    /// DELETE a path.
    pub async fn delete(&self, path: &str, options: WriteOptions) -> Result<Outcome> {
        self.write(RequestMethod::Delete, path, None, options).await
    }

    /// Run an arbitrary request through the pipeline.
    ///
    /// Retryable failures are retried with backoff until the budget is
    /// spent; a 401 triggers one token refresh and replay. The final
    /// classified failure is returned unchanged.
    #[instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    pub async fn send(&self, request: Request) -> Result<Response> {
        let mut retry = RetryPolicy::new(self.inner.config.retry.clone());
        let mut refreshed = false;

        loop {
            let authorized = self.inner.authorization.apply(request.clone()).await;
            let sent_with = authorized.bearer_token().map(str::to_owned);

            let outcome = Classification::from_transport(self.inner.transport.issue(&authorized).await);
            debug!(outcome = outcome.label(), status = ?outcome.status(), "Transmission classified");

            if matches!(outcome, Classification::Unauthorized(_)) && !refreshed {
                refreshed = true;
                match self.inner.refresh.refresh(sent_with.as_deref()).await {
                    RefreshOutcome::Refreshed { .. } => {
                        debug!("Replaying with refreshed token");
                        continue;
                    }
                    RefreshOutcome::Expired => return Err(Error::new(ErrorKind::SessionExpired)),
                    RefreshOutcome::Unavailable => return outcome.into_result(),
                }
            }

            match retry.decide(&outcome) {
                RetryDecision::Retry(delay) => {
                    warn!(
                        attempt = retry.attempt(),
                        max_retries = retry.max_retries(),
                        delay_ms = delay.as_millis() as u64,
                        outcome = outcome.label(),
                        "Retrying request"
                    );
                    self.inner.clock.sleep(delay).await;
                }
                RetryDecision::GiveUp => return outcome.into_result(),
            }
        }
    }

    async fn write(
        &self,
        method: RequestMethod,
        path: &str,
        body: Option<serde_json::Value>,
        options: WriteOptions,
    ) -> Result<Outcome> {
        if options.queue_if_offline && !self.is_online() {
            let query = (!options.query.is_empty()).then_some(options.query);
            let queued = QueuedRequest::new(
                method,
                path,
                body,
                query,
                self.inner.clock.now(),
            );
            self.inner.queue.enqueue(queued.clone()).await?;
            info!(id = queued.id(), %method, path, "Offline; request queued");
            return Ok(Outcome::Queued(queued));
        }

        let mut request = Request::new(method, self.inner.config.url(path)).query_pairs(options.query);
        if let Some(body) = body {
            request = request.json_value(body);
        }
        self.send(request).await.map(Outcome::Completed)
    }

    // =========================================================================
    // Offline queue
    // =========================================================================

    /// Update connectivity. Going from offline to online starts draining
    /// the offline queue in the background; this never blocks.
    pub fn set_connectivity(&self, online: bool) {
        let was_online = self.inner.connectivity.set(online);
        if was_online == online {
            return;
        }
        info!(online, "Connectivity changed");

        if online {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let client = self.clone();
                    handle.spawn(async move {
                        if let Err(e) = client.drain_queue().await {
                            warn!(error = %e, "Offline queue drain failed");
                        }
                    });
                }
                Err(_) => warn!("No async runtime; offline queue will drain on the next call"),
            }
        }
    }

    /// Whether the device is online.
    pub fn is_online(&self) -> bool {
        self.inner.connectivity.is_online()
    }

    /// Subscribe to connectivity changes.
    pub fn connectivity(&self) -> watch::Receiver<bool> {
        self.inner.connectivity.subscribe()
    }

    /// Replay every queued write in creation order.
    ///
    /// Stops early if connectivity drops. Returns a skipped report if a
    /// drain is already running.
    #[instrument(skip(self))]
    pub async fn drain_queue(&self) -> Result<DrainReport> {
        let report = self
            .inner
            .queue
            .drain(self.inner.config.drain_policy, |queued| {
                let client = self.clone();
                async move {
                    if !client.is_online() {
                        return ReplayStatus::Interrupted;
                    }
                    match client.replay(&queued).await {
                        Ok(_) => ReplayStatus::Delivered,
                        Err(e) if e.is_network_error() && !client.is_online() => ReplayStatus::Interrupted,
                        Err(e) => ReplayStatus::Failed(e.to_string()),
                    }
                }
            })
            .await?;
        Ok(report)
    }

    /// Pending offline writes, oldest first.
    pub async fn pending_requests(&self) -> Result<Vec<QueuedRequest>> {
        Ok(self.inner.queue.list().await?)
    }

    /// The offline queue.
    pub fn queue(&self) -> &OfflineQueueManager {
        &self.inner.queue
    }

    async fn replay(&self, queued: &QueuedRequest) -> Result<Response> {
        let mut request = Request::new(queued.method(), self.inner.config.url(queued.path()));
        if let Some(query) = queued.query_params() {
            request = request.query_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        if let Some(body) = queued.body() {
            request = request.json_value(body.clone());
        }
        self.send(request).await
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Store credentials from an explicit sign-in.
    pub async fn login(&self, credential: &Credential) -> Result<()> {
        Ok(self.inner.refresh.login(credential).await?)
    }

    /// Clear every stored credential.
    pub async fn logout(&self) -> Result<()> {
        Ok(self.inner.refresh.logout().await?)
    }

    /// Current authentication state.
    pub fn auth_state(&self) -> AuthState {
        self.inner.refresh.state()
    }

    /// Subscribe to authentication state changes. `Unauthenticated` after
    /// a failed refresh means the session expired.
    pub fn subscribe_auth(&self) -> watch::Receiver<AuthState> {
        self.inner.refresh.subscribe()
    }

    /// The credential vault.
    pub fn vault(&self) -> &Arc<CredentialVault> {
        self.inner.refresh.vault()
    }
}

/// Builder for [`ApiClient`].
#[derive(Debug)]
pub struct ApiClientBuilder {
    config: ApiConfig,
    transport: Option<Arc<dyn Transport>>,
    clock: Option<Arc<dyn Clock>>,
    store: Option<Arc<dyn SecureStore>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl ApiClientBuilder {
    /// Create a builder with default collaborators.
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            transport: None,
            clock: None,
            store: None,
            refresher: None,
        }
    }

    /// Use a custom transport instead of `reqwest`.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom clock for backoff and queue timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use a custom store for credentials and the offline queue.
    pub fn with_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a custom token refresher.
    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Build the client, loading any stored credential.
    pub async fn build(self) -> Result<ApiClient> {
        let config = self.config;
        config.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(config.client.clone())?),
        };
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let store: Arc<dyn SecureStore> = match self.store {
            Some(store) => store,
            None => Arc::new(FileSecureStore::new()?),
        };
        let refresher: Arc<dyn TokenRefresher> = self.refresher.unwrap_or_else(|| {
            Arc::new(HttpTokenRefresher::with_endpoint(
                transport.clone(),
                config.refresh_url(),
            ))
        });

        let vault = Arc::new(CredentialVault::new(store.clone()));
        let signed_in = vault.load().await?;
        debug!(signed_in, base_url = %config.base_url, "Building API client");

        let inner = ClientInner {
            authorization: AuthorizationStage::new(vault.clone()),
            refresh: TokenRefreshCoordinator::new(vault, refresher),
            queue: OfflineQueueManager::with_max_size(store, config.max_queue_size),
            connectivity: Connectivity::new(config.initially_online),
            transport,
            clock,
            config,
        };

        Ok(ApiClient {
            inner: Arc::new(inner),
        })
    }
}
