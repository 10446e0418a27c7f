use std::sync::Arc;

use outpost::auth::{FileSecureStore, SecureStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY};
use outpost::client::MockClock;
use outpost::{ApiClient, ApiConfig};
use tempfile::TempDir;
use wiremock::MockServer;

/// A client wired to a mock backend, a temp-dir store and a mock clock.
pub struct TestClient {
    pub client: ApiClient,
    pub server: MockServer,
    pub store: FileSecureStore,
    pub clock: MockClock,
    // Keeps the store directory alive for the whole test.
    _dir: TempDir,
}

impl TestClient {
    /// Another client over the same store and backend, as after an app
    /// restart.
    pub async fn restart(&self, online: bool) -> ApiClient {
        build(&self.server, &self.store, &self.clock, online).await
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A client signed in as `access-1` / `refresh-1`.
pub async fn signed_in_client(online: bool) -> TestClient {
    init_tracing();

    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = FileSecureStore::with_path(dir.path());
    store.write(ACCESS_TOKEN_KEY, "access-1").await.unwrap();
    store.write(REFRESH_TOKEN_KEY, "refresh-1").await.unwrap();
    store
        .write(USER_DATA_KEY, r#"{"id":42,"name":"Sam"}"#)
        .await
        .unwrap();

    let clock = MockClock::new();
    let client = build(&server, &store, &clock, online).await;

    TestClient {
        client,
        server,
        store,
        clock,
        _dir: dir,
    }
}

async fn build(
    server: &MockServer,
    store: &FileSecureStore,
    clock: &MockClock,
    online: bool,
) -> ApiClient {
    let config = ApiConfig::builder(server.uri())
        .with_initially_online(online)
        .build()
        .unwrap();

    ApiClient::builder(config)
        .with_store(Arc::new(store.clone()))
        .with_clock(Arc::new(clock.clone()))
        .build()
        .await
        .unwrap()
}
