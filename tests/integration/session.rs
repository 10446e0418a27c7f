//! Token refresh and session expiry.

use super::common::signed_in_client;
use outpost::auth::{SecureStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY};
use outpost::AuthState;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_replayed() {
    let t = signed_in_client(true).await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("Authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&t.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refreshToken": "refresh-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"accessToken": "access-2", "refreshToken": "refresh-2"}
        })))
        .expect(1)
        .mount(&t.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("Authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": 42}
        })))
        .expect(1)
        .mount(&t.server)
        .await;

    let me: serde_json::Value = t.client.get_json("/me", &[]).await.unwrap();
    assert_eq!(me, json!({"id": 42}));

    assert_eq!(t.client.auth_state(), AuthState::Authenticated);
    assert_eq!(
        t.store.read(ACCESS_TOKEN_KEY).await.unwrap().as_deref(),
        Some("access-2")
    );
    assert_eq!(
        t.store.read(REFRESH_TOKEN_KEY).await.unwrap().as_deref(),
        Some("refresh-2")
    );
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let t = signed_in_client(true).await;

    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&t.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"accessToken": "access-2"}))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&t.server)
        .await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&t.server)
        .await;

    let calls = (0..6).map(|i| {
        let client = t.client.clone();
        tokio::spawn(async move { client.get(&format!("/items/{i}"), &[]).await })
    });
    for handle in calls.collect::<Vec<_>>() {
        assert_eq!(handle.await.unwrap().unwrap().status(), 200);
    }
}

#[tokio::test]
async fn test_rejected_refresh_expires_session() {
    let t = signed_in_client(true).await;
    let mut auth = t.client.subscribe_auth();

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&t.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "refresh token expired"
        })))
        .expect(1)
        .mount(&t.server)
        .await;

    let err = t.client.get("/me", &[]).await.unwrap_err();
    assert!(err.is_session_expired());

    assert_eq!(*auth.borrow_and_update(), AuthState::Unauthenticated);
    for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY] {
        assert_eq!(t.store.read(key).await.unwrap(), None, "{key}");
    }
}
