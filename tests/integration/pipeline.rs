//! Request pipeline: authorization, classification and retry.

use super::common::signed_in_client;
use outpost::{ErrorKind, WriteOptions};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_get_decodes_envelope_with_bearer() {
    let t = signed_in_client(true).await;

    Mock::given(method("GET"))
        .and(path("/conversations"))
        .and(header("Authorization", "Bearer access-1"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "ok",
            "data": [{"id": 1}, {"id": 2}]
        })))
        .expect(1)
        .mount(&t.server)
        .await;

    let conversations: Vec<serde_json::Value> = t
        .client
        .get_json("/conversations", &[("page", "2")])
        .await
        .unwrap();
    assert_eq!(conversations.len(), 2);
}

#[tokio::test]
async fn test_server_errors_retry_until_budget_is_spent() {
    let t = signed_in_client(true).await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({
            "success": false,
            "message": "upstream unavailable"
        })))
        .expect(4)
        .mount(&t.server)
        .await;

    let err = t.client.get("/flaky", &[]).await.unwrap_err();
    match err.kind {
        ErrorKind::Server { status, ref message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "upstream unavailable");
        }
        ref other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        t.clock.sleeps(),
        [1, 2, 4].map(Duration::from_secs).to_vec()
    );
}

#[tokio::test]
async fn test_rate_limit_then_success() {
    let t = signed_in_client(true).await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .up_to_n_times(1)
        .mount(&t.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_json(json!({"text": "hello"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": {"id": "m1"}
        })))
        .mount(&t.server)
        .await;

    let outcome = t
        .client
        .post("/messages", json!({"text": "hello"}), WriteOptions::default())
        .await
        .unwrap();
    let data: Option<serde_json::Value> = outcome.data().unwrap();
    assert_eq!(data, Some(json!({"id": "m1"})));
    // The local schedule wins over Retry-After by default.
    assert_eq!(t.clock.sleeps(), vec![Duration::from_secs(1)]);
}

#[tokio::test]
async fn test_client_error_surfaces_immediately() {
    let t = signed_in_client(true).await;

    Mock::given(method("PATCH"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "success": false,
            "message": "name is required"
        })))
        .expect(1)
        .mount(&t.server)
        .await;

    let err = t
        .client
        .patch("/profile", json!({}), WriteOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("name is required"));
    assert!(t.clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_error_messages_never_leak_tokens() {
    let t = signed_in_client(true).await;

    Mock::given(method("GET"))
        .and(path("/echo"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string("bad header: Bearer access-1"),
        )
        .mount(&t.server)
        .await;

    let err = t.client.get("/echo", &[]).await.unwrap_err();
    assert!(!err.to_string().contains("access-1"), "{err}");
}
