//! Offline queueing and replay on reconnect.

use super::common::signed_in_client;
use outpost::WriteOptions;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_offline_writes_are_queued_and_replayed_in_order() {
    let t = signed_in_client(false).await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&t.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/messages/7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&t.server)
        .await;

    let first = t
        .client
        .post("/messages", json!({"text": "one"}), WriteOptions::queued())
        .await
        .unwrap();
    t.clock.advance(Duration::from_millis(10));
    t.client
        .delete("/messages/7", WriteOptions::queued())
        .await
        .unwrap();
    t.clock.advance(Duration::from_millis(10));
    t.client
        .post("/messages", json!({"text": "two"}), WriteOptions::queued())
        .await
        .unwrap();

    assert!(first.is_queued());
    assert!(t.server.received_requests().await.unwrap().is_empty());
    assert_eq!(t.client.pending_requests().await.unwrap().len(), 3);

    t.client.set_connectivity(true);
    for _ in 0..200 {
        if t.client.queue().is_empty().await.unwrap() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(t.client.queue().is_empty().await.unwrap());

    let received = t.server.received_requests().await.unwrap();
    let order: Vec<_> = received
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect();
    assert_eq!(
        order,
        ["POST /messages", "DELETE /messages/7", "POST /messages"]
    );
    let first_body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(first_body, json!({"text": "one"}));
}

#[tokio::test]
async fn test_queue_survives_restart_and_keeps_query() {
    let t = signed_in_client(false).await;

    t.client
        .put(
            "/drafts/3",
            json!({"text": "draft", "meta": {"tags": ["a", "b"]}}),
            WriteOptions::queued().with_query("autosave", "true"),
        )
        .await
        .unwrap();

    let restarted = t.restart(true).await;
    let pending = restarted.pending_requests().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].path(), "/drafts/3");

    Mock::given(method("PUT"))
        .and(path("/drafts/3"))
        .and(query_param("autosave", "true"))
        .and(body_json(json!({"text": "draft", "meta": {"tags": ["a", "b"]}})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&t.server)
        .await;

    let report = restarted.drain_queue().await.unwrap();
    assert_eq!(report.replayed, 1);
    assert_eq!(report.remaining, 0);
    assert!(t.client.pending_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_replay_stays_queued() {
    let t = signed_in_client(false).await;

    Mock::given(method("POST"))
        .and(path("/rejected"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&t.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accepted"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&t.server)
        .await;

    t.client
        .post("/rejected", json!({}), WriteOptions::queued())
        .await
        .unwrap();
    t.clock.advance(Duration::from_millis(1));
    t.client
        .post("/accepted", json!({}), WriteOptions::queued())
        .await
        .unwrap();

    let online = t.restart(true).await;
    let report = online.drain_queue().await.unwrap();
    assert_eq!(report.replayed, 1);
    assert_eq!(report.failed, 1);

    let pending = online.pending_requests().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].path(), "/rejected");
}
