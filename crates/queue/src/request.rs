//! The persisted offline request record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use outpost_client::RequestMethod;

/// A write captured while offline, waiting to be replayed.
///
/// Immutable once created; identity is the `id`. Serialized as
/// `{id, method, path, data, queryParams, createdAt}` with an ISO-8601
/// timestamp. `data` is omitted for bodiless writes; an explicit JSON
/// `null` body is kept as `Some(Value::Null)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedRequest {
    id: String,
    method: RequestMethod,
    path: String,
    #[serde(
        rename = "data",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_body"
    )]
    body: Option<serde_json::Value>,
    #[serde(default)]
    query_params: Option<BTreeMap<String, String>>,
    created_at: DateTime<Utc>,
}

impl QueuedRequest {
    /// Capture a request with a fresh UUID v4 identity.
    pub fn new(
        method: RequestMethod,
        path: impl Into<String>,
        body: Option<serde_json::Value>,
        query_params: Option<BTreeMap<String, String>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            method,
            path: path.into(),
            body,
            query_params,
            created_at,
        }
    }

    /// Unique identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// HTTP method to replay with.
    pub fn method(&self) -> RequestMethod {
        self.method
    }

    /// Path relative to the API base URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// JSON payload; `None` when the write had no body.
    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    /// Query parameters, if any.
    pub fn query_params(&self) -> Option<&BTreeMap<String, String>> {
        self.query_params.as_ref()
    }

    /// When the write was attempted.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// A present `data` field is always a body, even when it is `null`.
fn present_body<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}
