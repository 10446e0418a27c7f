//! HTTP response handling.
//!
//! Transports buffer the whole body, so a [`Response`] is plain data that
//! can be inspected, cloned and decoded without further I/O.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: Bytes,
}

impl Response {
    /// Build a response from its parts.
    pub fn from_parts<I, K, V>(status: u16, headers: I, body: impl Into<Bytes>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        // Normalize header names to lowercase for case-insensitive lookups
        let headers = headers
            .into_iter()
            .map(|(k, v)| (k.into().to_lowercase(), v.into()))
            .collect();

        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns true if the response status is successful (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get the Retry-After header as a Duration.
    ///
    /// Only the delay-seconds form is understood.
    pub fn retry_after(&self) -> Option<Duration> {
        let value = self.header("retry-after")?;
        value.trim().parse::<u64>().ok().map(Duration::from_secs)
    }

    /// Get the response body as bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Get the response body as text.
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec()).map_err(|e| {
            Error::with_source(
                ErrorKind::Other("Failed to decode response as UTF-8".to_string()),
                e,
            )
        })
    }

    /// Deserialize the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(Into::into)
    }

    /// Decode the `{success, message, data}` envelope and return `data`.
    ///
    /// Bodies that are not wrapped in an envelope are decoded directly.
    pub fn envelope_data<T: DeserializeOwned>(&self) -> Result<T> {
        let value: serde_json::Value = self.json()?;
        if let Ok(envelope) = serde_json::from_value::<ApiEnvelope<T>>(value.clone()) {
            if let Some(data) = envelope.data {
                return Ok(data);
            }
        }
        serde_json::from_value(value).map_err(Into::into)
    }

    /// Best-effort human readable error message for a failed response.
    ///
    /// Prefers the envelope `message`, falls back to the raw body, and is
    /// always sanitized.
    pub fn error_message(&self) -> String {
        if let Ok(envelope) = serde_json::from_slice::<ApiEnvelope<serde_json::Value>>(&self.body)
        {
            if let Some(message) = envelope.message.filter(|m| !m.is_empty()) {
                return sanitize_error_message(&message);
            }
        }

        let body = String::from_utf8_lossy(&self.body);
        sanitize_error_message(body.trim())
    }
}

/// The backend's success envelope: `{success, message, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether the backend considers the call successful.
    #[serde(default)]
    pub success: bool,
    /// Optional human readable message.
    pub message: Option<String>,
    /// Payload.
    pub data: Option<T>,
}

/// Sanitize an error message to prevent exposing sensitive data.
///
/// This function:
/// - Removes bearer tokens and JWT-shaped strings
/// - Removes refresh/access token fields echoed back in JSON bodies
/// - Truncates messages longer than 500 characters
pub fn sanitize_error_message(message: &str) -> String {
    const MAX_LENGTH: usize = 500;

    static BEARER: OnceLock<regex_lite::Regex> = OnceLock::new();
    static JWT: OnceLock<regex_lite::Regex> = OnceLock::new();
    static TOKEN_FIELD: OnceLock<regex_lite::Regex> = OnceLock::new();

    let bearer = BEARER.get_or_init(|| {
        regex_lite::Regex::new(r"(?i)bearer\s+[A-Za-z0-9\-._~+/]+=*")
            .expect("static regex is valid")
    });
    let jwt = JWT.get_or_init(|| {
        regex_lite::Regex::new(r"eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*")
            .expect("static regex is valid")
    });
    let token_field = TOKEN_FIELD.get_or_init(|| {
        regex_lite::Regex::new(r#"("(?:accessToken|refreshToken|access_token|refresh_token)"\s*:\s*)"[^"]*""#)
            .expect("static regex is valid")
    });

    let mut sanitized = bearer.replace_all(message, "Bearer [REDACTED]").to_string();
    sanitized = jwt.replace_all(&sanitized, "[REDACTED_TOKEN]").to_string();
    sanitized = token_field
        .replace_all(&sanitized, r#"${1}"[REDACTED]""#)
        .to_string();

    if sanitized.len() > MAX_LENGTH {
        let mut cut = MAX_LENGTH;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str("...[truncated]");
    }

    sanitized
}
