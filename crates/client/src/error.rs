//! Error types for outpost-client.

use std::time::Duration;

/// Result type alias for outpost-client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for outpost-client operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Returns true if this is a rate limit error.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self.kind, ErrorKind::RateLimited { .. })
    }

    /// Returns true if the backend rejected the bearer credential,
    /// including the terminal session-expired case.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Unauthorized(_) | ErrorKind::SessionExpired
        )
    }

    /// Returns true if the token refresh failed and credentials were cleared.
    pub fn is_session_expired(&self) -> bool {
        matches!(self.kind, ErrorKind::SessionExpired)
    }

    /// Returns true if no response was received (timeout or connection failure).
    pub fn is_network_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout | ErrorKind::Connection(_))
    }

    /// Returns the HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Http { status, .. } | ErrorKind::Server { status, .. } => Some(*status),
            ErrorKind::RateLimited { .. } => Some(429),
            ErrorKind::Unauthorized(_) => Some(401),
            _ => None,
        }
    }

    /// Returns the retry-after duration if this is a rate limit error.
    pub fn retry_after(&self) -> Option<Duration> {
        match &self.kind {
            ErrorKind::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Non-retryable client error (4xx other than 401/429, or a 408).
    #[error("HTTP error: {status} {message}")]
    Http { status: u16, message: String },

    /// Server fault (HTTP 5xx).
    #[error("Server error: {status} {message}")]
    Server { status: u16, message: String },

    /// Rate limit exceeded (HTTP 429).
    #[error("Rate limited{}", retry_after.map(|d| format!(", retry after {:?}", d)).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },

    /// Bearer credential missing, expired or rejected (HTTP 401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Token refresh failed and stored credentials were cleared.
    #[error("Session expired")]
    SessionExpired,

    /// Request timeout.
    #[error("Request timeout")]
    Timeout,

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Durable storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The offline queue is at capacity.
    #[error("Offline queue full ({capacity} pending requests)")]
    QueueFull { capacity: usize },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ErrorKind {
    /// Returns true if this error kind is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ErrorKind::RateLimited { .. } => true,
            ErrorKind::Server { .. } => true,
            ErrorKind::Timeout => true,
            ErrorKind::Connection(_) => true,
            ErrorKind::Http { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

#[cfg(feature = "native")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_builder() {
            ErrorKind::Config(err.to_string())
        } else {
            // Anything else means no usable response reached us.
            ErrorKind::Connection(err.to_string())
        };

        Error::with_source(kind, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(ErrorKind::InvalidUrl(err.to_string()), err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_source(ErrorKind::Storage(err.to_string()), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        let err = Error::new(ErrorKind::RateLimited { retry_after: None });
        assert!(err.is_retryable());

        let err = Error::new(ErrorKind::Timeout);
        assert!(err.is_retryable());

        let err = Error::new(ErrorKind::Server {
            status: 503,
            message: "Service unavailable".to_string(),
        });
        assert!(err.is_retryable());

        let err = Error::new(ErrorKind::Http {
            status: 404,
            message: "missing".to_string(),
        });
        assert!(!err.is_retryable());

        let err = Error::new(ErrorKind::Unauthorized("invalid".to_string()));
        assert!(!err.is_retryable());

        let err = Error::new(ErrorKind::SessionExpired);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_is_rate_limited() {
        let err = Error::new(ErrorKind::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
        });
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(err.status(), Some(429));

        let err = Error::new(ErrorKind::Timeout);
        assert!(!err.is_rate_limited());
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_auth_and_session_errors() {
        let err = Error::new(ErrorKind::Unauthorized("expired".to_string()));
        assert!(err.is_auth_error());
        assert!(!err.is_session_expired());

        let err = Error::new(ErrorKind::SessionExpired);
        assert!(err.is_auth_error());
        assert!(err.is_session_expired());

        let err = Error::new(ErrorKind::Http {
            status: 403,
            message: "forbidden".to_string(),
        });
        assert!(!err.is_auth_error());
    }

    #[test]
    fn test_network_errors() {
        assert!(Error::new(ErrorKind::Timeout).is_network_error());
        assert!(Error::new(ErrorKind::Connection("refused".into())).is_network_error());
        assert!(!Error::new(ErrorKind::Storage("disk".into())).is_network_error());
    }

    #[test]
    fn test_error_kind_display_messages() {
        let cases: Vec<(ErrorKind, &str)> = vec![
            (
                ErrorKind::Http {
                    status: 422,
                    message: "Unprocessable".into(),
                },
                "HTTP error: 422 Unprocessable",
            ),
            (
                ErrorKind::Server {
                    status: 500,
                    message: "Internal Server Error".into(),
                },
                "Server error: 500 Internal Server Error",
            ),
            (
                ErrorKind::RateLimited {
                    retry_after: Some(Duration::from_secs(30)),
                },
                "retry after",
            ),
            (ErrorKind::RateLimited { retry_after: None }, "Rate limited"),
            (
                ErrorKind::Unauthorized("expired token".into()),
                "Unauthorized: expired token",
            ),
            (ErrorKind::SessionExpired, "Session expired"),
            (ErrorKind::Timeout, "Request timeout"),
            (
                ErrorKind::Connection("refused".into()),
                "Connection error: refused",
            ),
            (ErrorKind::Storage("disk full".into()), "Storage error: disk full"),
            (
                ErrorKind::Json("unexpected EOF".into()),
                "JSON error: unexpected EOF",
            ),
            (
                ErrorKind::InvalidUrl("no scheme".into()),
                "Invalid URL: no scheme",
            ),
            (
                ErrorKind::Config("missing field".into()),
                "Configuration error: missing field",
            ),
            (ErrorKind::Other("something else".into()), "something else"),
        ];

        for (kind, expected_substring) in cases {
            let display = kind.to_string();
            assert!(
                display.contains(expected_substring),
                "Expected '{display}' to contain '{expected_substring}'"
            );
        }
    }

    #[test]
    fn test_retryable_http_status_codes() {
        for status in [408, 429, 500, 502, 503, 504] {
            assert!(is_retryable_status(status), "HTTP {status} should be retryable");
        }

        for status in [400, 401, 403, 404, 405, 409, 422, 501] {
            assert!(!is_retryable_status(status), "HTTP {status} should NOT be retryable");
        }

        let err = Error::new(ErrorKind::Http {
            status: 408,
            message: "timeout".into(),
        });
        assert!(err.is_retryable());
    }

    #[test]
    fn test_error_with_source() {
        let source_err = std::io::Error::other("disk full");
        let err = Error::with_source(ErrorKind::Other("write failed".into()), source_err);

        assert!(err.source.is_some());
        assert_eq!(err.to_string(), "write failed");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("not valid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err.kind, ErrorKind::Json(_)));
        assert!(err.source.is_some());
    }

    #[test]
    fn test_from_io_error_is_storage() {
        let err: Error = std::io::Error::other("read-only").into();
        assert!(matches!(err.kind, ErrorKind::Storage(_)));
    }

    #[test]
    fn test_from_url_parse_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err.kind, ErrorKind::InvalidUrl(_)));
        assert!(err.to_string().contains("Invalid URL"));
    }
}
