//! Error types for outpost-auth.
//!
//! Error messages are designed to avoid exposing sensitive credential data.

/// Result type alias for outpost-auth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for outpost-auth operations.
///
/// Error messages are sanitized to prevent accidental credential exposure.
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
}

/// The kind of error that occurred.
///
/// Error messages avoid including credential values.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// The secure store could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The refresh endpoint rejected the refresh credential.
    #[error("Token refresh rejected: {status} {message}")]
    RefreshRejected { status: u16, message: String },

    /// The refresh endpoint answered with an unusable body.
    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    /// Transport failure while talking to the refresh endpoint.
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_source(ErrorKind::Storage(err.to_string()), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<outpost_client::Error> for Error {
    fn from(err: outpost_client::Error) -> Self {
        // Sanitize any potential credential exposure
        let message = outpost_client::sanitize_error_message(&err.to_string());
        Error::with_source(ErrorKind::Http(message), err)
    }
}

impl From<Error> for outpost_client::Error {
    fn from(err: Error) -> Self {
        let kind = match &err.kind {
            ErrorKind::Storage(message) => outpost_client::ErrorKind::Storage(message.clone()),
            ErrorKind::Json(message) => outpost_client::ErrorKind::Json(message.clone()),
            ErrorKind::Config(message) => outpost_client::ErrorKind::Config(message.clone()),
            other => outpost_client::ErrorKind::Other(other.to_string()),
        };
        outpost_client::Error::with_source(kind, err)
    }
}
