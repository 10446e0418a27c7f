//! Error types for outpost-queue.

/// Result type alias for outpost-queue operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for outpost-queue operations.
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
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// The backing store failed; the request was not queued.
    #[error("Queue storage error: {0}")]
    Storage(String),

    /// The queue already holds `capacity` requests.
    #[error("Offline queue full ({capacity} pending requests)")]
    Full { capacity: usize },

    /// Compare-and-swap kept losing to concurrent writers.
    #[error("Queue update contended after {attempts} attempts")]
    Contended { attempts: u32 },

    /// A request could not be serialized.
    #[error("JSON error: {0}")]
    Json(String),
}

impl From<outpost_auth::Error> for Error {
    fn from(err: outpost_auth::Error) -> Self {
        Error::with_source(ErrorKind::Storage(err.kind.to_string()), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<Error> for outpost_client::Error {
    fn from(err: Error) -> Self {
        let kind = match &err.kind {
            ErrorKind::Full { capacity } => outpost_client::ErrorKind::QueueFull {
                capacity: *capacity,
            },
            ErrorKind::Json(message) => outpost_client::ErrorKind::Json(message.clone()),
            other => outpost_client::ErrorKind::Storage(other.to_string()),
        };
        outpost_client::Error::with_source(kind, err)
    }
}
