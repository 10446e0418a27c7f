//! Response classification.
//!
//! Every transport outcome maps to exactly one [`Classification`]:
//!
//! | outcome                 | classification   |
//! |-------------------------|------------------|
//! | 2xx                     | `Success`        |
//! | 401                     | `Unauthorized`   |
//! | 429                     | `RateLimited`    |
//! | 500-599                 | `ServerError`    |
//! | no response / timeout   | `NetworkError`   |
//! | any other status        | `ClientError`    |

use std::time::Duration;

use crate::error::{is_retryable_status, Error, ErrorKind, Result};
use crate::response::Response;

/// Typed interpretation of one transmission.
#[derive(Debug)]
pub enum Classification {
    /// 2xx response.
    Success(Response),
    /// 401: the bearer credential was rejected.
    Unauthorized(Response),
    /// 429: the backend is throttling us.
    RateLimited(Response),
    /// 5xx: the backend failed.
    ServerError(Response),
    /// No response arrived (connection failure or timeout).
    NetworkError(Error),
    /// Any other non-2xx response.
    ClientError(Response),
}

impl Classification {
    /// Classify the result of a transport call.
    pub fn from_transport(result: Result<Response>) -> Self {
        match result {
            Ok(response) => Self::from_response(response),
            Err(err) => Self::NetworkError(err),
        }
    }

    /// Classify a received response by status code.
    pub fn from_response(response: Response) -> Self {
        match response.status() {
            200..=299 => Self::Success(response),
            401 => Self::Unauthorized(response),
            429 => Self::RateLimited(response),
            500..=599 => Self::ServerError(response),
            _ => Self::ClientError(response),
        }
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Unauthorized(_) => "unauthorized",
            Self::RateLimited(_) => "rate_limited",
            Self::ServerError(_) => "server_error",
            Self::NetworkError(_) => "network_error",
            Self::ClientError(_) => "client_error",
        }
    }

    /// HTTP status, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Success(r)
            | Self::Unauthorized(r)
            | Self::RateLimited(r)
            | Self::ServerError(r)
            | Self::ClientError(r) => Some(r.status()),
            Self::NetworkError(_) => None,
        }
    }

    /// Returns true for a 2xx outcome.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true if a retry may succeed where this attempt failed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::ServerError(_) | Self::NetworkError(_) => true,
            Self::ClientError(r) => is_retryable_status(r.status()),
            Self::Success(_) | Self::Unauthorized(_) => false,
        }
    }

    /// Server-provided Retry-After, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited(r) | Self::ServerError(r) | Self::ClientError(r) => r.retry_after(),
            _ => None,
        }
    }

    /// Convert into the caller-facing result.
    pub fn into_result(self) -> Result<Response> {
        match self {
            Self::Success(response) => Ok(response),
            Self::Unauthorized(response) => Err(Error::new(ErrorKind::Unauthorized(
                response.error_message(),
            ))),
            Self::RateLimited(response) => Err(Error::new(ErrorKind::RateLimited {
                retry_after: response.retry_after(),
            })),
            Self::ServerError(response) => Err(Error::new(ErrorKind::Server {
                status: response.status(),
                message: response.error_message(),
            })),
            Self::NetworkError(err) => Err(err),
            Self::ClientError(response) => Err(Error::new(ErrorKind::Http {
                status: response.status(),
                message: response.error_message(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(status: u16) -> Classification {
        Classification::from_response(Response::from_parts(
            status,
            Vec::<(String, String)>::new(),
            r#"{"success":false,"message":"nope"}"#,
        ))
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(classify(200), Classification::Success(_)));
        assert!(matches!(classify(201), Classification::Success(_)));
        assert!(matches!(classify(204), Classification::Success(_)));
        assert!(matches!(classify(401), Classification::Unauthorized(_)));
        assert!(matches!(classify(429), Classification::RateLimited(_)));
        assert!(matches!(classify(500), Classification::ServerError(_)));
        assert!(matches!(classify(503), Classification::ServerError(_)));
        assert!(matches!(classify(599), Classification::ServerError(_)));
        assert!(matches!(classify(304), Classification::ClientError(_)));
        assert!(matches!(classify(400), Classification::ClientError(_)));
        assert!(matches!(classify(403), Classification::ClientError(_)));
        assert!(matches!(classify(404), Classification::ClientError(_)));
        assert!(matches!(classify(408), Classification::ClientError(_)));
    }

    #[test]
    fn test_transport_failures_are_network_errors() {
        let outcome = Classification::from_transport(Err(Error::new(ErrorKind::Timeout)));
        assert!(matches!(outcome, Classification::NetworkError(_)));
        assert_eq!(outcome.status(), None);
        assert!(outcome.is_retryable());

        let outcome = Classification::from_transport(Err(Error::new(ErrorKind::Connection(
            "refused".into(),
        ))));
        assert_eq!(outcome.label(), "network_error");
    }

    #[test]
    fn test_retryable_classes() {
        assert!(classify(429).is_retryable());
        assert!(classify(502).is_retryable());
        assert!(classify(408).is_retryable());
        assert!(!classify(200).is_retryable());
        assert!(!classify(401).is_retryable());
        assert!(!classify(404).is_retryable());
    }

    #[test]
    fn test_into_result_preserves_status_and_message() {
        let err = classify(422).into_result().unwrap_err();
        match err.kind {
            ErrorKind::Http { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "nope");
            }
            other => panic!("unexpected kind: {other:?}"),
        }

        let err = classify(503).into_result().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Server { status: 503, .. }));
        assert!(err.is_retryable());

        let err = classify(401).into_result().unwrap_err();
        assert!(err.is_auth_error());

        assert!(classify(200).into_result().is_ok());
    }

    #[test]
    fn test_rate_limited_carries_retry_after() {
        let outcome = Classification::from_response(Response::from_parts(
            429,
            [("Retry-After", "12")],
            "",
        ));
        assert_eq!(outcome.retry_after(), Some(Duration::from_secs(12)));
        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));
    }
}
