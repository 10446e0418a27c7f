//! Client configuration.

use outpost_auth::DEFAULT_REFRESH_PATH;
use outpost_client::{ClientConfig, Error, ErrorKind, Result, RetryConfig};
use outpost_queue::{DrainPolicy, DEFAULT_MAX_QUEUE_SIZE};

/// Environment variable holding the API base URL.
pub const BASE_URL_ENV: &str = "OUTPOST_BASE_URL";
/// Environment variable overriding the retry budget.
pub const MAX_RETRIES_ENV: &str = "OUTPOST_MAX_RETRIES";

/// Configuration for an [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every request path is joined onto.
    pub base_url: String,
    /// Transport settings.
    pub client: ClientConfig,
    /// Retry settings, applied per logical call.
    pub retry: RetryConfig,
    /// Path of the token refresh endpoint.
    pub refresh_path: String,
    /// Maximum number of queued offline writes.
    pub max_queue_size: usize,
    /// How a drain treats failed replays.
    pub drain_policy: DrainPolicy,
    /// Connectivity assumed until the detector reports otherwise.
    pub initially_online: bool,
}

impl ApiConfig {
    /// Create a config with defaults for everything but the base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: ClientConfig::default(),
            retry: RetryConfig::default(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            drain_policy: DrainPolicy::default(),
            initially_online: true,
        }
    }

    /// Create a config builder.
    pub fn builder(base_url: impl Into<String>) -> ApiConfigBuilder {
        ApiConfigBuilder {
            config: Self::new(base_url),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `OUTPOST_BASE_URL`
    ///
    /// Optional:
    /// - `OUTPOST_MAX_RETRIES` (default: 3)
    /// - `OUTPOST_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var(BASE_URL_ENV).map_err(|_| {
            Error::new(ErrorKind::Config(format!("{BASE_URL_ENV} is not set")))
        })?;

        let mut config = Self::new(base_url);
        config.client = ClientConfig::from_env()?;

        if let Ok(value) = std::env::var(MAX_RETRIES_ENV) {
            let max_retries = value.trim().parse::<u32>().map_err(|e| {
                Error::with_source(
                    ErrorKind::Config(format!("{MAX_RETRIES_ENV} must be a non-negative integer")),
                    e,
                )
            })?;
            config.retry = config.retry.with_max_retries(max_retries);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the base URL is an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::new(ErrorKind::InvalidUrl(format!(
                "unsupported scheme: {}",
                url.scheme()
            ))));
        }
        Ok(())
    }

    /// Resolve a request path against the base URL. Absolute URLs pass
    /// through unchanged.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Full URL of the refresh endpoint.
    pub fn refresh_url(&self) -> String {
        self.url(&self.refresh_path)
    }
}

/// Builder for [`ApiConfig`].
#[derive(Debug, Clone)]
pub struct ApiConfigBuilder {
    config: ApiConfig,
}

impl ApiConfigBuilder {
    /// Set transport settings.
    pub fn with_client_config(mut self, client: ClientConfig) -> Self {
        self.config.client = client;
        self
    }

    /// Set retry settings.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set the refresh endpoint path.
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.config.refresh_path = path.into();
        self
    }

    /// Set the offline queue capacity.
    pub fn with_max_queue_size(mut self, max: usize) -> Self {
        self.config.max_queue_size = max;
        self
    }

    /// Set the drain policy.
    pub fn with_drain_policy(mut self, policy: DrainPolicy) -> Self {
        self.config.drain_policy = policy;
        self
    }

    /// Set the initial connectivity.
    pub fn with_initially_online(mut self, online: bool) -> Self {
        self.config.initially_online = online;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<ApiConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::new("https://api.example.com");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.client.timeout, Duration::from_secs(30));
        assert_eq!(config.max_queue_size, 1000);
        assert_eq!(config.drain_policy, DrainPolicy::BestEffort);
        assert!(config.initially_online);
        assert_eq!(config.refresh_url(), "https://api.example.com/auth/refresh");
    }

    #[test]
    fn test_url_joining() {
        let config = ApiConfig::new("https://api.example.com/v1/");
        assert_eq!(config.url("/messages"), "https://api.example.com/v1/messages");
        assert_eq!(config.url("messages/3"), "https://api.example.com/v1/messages/3");
        assert_eq!(
            config.url("https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn test_builder_validates() {
        let config = ApiConfig::builder("http://localhost:8080")
            .with_retry(RetryConfig::no_retry())
            .with_drain_policy(DrainPolicy::StopOnFailure)
            .with_initially_online(false)
            .with_max_queue_size(10)
            .build()
            .unwrap();
        assert_eq!(config.retry.max_retries, 0);
        assert!(!config.initially_online);

        let err = ApiConfig::builder("not a url").build().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidUrl(_)));

        let err = ApiConfig::builder("ftp://files.example.com").build().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidUrl(_)));
    }

    #[test]
    fn test_from_env() {
        // The only test in this crate touching these variables.
        std::env::remove_var(BASE_URL_ENV);
        let err = ApiConfig::from_env().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Config(_)));

        std::env::set_var(BASE_URL_ENV, "https://api.example.com");
        std::env::set_var(MAX_RETRIES_ENV, "5");
        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.retry.max_retries, 5);

        std::env::set_var(MAX_RETRIES_ENV, "lots");
        assert!(ApiConfig::from_env().is_err());

        std::env::remove_var(BASE_URL_ENV);
        std::env::remove_var(MAX_RETRIES_ENV);
    }
}
