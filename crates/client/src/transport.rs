//! The transport seam: one HTTP request in, one buffered response out.
//!
//! A transport never retries and never interprets status codes; a non-2xx
//! status is still `Ok(Response)`. Only a missing response (connect
//! failure, timeout, broken body) is an `Err`.

use async_trait::async_trait;
#[cfg(feature = "native")]
use tracing::{debug, info};

#[cfg(feature = "native")]
use crate::config::ClientConfig;
use crate::error::Result;
#[cfg(feature = "native")]
use crate::error::{Error, ErrorKind};
#[cfg(feature = "native")]
use crate::request::RequestBody;
use crate::request::Request;
use crate::response::Response;

/// Executes exactly one HTTP request.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send `request` and buffer the response.
    async fn issue(&self, request: &Request) -> Result<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn issue(&self, request: &Request) -> Result<Response> {
        (**self).issue(request).await
    }
}

/// Transport backed by a pooled `reqwest::Client`.
#[cfg(feature = "native")]
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
    config: ClientConfig,
}

#[cfg(feature = "native")]
impl ReqwestTransport {
    /// Create a new transport from client configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent);

        // Configure compression
        if config.accept_compressed {
            builder = builder.gzip(true).deflate(true);
        } else {
            builder = builder.gzip(false).deflate(false);
        }

        let inner = builder
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;

        Ok(Self { inner, config })
    }

    /// Create a transport with default configuration.
    pub fn default_transport() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[cfg(feature = "native")]
#[async_trait]
impl Transport for ReqwestTransport {
    async fn issue(&self, request: &Request) -> Result<Response> {
        let mut url = url::Url::parse(&request.url)?;
        if !request.query_params.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query_params);
        }

        let mut req = self.inner.request(request.method.to_reqwest(), url);

        if let Some(ref token) = request.bearer_token {
            req = req.bearer_auth(token);
        }

        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        if let Some(ref body) = request.body {
            req = match body {
                RequestBody::Json(value) => req.json(value),
                RequestBody::Text(text) => req.body(text.clone()),
                RequestBody::Bytes(bytes) => req.body(bytes.clone()),
            };
        }

        if self.config.enable_tracing {
            debug!(method = %request.method, url = %request.url, "Sending request");
        }

        let response = req.send().await?;
        let status = response.status().as_u16();

        if self.config.enable_tracing {
            let content_length = response.content_length();
            if response.status().is_success() {
                debug!(status, content_length, "Response received");
            } else {
                info!(status, content_length, "Non-success response");
            }
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?;

        Ok(Response::from_parts(status, headers, body))
    }
}
