//! Network access for the worker.
//!
//! `Network` is the seam between the strategies and the real transport.
//! `HttpNetwork` is the production implementation on top of reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderName, HeaderValue};
use reqwest::Client;
use tracing::debug;

use crate::error::NetworkError;
use crate::request::{InterceptedRequest, Response};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Skip any intermediate HTTP cache (used when pre-warming on install)
    pub bypass_http_cache: bool,
}

impl FetchOptions {
    pub fn reload() -> Self {
        Self {
            bypass_http_cache: true,
        }
    }
}

#[async_trait]
pub trait Network: Send + Sync {
    /// Resolves with any response the server sends, 2xx or not.
    /// Only a failed transport is an error.
    async fn fetch(
        &self,
        request: &InterceptedRequest,
        options: FetchOptions,
    ) -> Result<Response, NetworkError>;
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpNetwork {
    client: Client,
}

impl HttpNetwork {
    pub fn new() -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(
        &self,
        request: &InterceptedRequest,
        options: FetchOptions,
    ) -> Result<Response, NetworkError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| NetworkError::InvalidRequest(format!("bad header name {:?}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| NetworkError::InvalidRequest(format!("bad value for header {}", name)))?;
            builder = builder.header(name, value);
        }
        if options.bypass_http_cache {
            builder = builder
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let mut snapshot = Response::new(status, bytes::Bytes::new());
        for (name, value) in response.headers() {
            match value.to_str() {
                Ok(value) => {
                    snapshot.headers.insert(name.as_str().to_string(), value.to_string());
                }
                Err(_) => debug!(header = %name, "Dropping non-ASCII response header"),
            }
        }
        snapshot.body = response.bytes().await?;

        debug!(url = %request.url, method = %request.method, status, "Network response");
        Ok(snapshot)
    }
}
