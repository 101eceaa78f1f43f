//! Intercepted requests, response snapshots, and cache keys.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

/// How the request was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document load
    Navigate,
    SameOrigin,
    #[default]
    Cors,
    NoCors,
}

#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub url: Url,
    pub method: Method,
    pub mode: RequestMode,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl InterceptedRequest {
    pub fn new(method: Method, url: Url, mode: RequestMode) -> Self {
        Self {
            url,
            method,
            mode,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Sub-resource GET
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Cors)
    }

    pub fn navigate(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Navigate)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Key of a cache entry. Only a GET request yields one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(request: &InterceptedRequest) -> Option<Self> {
        if request.method == Method::GET {
            Some(Self::for_url(&request.url))
        } else {
            None
        }
    }

    /// Key of a GET for `url`. The fragment never reaches the server, so it
    /// is not part of the key.
    pub fn for_url(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full snapshot of a response. Header names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Generic offline fallback for static assets.
    pub fn offline() -> Self {
        Self::new(503, "Offline").with_header("content-type", "text/plain")
    }

    /// Structured offline fallback for data consumers, which parse the body
    /// instead of catching a rejected fetch.
    pub fn data_offline(message: &str) -> Self {
        let body = serde_json::json!({
            "error": "Offline",
            "message": message,
        });
        Self::new(503, body.to_string()).with_header("content-type", "application/json")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
