//! Per-request routing decision.
//!
//! Rules are evaluated in order and the first match wins:
//! 1. navigation -> `Navigation`
//! 2. remote-database host or data API path -> `DataRequest`
//! 3. anything but GET -> `PassThrough`
//! 4. cross-origin outside `/static` -> `PassThrough`
//! 5. `/static/` -> `StaticAsset`
//! 6. `/api/` -> `ApiRequest`
//! 7. everything else -> `Page`

use regex::Regex;
use reqwest::Method;
use serde::Serialize;
use url::{Origin, Url};

use crate::config::OfflineConfig;
use crate::error::OfflineError;
use crate::request::{InterceptedRequest, RequestMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Classification {
    Navigation,
    DataRequest,
    StaticAsset,
    ApiRequest,
    Page,
    /// Never touches a cache
    PassThrough,
}

pub struct Classifier {
    origin: Origin,
    data_host_suffixes: Vec<String>,
    api_path_patterns: Vec<Regex>,
}

impl Classifier {
    pub fn new(origin: &Url, data_host_suffixes: Vec<String>, api_path_patterns: Vec<Regex>) -> Self {
        Self {
            origin: origin.origin(),
            data_host_suffixes: data_host_suffixes
                .into_iter()
                .map(|suffix| suffix.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            api_path_patterns,
        }
    }

    pub fn from_config(config: &OfflineConfig) -> Result<Self, OfflineError> {
        Ok(Self::new(
            &config.origin_url()?,
            config.data_host_suffixes.clone(),
            config.compile_api_patterns()?,
        ))
    }

    pub fn classify(&self, request: &InterceptedRequest) -> Classification {
        if request.mode == RequestMode::Navigate {
            return Classification::Navigation;
        }

        let path = request.url.path();
        if self.is_data_host(&request.url) || self.api_path_patterns.iter().any(|re| re.is_match(path)) {
            return Classification::DataRequest;
        }

        if request.method != Method::GET {
            return Classification::PassThrough;
        }

        if request.url.origin() != self.origin && !path.starts_with("/static") {
            return Classification::PassThrough;
        }

        if path.starts_with("/static/") {
            Classification::StaticAsset
        } else if path.starts_with("/api/") {
            Classification::ApiRequest
        } else {
            Classification::Page
        }
    }

    fn is_data_host(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.data_host_suffixes.iter().any(|suffix| {
            host == *suffix
                || (host.ends_with(suffix.as_str())
                    && host[..host.len() - suffix.len()].ends_with('.'))
        })
    }
}
