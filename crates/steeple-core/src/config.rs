//! Worker configuration.
//!
//! One `OfflineConfig` is built at startup and injected into the
//! `CacheController`. It carries the build version that names the cache
//! namespaces, the install-time manifest, and the matchers used to tell
//! remote-database traffic apart from ordinary requests.

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::OfflineError;

/// Product name used as the cache namespace prefix
const DEFAULT_PRODUCT: &str = "steeple";

/// Bumping this invalidates every cache at the next activation
const DEFAULT_VERSION: &str = "v1";

const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Critical app-shell paths pre-warmed during install, in order
const DEFAULT_PRECACHE: &[&str] = &[
    "/",
    "/index.html",
    "/manifest.json",
    "/favicon.ico",
    "/logo192.png",
    "/logo512.png",
];

/// Remote-database hosts whose responses go to the data cache
const DEFAULT_DATA_HOST_SUFFIXES: &[&str] = &[
    "firestore.googleapis.com",
    "firebaseio.com",
    "firebasestorage.googleapis.com",
];

/// First-party paths whose responses go to the data cache
const DEFAULT_API_PATH_PATTERNS: &[&str] = &[r"/data(/|$)", r"^/api/v\d+/data/"];

const DEFAULT_OFFLINE_MESSAGE: &str =
    "You are offline and this data has not been cached yet. Reconnect to load it.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Title used when the push payload carries none
    pub default_title: String,
    pub icon: String,
    pub badge: String,
    /// Keys of the push `data` object tried, in order, for the notification tag
    pub tag_keys: Vec<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_title: "New announcement".to_string(),
            icon: "/logo192.png".to_string(),
            badge: "/badge.png".to_string(),
            tag_keys: vec![
                "scheduleId".to_string(),
                "eventId".to_string(),
                "id".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    pub product: String,
    pub version: String,
    pub origin: String,
    pub precache: Vec<String>,
    pub data_host_suffixes: Vec<String>,
    pub api_path_patterns: Vec<String>,
    pub root_document: String,
    pub offline_message: String,
    pub notification: NotificationConfig,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            product: DEFAULT_PRODUCT.to_string(),
            version: DEFAULT_VERSION.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            precache: to_strings(DEFAULT_PRECACHE),
            data_host_suffixes: to_strings(DEFAULT_DATA_HOST_SUFFIXES),
            api_path_patterns: to_strings(DEFAULT_API_PATH_PATTERNS),
            root_document: "/".to_string(),
            offline_message: DEFAULT_OFFLINE_MESSAGE.to_string(),
            notification: NotificationConfig::default(),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl OfflineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, OfflineError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| OfflineError::InvalidConfig(format!("unparsable config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that would otherwise fail later, at request time.
    pub fn validate(&self) -> Result<(), OfflineError> {
        if self.product.trim().is_empty() {
            return Err(OfflineError::InvalidConfig("product must not be empty".to_string()));
        }
        if self.version.trim().is_empty() {
            return Err(OfflineError::InvalidConfig("version must not be empty".to_string()));
        }
        self.origin_url()?;
        self.compile_api_patterns()?;
        Ok(())
    }

    /// Current static namespace, e.g. `steeple-v1`
    pub fn static_cache_name(&self) -> String {
        format!("{}-{}", self.product, self.version)
    }

    /// Current data namespace, e.g. `steeple-data-v1`
    pub fn data_cache_name(&self) -> String {
        format!("{}-data-{}", self.product, self.version)
    }

    pub fn namespace_prefix(&self) -> String {
        format!("{}-", self.product)
    }

    /// Whether a namespace belongs to this application, whatever its version.
    pub fn is_owned(&self, name: &str) -> bool {
        name.starts_with(&self.namespace_prefix())
    }

    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_cache_name() || name == self.data_cache_name()
    }

    pub fn origin_url(&self) -> Result<Url, OfflineError> {
        Url::parse(&self.origin)
            .map_err(|e| OfflineError::InvalidConfig(format!("origin {:?}: {}", self.origin, e)))
    }

    /// Absolute URL of a root-relative path under the application origin.
    pub fn resolve(&self, path: &str) -> Result<Url, OfflineError> {
        self.origin_url()?
            .join(path)
            .map_err(|e| OfflineError::InvalidConfig(format!("path {:?}: {}", path, e)))
    }

    pub fn compile_api_patterns(&self) -> Result<Vec<Regex>, OfflineError> {
        self.api_path_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    OfflineError::InvalidConfig(format!("api path pattern {:?}: {}", pattern, e))
                })
            })
            .collect()
    }
}
