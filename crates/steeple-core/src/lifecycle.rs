//! Install and activate: cache namespace creation and garbage collection.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::OfflineConfig;
use crate::error::OfflineError;
use crate::network::{FetchOptions, Network};
use crate::platform::Platform;
use crate::request::{CacheKey, InterceptedRequest};
use crate::store::CacheStore;

/// Maximum concurrent pre-warm fetches during install.
const MAX_CONCURRENT_PRECACHE: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrecacheFailure {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cache: String,
    /// Manifest paths now in the cache, in manifest order
    pub cached: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
    pub skipped_waiting: bool,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub kept: Vec<String>,
    pub clients_claimed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    pub deleted: Vec<String>,
    /// Owned namespaces that could not be deleted
    pub failed: Vec<String>,
}

/// Open the current static namespace and pre-warm it from the manifest.
///
/// Individual asset failures are recorded and skipped: an install that
/// failed outright would leave the worker unable to activate at all.
pub async fn install(
    config: &OfflineConfig,
    store: &dyn CacheStore,
    network: &dyn Network,
    platform: &dyn Platform,
) -> Result<InstallReport, OfflineError> {
    let cache = config.static_cache_name();
    store.open(&cache).await?;
    info!(cache = %cache, assets = config.precache.len(), "Installing");

    let cache_name = cache.as_str();
    let outcomes: Vec<(String, Result<(), String>)> = stream::iter(config.precache.clone())
        .map(|path| async move {
            let outcome = precache_one(config, store, network, cache_name, &path).await;
            (path, outcome)
        })
        .buffered(MAX_CONCURRENT_PRECACHE)
        .collect()
        .await;

    let mut report = InstallReport {
        cache,
        ..Default::default()
    };
    for (path, outcome) in outcomes {
        match outcome {
            Ok(()) => report.cached.push(path),
            Err(reason) => {
                warn!(path = %path, reason = %reason, "Failed to pre-cache asset");
                report.failed.push(PrecacheFailure { path, reason });
            }
        }
    }

    report.skipped_waiting = match platform.skip_waiting().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "skip_waiting refused, worker will wait for clients to close");
            false
        }
    };

    info!(
        cached = report.cached.len(),
        failed = report.failed.len(),
        "Install complete"
    );
    Ok(report)
}

async fn precache_one(
    config: &OfflineConfig,
    store: &dyn CacheStore,
    network: &dyn Network,
    cache: &str,
    path: &str,
) -> Result<(), String> {
    let url = config.resolve(path).map_err(|e| e.to_string())?;
    let request = InterceptedRequest::get(url);
    let response = network
        .fetch(&request, FetchOptions::reload())
        .await
        .map_err(|e| e.to_string())?;
    if !response.is_success() {
        return Err(format!("HTTP {}", response.status));
    }
    store
        .put(cache, &CacheKey::for_url(&request.url), &response)
        .await
        .map_err(|e| e.to_string())?;
    debug!(path = %path, "Pre-cached");
    Ok(())
}

/// Delete every owned namespace that is not current, then claim clients.
pub async fn activate(
    config: &OfflineConfig,
    store: &dyn CacheStore,
    platform: &dyn Platform,
) -> Result<ActivateReport, OfflineError> {
    let mut report = ActivateReport::default();

    for name in store.keys().await? {
        if !config.is_owned(&name) || config.is_current(&name) {
            report.kept.push(name);
            continue;
        }
        match store.delete(&name).await {
            Ok(_) => {
                info!(cache = %name, "Deleted stale cache");
                report.deleted.push(name);
            }
            Err(e) => {
                warn!(cache = %name, error = %e, "Failed to delete stale cache");
                report.kept.push(name);
            }
        }
    }

    report.clients_claimed = match platform.claim_clients().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Failed to claim clients");
            false
        }
    };
    Ok(report)
}

/// Delete every owned namespace regardless of version. A failed delete is
/// logged and the sweep continues.
pub async fn clear_owned(
    config: &OfflineConfig,
    store: &dyn CacheStore,
) -> Result<ClearReport, OfflineError> {
    let mut report = ClearReport::default();
    for name in store.keys().await? {
        if !config.is_owned(&name) {
            continue;
        }
        match store.delete(&name).await {
            Ok(true) => report.deleted.push(name),
            Ok(false) => debug!(cache = %name, "Cache already gone"),
            Err(e) => {
                warn!(cache = %name, error = %e, "Failed to delete cache");
                report.failed.push(name);
            }
        }
    }
    info!(
        deleted = report.deleted.len(),
        failed = report.failed.len(),
        "Cleared caches"
    );
    Ok(report)
}
