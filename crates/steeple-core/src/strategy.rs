//! Fetch-handling strategies.
//!
//! Which strategy runs is a pure function of the request's classification.
//! Strategies borrow the shared store and network for the duration of one
//! request; writes that outlive the response are registered with the
//! request's `KeepAlive`.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use url::Url;

use crate::classifier::Classification;
use crate::error::{NetworkError, OfflineError};
use crate::keepalive::KeepAlive;
use crate::network::{FetchOptions, Network};
use crate::request::{CacheKey, InterceptedRequest, Response};
use crate::store::CacheStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
    NetworkFirstForNavigation,
    NetworkFirstWithDataCache,
    /// Straight to the network, no cache involved
    NetworkOnly,
}

impl Strategy {
    pub fn for_classification(classification: Classification) -> Self {
        match classification {
            Classification::Navigation => Strategy::NetworkFirstForNavigation,
            Classification::DataRequest => Strategy::NetworkFirstWithDataCache,
            Classification::StaticAsset => Strategy::CacheFirst,
            Classification::ApiRequest => Strategy::NetworkFirst,
            Classification::Page => Strategy::StaleWhileRevalidate,
            Classification::PassThrough => Strategy::NetworkOnly,
        }
    }
}

pub struct StrategyEngine {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    static_cache: String,
    data_cache: String,
    root_document: Url,
    offline_message: String,
}

impl StrategyEngine {
    pub fn new(
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
        static_cache: String,
        data_cache: String,
        root_document: Url,
        offline_message: String,
    ) -> Self {
        Self {
            store,
            network,
            static_cache,
            data_cache,
            root_document,
            offline_message,
        }
    }

    pub async fn handle(
        &self,
        strategy: Strategy,
        request: InterceptedRequest,
        keep_alive: &KeepAlive,
    ) -> Result<Response, OfflineError> {
        // The store only accepts GET keys; anything else bypasses it entirely.
        let Some(key) = CacheKey::for_request(&request) else {
            debug!(url = %request.url, method = %request.method, ?strategy, "Non-GET request, bypassing cache");
            return Ok(self.network.fetch(&request, FetchOptions::default()).await?);
        };

        match strategy {
            Strategy::CacheFirst => Ok(self.cache_first(&request, &key).await),
            Strategy::NetworkFirst => self.network_first(&request, &key, keep_alive).await,
            Strategy::StaleWhileRevalidate => {
                self.stale_while_revalidate(request, key, keep_alive).await
            }
            Strategy::NetworkFirstForNavigation => {
                self.network_first_for_navigation(&request, &key, keep_alive).await
            }
            Strategy::NetworkFirstWithDataCache => {
                Ok(self.network_first_with_data_cache(&request, &key, keep_alive).await)
            }
            Strategy::NetworkOnly => Ok(self.network.fetch(&request, FetchOptions::default()).await?),
        }
    }

    /// Store read that degrades to a miss.
    async fn lookup(&self, namespace: &str, key: &CacheKey) -> Option<Response> {
        match self.store.match_in(namespace, key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(cache = namespace, key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Write-behind: the caller already has its response.
    fn write_behind(&self, namespace: &str, key: &CacheKey, response: &Response, keep_alive: &KeepAlive) {
        let store = Arc::clone(&self.store);
        let namespace = namespace.to_string();
        let key = key.clone();
        let response = response.clone();
        keep_alive.wait_until(async move {
            if let Err(e) = store.put(&namespace, &key, &response).await {
                warn!(cache = %namespace, key = %key, error = %e, "Failed to cache response");
            }
        });
    }

    /// Static assets. Stale-tolerant because the cache is versioned.
    async fn cache_first(&self, request: &InterceptedRequest, key: &CacheKey) -> Response {
        if let Some(hit) = self.lookup(&self.static_cache, key).await {
            return hit;
        }

        match self.network.fetch(request, FetchOptions::default()).await {
            Ok(response) if response.is_success() => {
                if let Err(e) = self.store.put(&self.static_cache, key, &response).await {
                    warn!(key = %key, error = %e, "Failed to cache static asset");
                }
                response
            }
            Ok(response) => {
                debug!(key = %key, status = response.status, "Static asset not available");
                Response::offline()
            }
            Err(e) => {
                debug!(key = %key, error = %e, "Static asset fetch failed");
                Response::offline()
            }
        }
    }

    /// General API. No synthetic fallback: callers handle rejected fetches.
    async fn network_first(
        &self,
        request: &InterceptedRequest,
        key: &CacheKey,
        keep_alive: &KeepAlive,
    ) -> Result<Response, OfflineError> {
        match self.network.fetch(request, FetchOptions::default()).await {
            Ok(response) => {
                if response.is_success() {
                    self.write_behind(&self.static_cache, key, &response, keep_alive);
                }
                Ok(response)
            }
            Err(e) => match self.lookup(&self.static_cache, key).await {
                Some(hit) => {
                    debug!(key = %key, error = %e, "Network failed, serving cached response");
                    Ok(hit)
                }
                None => Err(e.into()),
            },
        }
    }

    /// HTML pages. Returns the cached copy right away while a refresh runs
    /// in the background; on a miss, waits for that same refresh.
    async fn stale_while_revalidate(
        &self,
        request: InterceptedRequest,
        key: CacheKey,
        keep_alive: &KeepAlive,
    ) -> Result<Response, OfflineError> {
        let (tx, rx) = oneshot::channel::<Result<Response, NetworkError>>();
        let store = Arc::clone(&self.store);
        let network = Arc::clone(&self.network);
        let namespace = self.static_cache.clone();
        let refresh_key = key.clone();

        keep_alive.wait_until(async move {
            let result = network.fetch(&request, FetchOptions::default()).await;
            match &result {
                Ok(response) if response.is_success() => {
                    if let Err(e) = store.put(&namespace, &refresh_key, response).await {
                        warn!(key = %refresh_key, error = %e, "Failed to cache revalidated page");
                    }
                }
                Ok(_) => {}
                Err(e) => debug!(key = %refresh_key, error = %e, "Background revalidation failed"),
            }
            // Nobody is listening once the cached copy has been served
            let _ = tx.send(result);
        });

        if let Some(hit) = self.lookup(&self.static_cache, &key).await {
            return Ok(hit);
        }

        match rx.await {
            Ok(result) => Ok(result?),
            Err(_) => Err(OfflineError::Background(format!(
                "revalidation of {} was cancelled",
                key
            ))),
        }
    }

    /// Top-level documents. Offline fallback is the exact URL, then the root
    /// document so client-side routes still load after a reload.
    async fn network_first_for_navigation(
        &self,
        request: &InterceptedRequest,
        key: &CacheKey,
        keep_alive: &KeepAlive,
    ) -> Result<Response, OfflineError> {
        match self.network.fetch(request, FetchOptions::default()).await {
            Ok(response) => {
                if response.is_success() {
                    self.write_behind(&self.static_cache, key, &response, keep_alive);
                }
                Ok(response)
            }
            Err(e) => {
                if let Some(hit) = self.lookup(&self.static_cache, key).await {
                    debug!(key = %key, "Offline navigation served from cache");
                    return Ok(hit);
                }
                let root = CacheKey::for_url(&self.root_document);
                if let Some(hit) = self.lookup(&self.static_cache, &root).await {
                    debug!(key = %key, "Offline navigation served root document");
                    return Ok(hit);
                }
                Err(e.into())
            }
        }
    }

    /// Remote-database traffic. Always resolves: data consumers branch on the
    /// JSON body rather than catching a rejected fetch.
    async fn network_first_with_data_cache(
        &self,
        request: &InterceptedRequest,
        key: &CacheKey,
        keep_alive: &KeepAlive,
    ) -> Response {
        match self.network.fetch(request, FetchOptions::default()).await {
            Ok(response) => {
                if response.is_success() {
                    self.write_behind(&self.data_cache, key, &response, keep_alive);
                }
                response
            }
            Err(e) => match self.lookup(&self.data_cache, key).await {
                Some(hit) => {
                    debug!(key = %key, error = %e, "Network failed, serving cached data");
                    hit
                }
                None => {
                    warn!(key = %key, error = %e, "Data unavailable offline");
                    Response::data_offline(&self.offline_message)
                }
            },
        }
    }
}
