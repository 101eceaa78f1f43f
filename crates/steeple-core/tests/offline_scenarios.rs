//! End-to-end offline scenarios driven through the controller's hooks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use steeple_core::{
    CacheController, CacheKey, CacheStore, FetchOptions, InterceptedRequest, KeepAlive,
    MemoryStore, Method, Network, NetworkError, Notification, OfflineConfig, OfflineError,
    Platform, RequestMode, Response, Url, WorkerHooks,
};

const ORIGIN: &str = "http://localhost:3000";

fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

/// A network that can be switched off, and can be told to hang on a URL.
#[derive(Default)]
struct SwitchableNetwork {
    offline: AtomicBool,
    responses: Mutex<HashMap<String, Response>>,
    hanging: Mutex<Vec<String>>,
}

impl SwitchableNetwork {
    fn serve(&self, path: &str, response: Response) {
        self.responses.lock().unwrap().insert(url(path).to_string(), response);
    }

    fn hang(&self, path: &str) {
        self.hanging.lock().unwrap().push(url(path).to_string());
    }

    fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for SwitchableNetwork {
    async fn fetch(
        &self,
        request: &InterceptedRequest,
        _options: FetchOptions,
    ) -> Result<Response, NetworkError> {
        let key = request.url.to_string();
        let hangs = self.hanging.lock().unwrap().contains(&key);
        if hangs {
            return std::future::pending().await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Unreachable(key));
        }
        let response = self.responses.lock().unwrap().get(&key).cloned();
        response.ok_or(NetworkError::Unreachable(key))
    }
}

struct QuietPlatform;

#[async_trait]
impl Platform for QuietPlatform {
    async fn skip_waiting(&self) -> Result<(), OfflineError> {
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), OfflineError> {
        Ok(())
    }

    async fn show_notification(&self, _notification: &Notification) -> Result<(), OfflineError> {
        Ok(())
    }
}

struct Worker {
    controller: CacheController,
    store: Arc<MemoryStore>,
    network: Arc<SwitchableNetwork>,
}

impl Worker {
    fn new(version: &str) -> Self {
        Self::with_store(version, Arc::new(MemoryStore::new()))
    }

    fn with_store(version: &str, store: Arc<MemoryStore>) -> Self {
        let network = Arc::new(SwitchableNetwork::default());
        let config = OfflineConfig {
            product: "app".to_string(),
            version: version.to_string(),
            origin: ORIGIN.to_string(),
            precache: vec!["/".to_string()],
            ..Default::default()
        };
        let controller = CacheController::new(
            config,
            Arc::clone(&store) as Arc<dyn CacheStore>,
            Arc::clone(&network) as Arc<dyn Network>,
            Arc::new(QuietPlatform),
        )
        .unwrap();
        Self {
            controller,
            store,
            network,
        }
    }

    async fn fetch(&self, request: InterceptedRequest) -> Result<Response, OfflineError> {
        let keep_alive = KeepAlive::new();
        let result = self.controller.on_fetch(request, &keep_alive).await;
        keep_alive.settle().await;
        result
    }

    async fn cached(&self, namespace: &str, path: &str) -> Option<Response> {
        self.store
            .match_in(namespace, &CacheKey::for_url(&url(path)))
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn static_asset_is_cached_and_served_offline() {
    let worker = Worker::new("v1");
    let logo = Response::new(200, vec![0x89u8, b'P', b'N', b'G', 0, 1, 2])
        .with_header("content-type", "image/png");
    worker.network.serve("/static/logo.png", logo.clone());

    let first = worker.fetch(InterceptedRequest::get(url("/static/logo.png"))).await.unwrap();
    assert_eq!(first.status, 200);
    assert_eq!(first.body, logo.body);
    assert_eq!(worker.cached("app-v1", "/static/logo.png").await, Some(logo.clone()));

    worker.network.go_offline();
    let second = worker.fetch(InterceptedRequest::get(url("/static/logo.png"))).await.unwrap();
    assert_eq!(second.body, logo.body);
}

#[tokio::test]
async fn api_request_falls_back_to_stale_copy() {
    let worker = Worker::new("v1");
    worker.network.serve("/api/members", Response::new(200, r#"{"members":[]}"#));
    worker.fetch(InterceptedRequest::get(url("/api/members"))).await.unwrap();

    worker.network.go_offline();
    let response = worker.fetch(InterceptedRequest::get(url("/api/members"))).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.text(), r#"{"members":[]}"#);
}

#[tokio::test]
async fn data_request_offline_without_cache_is_structured_json() {
    let worker = Worker::new("v1");
    worker.network.go_offline();

    let paths = ["/some/data", "/api/v1/data/members", "https://proj.firebaseio.com/x.json"];
    for path in paths {
        let response = worker.fetch(InterceptedRequest::get(url(path))).await.unwrap();
        assert_eq!(response.status, 503, "{}", path);
        assert_eq!(response.header("content-type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["error"], "Offline");
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
}

#[tokio::test]
async fn activation_keeps_only_current_namespaces() {
    let store = Arc::new(MemoryStore::new());
    for name in ["app-v1", "app-data-v1", "app-v2", "app-data-v2"] {
        store.open(name).await.unwrap();
    }
    let worker = Worker::with_store("v2", store);

    let report = worker.controller.on_activate().await.unwrap();

    assert_eq!(worker.store.keys().await.unwrap(), vec!["app-data-v2", "app-v2"]);
    assert_eq!(report.deleted.len(), 2);
    assert!(report.clients_claimed);
}

#[tokio::test]
async fn stale_while_revalidate_does_not_wait_for_a_hung_network() {
    let worker = Worker::new("v1");
    worker
        .store
        .put("app-v1", &CacheKey::for_url(&url("/members")), &Response::new(200, "cached page"))
        .await
        .unwrap();
    worker.network.hang("/members");

    let keep_alive = KeepAlive::new();
    let response = tokio::time::timeout(
        Duration::from_millis(500),
        worker
            .controller
            .on_fetch(InterceptedRequest::get(url("/members")), &keep_alive),
    )
    .await
    .expect("served from cache without waiting on the network")
    .unwrap();

    assert_eq!(response.text(), "cached page");
    // The refresh is still in flight and tracked
    assert_eq!(keep_alive.pending(), 1);
}

#[tokio::test]
async fn navigation_fallback_order() {
    // Exact URL cached
    let worker = Worker::new("v1");
    worker.network.serve("/events/3", Response::new(200, "event 3"));
    worker.network.serve("/", Response::new(200, "shell"));
    worker.fetch(InterceptedRequest::navigate(url("/events/3"))).await.unwrap();
    worker.fetch(InterceptedRequest::navigate(url("/"))).await.unwrap();
    worker.network.go_offline();
    let response = worker.fetch(InterceptedRequest::navigate(url("/events/3"))).await.unwrap();
    assert_eq!(response.text(), "event 3");

    // Only the root document cached
    let worker = Worker::new("v1");
    worker.network.serve("/", Response::new(200, "shell"));
    worker.controller.on_install().await.unwrap();
    worker.network.go_offline();
    let response = worker.fetch(InterceptedRequest::navigate(url("/events/3"))).await.unwrap();
    assert_eq!(response.text(), "shell");

    // Nothing cached
    let worker = Worker::new("v1");
    worker.network.go_offline();
    let err = worker
        .fetch(InterceptedRequest::navigate(url("/events/3")))
        .await
        .unwrap_err();
    assert!(matches!(err, OfflineError::NetworkUnavailable(_)));
}

#[tokio::test]
async fn non_get_requests_never_touch_the_cache() {
    let worker = Worker::new("v1");
    let paths = ["/static/upload.png", "/api/members", "/members", "/some/data"];
    for path in paths {
        worker.network.serve(path, Response::new(201, "created"));
    }

    for path in paths {
        for method in [Method::POST, Method::PUT, Method::DELETE] {
            let request = InterceptedRequest::new(method, url(path), RequestMode::Cors);
            let response = worker.fetch(request).await.unwrap();
            assert_eq!(response.status, 201);
        }
    }
    assert_eq!(worker.store.entry_count().await, 0);

    // With the network down a POST is not answered from a cached GET
    worker.network.serve("/api/members", Response::new(200, "list"));
    worker.fetch(InterceptedRequest::get(url("/api/members"))).await.unwrap();
    worker.network.go_offline();
    let post = InterceptedRequest::new(Method::POST, url("/api/members"), RequestMode::Cors);
    assert!(worker.fetch(post).await.is_err());
}

#[tokio::test]
async fn write_through_lands_only_after_settling() {
    let worker = Worker::new("v1");
    worker.network.serve("/api/events", Response::new(200, "events"));

    let keep_alive = KeepAlive::new();
    let response = worker
        .controller
        .on_fetch(InterceptedRequest::get(url("/api/events")), &keep_alive)
        .await
        .unwrap();
    assert_eq!(response.text(), "events");
    assert_eq!(keep_alive.pending(), 1);

    keep_alive.settle().await;
    assert_eq!(
        worker.cached("app-v1", "/api/events").await.map(|r| r.text()).as_deref(),
        Some("events")
    );
}
