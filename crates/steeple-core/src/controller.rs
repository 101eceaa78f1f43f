//! The worker: one `CacheController` per process, driven by a host adapter
//! through the `WorkerHooks` entry points.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::classifier::{Classification, Classifier};
use crate::config::OfflineConfig;
use crate::control::{ControlMessage, ControlReply};
use crate::error::OfflineError;
use crate::keepalive::KeepAlive;
use crate::lifecycle::{self, ActivateReport, InstallReport};
use crate::network::Network;
use crate::platform::{Notification, Platform};
use crate::push::PushPayload;
use crate::request::{InterceptedRequest, Response};
use crate::store::CacheStore;
use crate::strategy::{Strategy, StrategyEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
}

/// Event entry points, registered once by the host adapter.
#[async_trait]
pub trait WorkerHooks: Send + Sync {
    async fn on_install(&self) -> Result<InstallReport, OfflineError>;

    async fn on_activate(&self) -> Result<ActivateReport, OfflineError>;

    /// Work that outlives the response is registered on `keep_alive`.
    async fn on_fetch(
        &self,
        request: InterceptedRequest,
        keep_alive: &KeepAlive,
    ) -> Result<Response, OfflineError>;

    /// `None` when the message is not a control command.
    async fn on_message(&self, message: &serde_json::Value) -> Option<ControlReply>;

    async fn on_push(&self, payload: &[u8]) -> Result<Notification, OfflineError>;
}

pub struct CacheController {
    config: OfflineConfig,
    classifier: Classifier,
    engine: StrategyEngine,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    platform: Arc<dyn Platform>,
    state: watch::Sender<WorkerState>,
}

impl CacheController {
    pub fn new(
        config: OfflineConfig,
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
        platform: Arc<dyn Platform>,
    ) -> Result<Self, OfflineError> {
        config.validate()?;
        let classifier = Classifier::from_config(&config)?;
        let engine = StrategyEngine::new(
            Arc::clone(&store),
            Arc::clone(&network),
            config.static_cache_name(),
            config.data_cache_name(),
            config.resolve(&config.root_document)?,
            config.offline_message.clone(),
        );
        let (state, _) = watch::channel(WorkerState::Parsed);

        Ok(Self {
            config,
            classifier,
            engine,
            store,
            network,
            platform,
            state,
        })
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    pub fn classify(&self, request: &InterceptedRequest) -> Classification {
        self.classifier.classify(request)
    }
}

#[async_trait]
impl WorkerHooks for CacheController {
    async fn on_install(&self) -> Result<InstallReport, OfflineError> {
        self.state.send_replace(WorkerState::Installing);
        let result = lifecycle::install(
            &self.config,
            self.store.as_ref(),
            self.network.as_ref(),
            self.platform.as_ref(),
        )
        .await;
        // A failed install leaves the worker as it was before
        self.state.send_replace(if result.is_ok() {
            WorkerState::Installed
        } else {
            WorkerState::Parsed
        });
        result
    }

    async fn on_activate(&self) -> Result<ActivateReport, OfflineError> {
        let previous = self.state.send_replace(WorkerState::Activating);
        let result =
            lifecycle::activate(&self.config, self.store.as_ref(), self.platform.as_ref()).await;
        match &result {
            Ok(report) => {
                info!(deleted = report.deleted.len(), "Worker activated");
                self.state.send_replace(WorkerState::Activated);
            }
            Err(_) => {
                self.state.send_replace(previous);
            }
        }
        result
    }

    async fn on_fetch(
        &self,
        request: InterceptedRequest,
        keep_alive: &KeepAlive,
    ) -> Result<Response, OfflineError> {
        let classification = self.classifier.classify(&request);
        debug!(url = %request.url, method = %request.method, ?classification, "Intercepted");

        let strategy = Strategy::for_classification(classification);
        self.engine.handle(strategy, request, keep_alive).await
    }

    async fn on_message(&self, message: &serde_json::Value) -> Option<ControlReply> {
        let Some(command) = ControlMessage::parse(message) else {
            debug!(payload = %message, "Ignoring unrecognized message");
            return None;
        };
        info!(command = command.name(), "Control command received");

        let outcome = match command {
            ControlMessage::SkipWaiting => self
                .platform
                .skip_waiting()
                .await
                .map(|()| ControlReply::SkipWaitingAck),
            ControlMessage::ClearCache => lifecycle::clear_owned(&self.config, self.store.as_ref())
                .await
                .map(|report| ControlReply::CacheCleared {
                    deleted: report.deleted,
                    failed: report.failed,
                }),
        };

        Some(outcome.unwrap_or_else(|e| {
            warn!(command = command.name(), error = %e, "Control command failed");
            ControlReply::CommandFailed {
                command: command.name().to_string(),
                error: e.detail(),
            }
        }))
    }

    async fn on_push(&self, payload: &[u8]) -> Result<Notification, OfflineError> {
        let notification = PushPayload::parse(payload).into_notification(&self.config.notification);
        self.platform.show_notification(&notification).await?;
        Ok(notification)
    }
}
