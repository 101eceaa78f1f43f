//! Scripted collaborators for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::error::{NetworkError, OfflineError};
use crate::network::{FetchOptions, Network};
use crate::platform::{Notification, Platform};
use crate::request::{InterceptedRequest, Response};

pub const ORIGIN: &str = "http://localhost:3000";

/// Root-relative paths resolve against `ORIGIN`; absolute URLs pass through.
pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

#[derive(Clone)]
enum Script {
    Respond(Response),
    Fail,
    Hang,
}

/// Network whose answers are scripted per URL. Unscripted URLs fail.
#[derive(Default)]
pub struct MockNetwork {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<(String, FetchOptions)>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, path: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url(path).to_string(), script);
    }

    pub fn respond(&self, path: &str, response: Response) {
        self.script(path, Script::Respond(response));
    }

    pub fn fail(&self, path: &str) {
        self.script(path, Script::Fail);
    }

    /// The fetch never resolves.
    pub fn hang(&self, path: &str) {
        self.script(path, Script::Hang);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(String, FetchOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(
        &self,
        request: &InterceptedRequest,
        options: FetchOptions,
    ) -> Result<Response, NetworkError> {
        let key = request.url.to_string();
        self.calls.lock().unwrap().push((key.clone(), options));
        let script = self.scripts.lock().unwrap().get(&key).cloned();
        match script {
            Some(Script::Respond(response)) => Ok(response),
            Some(Script::Hang) => std::future::pending().await,
            Some(Script::Fail) | None => Err(NetworkError::Unreachable(key)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    SkipWaiting,
    ClaimClients,
    ShowNotification(Notification),
}

/// Records every platform call, optionally failing them.
#[derive(Default)]
pub struct RecordingPlatform {
    calls: Mutex<Vec<PlatformCall>>,
    fail: bool,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: PlatformCall) -> Result<(), OfflineError> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            Err(OfflineError::Platform("refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn skip_waiting(&self) -> Result<(), OfflineError> {
        self.record(PlatformCall::SkipWaiting)
    }

    async fn claim_clients(&self) -> Result<(), OfflineError> {
        self.record(PlatformCall::ClaimClients)
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), OfflineError> {
        self.record(PlatformCall::ShowNotification(notification.clone()))
    }
}
