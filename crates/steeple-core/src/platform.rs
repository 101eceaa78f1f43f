//! Boundary to the host runtime that runs the worker.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OfflineError;

/// A notification as handed to the operating system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Notifications sharing a tag replace each other instead of stacking
    pub tag: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[async_trait]
pub trait Platform: Send + Sync {
    /// Let a freshly installed worker take over without waiting for every
    /// open client to close.
    async fn skip_waiting(&self) -> Result<(), OfflineError>;

    /// Start controlling every open client without a reload.
    async fn claim_clients(&self) -> Result<(), OfflineError>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), OfflineError>;
}
