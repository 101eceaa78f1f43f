//! Push payload -> displayed notification.
//!
//! Expected payload: `{"notification": {"title", "body"}, "data": {"scheduleId": ...}}`.
//! The tag comes from the first configured `data` key present, so repeated
//! pushes about one schedule or event collapse into a single notification.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::NotificationConfig;
use crate::platform::Notification;

#[derive(Debug, Default, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub notification: PushContent,
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PushContent {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl PushPayload {
    /// A payload that is not JSON is shown as plain text.
    pub fn parse(raw: &[u8]) -> Self {
        match serde_json::from_slice(raw) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(error = %e, "Push payload is not JSON, showing it as text");
                let text = String::from_utf8_lossy(raw).trim().to_string();
                Self {
                    notification: PushContent {
                        title: None,
                        body: (!text.is_empty()).then_some(text),
                    },
                    data: Map::new(),
                }
            }
        }
    }

    pub fn into_notification(self, config: &NotificationConfig) -> Notification {
        let tag = config
            .tag_keys
            .iter()
            .find_map(|key| match self.data.get(key) {
                Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
                Some(Value::Number(id)) => Some(id.to_string()),
                _ => None,
            });

        Notification {
            title: self
                .notification
                .title
                .unwrap_or_else(|| config.default_title.clone()),
            body: self.notification.body.unwrap_or_default(),
            icon: config.icon.clone(),
            badge: config.badge.clone(),
            tag,
            data: Value::Object(self.data),
        }
    }
}
