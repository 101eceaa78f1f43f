//! Administrative messages from the host page, and the replies sent back.

use serde::{Deserialize, Serialize};

/// `{"type": "SKIP_WAITING"}` or `{"type": "CLEAR_CACHE"}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SkipWaiting,
    ClearCache,
}

impl ControlMessage {
    /// `None` for anything that is not a known command.
    pub fn parse(message: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(message.clone()).ok()
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControlMessage::SkipWaiting => "SKIP_WAITING",
            ControlMessage::ClearCache => "CLEAR_CACHE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlReply {
    SkipWaitingAck,
    CacheCleared {
        deleted: Vec<String>,
        /// Owned caches that survived the sweep
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        failed: Vec<String>,
    },
    CommandFailed { command: String, error: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(
            ControlMessage::parse(&json!({"type": "SKIP_WAITING"})),
            Some(ControlMessage::SkipWaiting)
        );
        assert_eq!(
            ControlMessage::parse(&json!({"type": "CLEAR_CACHE", "extra": 1})),
            Some(ControlMessage::ClearCache)
        );
    }

    #[test]
    fn test_parse_unknown_commands() {
        assert_eq!(ControlMessage::parse(&json!({"type": "RELOAD"})), None);
        assert_eq!(ControlMessage::parse(&json!("SKIP_WAITING")), None);
        assert_eq!(ControlMessage::parse(&json!({})), None);
    }

    #[test]
    fn test_reply_wire_format() {
        let reply = ControlReply::CacheCleared {
            deleted: vec!["app-v1".to_string()],
            failed: vec![],
        };
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"type": "CACHE_CLEARED", "deleted": ["app-v1"]})
        );
        let partial = ControlReply::CacheCleared {
            deleted: vec!["app-v1".to_string()],
            failed: vec!["app-data-v1".to_string()],
        };
        assert_eq!(
            serde_json::to_value(&partial).unwrap(),
            json!({"type": "CACHE_CLEARED", "deleted": ["app-v1"], "failed": ["app-data-v1"]})
        );
        assert_eq!(
            serde_json::to_value(ControlReply::SkipWaitingAck).unwrap(),
            json!({"type": "SKIP_WAITING_ACK"})
        );
    }
}
