//! Host side of the worker when run from a terminal.

use async_trait::async_trait;
use steeple_core::{Notification, OfflineError, Platform};
use tracing::info;

/// There are no browser clients here: lifecycle transitions are logged and
/// always accepted, notifications are printed to stderr.
#[derive(Debug, Default)]
pub struct CliPlatform;

impl CliPlatform {
    pub fn new() -> Self {
        Self
    }
}

/// One line per notification, tag first when there is one.
fn notification_line(notification: &Notification) -> String {
    match &notification.tag {
        Some(tag) => format!("[{}] {}: {}", tag, notification.title, notification.body),
        None => format!("{}: {}", notification.title, notification.body),
    }
}

#[async_trait]
impl Platform for CliPlatform {
    async fn skip_waiting(&self) -> Result<(), OfflineError> {
        info!("Worker will take over without waiting");
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), OfflineError> {
        info!("Claimed open clients");
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), OfflineError> {
        eprintln!("{}", notification_line(notification));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(tag: Option<&str>) -> Notification {
        Notification {
            title: "Youth group".to_string(),
            body: "Tonight at 7".to_string(),
            icon: "/logo192.png".to_string(),
            badge: "/badge.png".to_string(),
            tag: tag.map(str::to_string),
            data: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn test_lifecycle_calls_are_accepted() {
        let platform = CliPlatform::new();
        platform.skip_waiting().await.unwrap();
        platform.claim_clients().await.unwrap();
        platform.show_notification(&notification(None)).await.unwrap();
    }

    #[test]
    fn test_notification_line_puts_tag_first() {
        assert_eq!(
            notification_line(&notification(Some("ev-9"))),
            "[ev-9] Youth group: Tonight at 7"
        );
        assert_eq!(notification_line(&notification(None)), "Youth group: Tonight at 7");
    }
}
