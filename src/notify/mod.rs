//! Backup notifications
//!
//! Notifications are best effort: the backup orchestrator logs a failed
//! notification and carries on.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::error::{DbsnapError, DbsnapResult};
use crate::models::{ObjectKey, SnapshotTimestamp};

/// Timeout for a single webhook call
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Payload sent after a successful backup
#[derive(Debug, Clone, Serialize)]
pub struct BackupEvent {
    /// Always `backup.completed`
    pub event: &'static str,
    /// Key of the uploaded object
    pub key: ObjectKey,
    /// Snapshot timestamp
    pub timestamp: SnapshotTimestamp,
    /// Whether the uploaded object is encrypted
    pub encrypted: bool,
    /// Uploaded size in bytes
    pub size_bytes: u64,
}

impl BackupEvent {
    /// Event for a completed backup
    pub fn completed(key: ObjectKey, timestamp: SnapshotTimestamp, encrypted: bool, size_bytes: u64) -> Self {
        Self {
            event: "backup.completed",
            key,
            timestamp,
            encrypted,
            size_bytes,
        }
    }
}

/// Receiver of backup events
pub trait Notifier {
    /// Deliver one event; failures are reported as `Notification`
    fn notify(&self, event: &BackupEvent) -> DbsnapResult<()>;
}

/// Posts backup events as JSON to a webhook URL
pub struct WebhookNotifier {
    url: String,
    client: reqwest::blocking::Client,
}

impl WebhookNotifier {
    /// Create a notifier for `url`
    pub fn new(url: impl Into<String>) -> DbsnapResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| DbsnapError::Notification(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Get the webhook URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, event: &BackupEvent) -> DbsnapResult<()> {
        debug!(url = %self.url, key = %event.key, "calling webhook");
        self.client
            .post(&self.url)
            .json(event)
            .send()
            .and_then(|response| response.error_for_status())
            .map(|_| ())
            .map_err(|e| DbsnapError::Notification(format!("Webhook {} failed: {}", self.url, e)))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KeyPrefix;

    fn event() -> BackupEvent {
        let ts = SnapshotTimestamp::parse("20250102030405").unwrap();
        BackupEvent::completed(KeyPrefix::new("db").object_key(&ts), ts, true, 4096)
    }

    #[test]
    fn test_event_payload() {
        let json = serde_json::to_value(event()).unwrap();
        assert_eq!(json["event"], "backup.completed");
        assert_eq!(json["key"], "db/20250102030405.bak");
        assert_eq!(json["timestamp"], "20250102030405");
        assert_eq!(json["encrypted"], true);
        assert_eq!(json["size_bytes"], 4096);
    }

    #[test]
    fn test_server_error_is_notification_error() {
        let url = test_server::respond_once("HTTP/1.1 500 Internal Server Error");
        let notifier = WebhookNotifier::new(url).unwrap();

        let err = notifier.notify(&event()).unwrap_err();
        assert!(matches!(err, DbsnapError::Notification(_)));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_success_status() {
        let url = test_server::respond_once("HTTP/1.1 204 No Content");
        let notifier = WebhookNotifier::new(url).unwrap();

        notifier.notify(&event()).unwrap();
    }

    #[test]
    fn test_unreachable_webhook_is_notification_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/hook").unwrap();
        let err = notifier.notify(&event()).unwrap_err();
        assert!(matches!(err, DbsnapError::Notification(_)));
        assert!(err.to_string().contains("127.0.0.1:9"));
    }
}
