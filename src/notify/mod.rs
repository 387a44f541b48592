use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub target_id: String,
    pub title: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

/// Push channel to couriers and restaurants.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, target_id: &str, title: &str, body: &str) -> Result<(), AppError>;
}

/// Fans notifications out to in-process subscribers, such as websocket sessions.
///
/// Delivery is judged per channel, not per target. A send succeeds when any
/// subscriber is attached, and each subscriber filters on `target_id` itself,
/// so success does not mean the target was listening. `DeliveryFailed` only
/// means nobody at all was subscribed, which the engine retries up to
/// `NOTIFY_ATTEMPTS` times with backoff before dropping the notice.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _unused_rx) = broadcast::channel(buffer_size.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn notify(&self, target_id: &str, title: &str, body: &str) -> Result<(), AppError> {
        let notification = Notification {
            target_id: target_id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            sent_at: Utc::now(),
        };

        let receivers = self
            .tx
            .send(notification)
            .map_err(|_| AppError::DeliveryFailed(format!("no listener for {target_id}")))?;

        debug!(target_id, receivers, "notification published");
        Ok(())
    }
}
