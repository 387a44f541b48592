pub mod dispatcher;
pub mod lifecycle;
pub mod reconciler;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::clock::Clock;
use crate::code::CodeSource;
use crate::config::Config;
use crate::geo::GeoDirectory;
use crate::models::order::{Order, OrderState};
use crate::notify::Notifier;
use crate::observability::metrics::Metrics;
use crate::store::OrderStore;

pub use dispatcher::Dispatcher;
pub use lifecycle::Lifecycle;
pub use reconciler::ExpiryReconciler;

/// Everything the engine talks to outside itself.
#[derive(Clone)]
pub struct Ports {
    pub store: Arc<dyn OrderStore>,
    pub directory: Arc<dyn GeoDirectory>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub codes: Arc<dyn CodeSource>,
}

#[derive(Debug, Clone)]
pub struct Policy {
    /// How long an order may sit in PENDING before it expires.
    pub order_expiry: Duration,
    pub notify_attempts: u32,
}

impl Policy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            order_expiry: config.order_expiry(),
            notify_attempts: config.notify_attempts,
        }
    }

    pub fn is_overdue(&self, order: &Order, now: DateTime<Utc>) -> bool {
        order.state == OrderState::Pending && order.created_at + self.order_expiry < now
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Clone)]
pub struct EngineContext {
    pub ports: Ports,
    pub policy: Policy,
    pub metrics: Metrics,
}

impl EngineContext {
    pub fn new(ports: Ports, policy: Policy, metrics: Metrics) -> Self {
        Self {
            ports,
            policy,
            metrics,
        }
    }

    /// Delivers a push message, retrying up to the configured number of
    /// attempts. Failure is logged and counted, never returned.
    pub(crate) async fn deliver(&self, target_id: &str, title: &str, body: &str) -> bool {
        let attempts = self.policy.notify_attempts.max(1);

        for attempt in 1..=attempts {
            match self.ports.notifier.notify(target_id, title, body).await {
                Ok(()) => {
                    self.metrics
                        .notifications_total
                        .with_label_values(&["delivered"])
                        .inc();
                    return true;
                }
                Err(err) if attempt < attempts => {
                    warn!(target_id, attempt, error = %err, "notification attempt failed; retrying");
                    tokio::time::sleep(std::time::Duration::from_millis(25 * attempt as u64)).await;
                }
                Err(err) => {
                    warn!(target_id, attempts, error = %err, "notification dropped");
                }
            }
        }

        self.metrics
            .notifications_total
            .with_label_values(&["failed"])
            .inc();
        false
    }

    pub(crate) fn record_transition(&self, state: OrderState) {
        self.metrics
            .order_transitions_total
            .with_label_values(&[state.as_str()])
            .inc();
    }
}
