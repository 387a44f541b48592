use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::code::{CodeSource, SeededCodes, ThreadRngCodes};
use crate::config::Config;
use crate::engine::{Dispatcher, EngineContext, ExpiryReconciler, Lifecycle, Policy, Ports};
use crate::geo::{GeoDirectory, InMemoryGeoDirectory};
use crate::notify::BroadcastNotifier;
use crate::observability::metrics::Metrics;
use crate::store::{InMemoryOrderStore, OrderStore};

pub struct AppState {
    pub dispatcher: Dispatcher,
    pub lifecycle: Lifecycle,
    pub reconciler: ExpiryReconciler,
    pub directory: Arc<dyn GeoDirectory>,
    pub notifications: Arc<BroadcastNotifier>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self::in_memory(config, Arc::new(SystemClock))
    }

    /// In-process store, directory and notifier on the given clock.
    pub fn in_memory(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let codes: Arc<dyn CodeSource> = match config.code_seed {
            Some(seed) => Arc::new(SeededCodes::new(seed)),
            None => Arc::new(ThreadRngCodes),
        };
        let store: Arc<dyn OrderStore> = Arc::new(InMemoryOrderStore::new(clock.clone()));
        let directory: Arc<dyn GeoDirectory> = Arc::new(InMemoryGeoDirectory::new(clock.clone()));
        let notifications = Arc::new(BroadcastNotifier::new(config.notification_buffer_size));

        let ports = Ports {
            store,
            directory,
            notifier: notifications.clone(),
            clock,
            codes,
        };

        Self::from_parts(ports, Policy::from_config(config), notifications)
    }

    pub fn from_parts(
        ports: Ports,
        policy: Policy,
        notifications: Arc<BroadcastNotifier>,
    ) -> Self {
        let metrics = Metrics::new();
        let directory = ports.directory.clone();
        let ctx = EngineContext::new(ports, policy, metrics.clone());

        Self {
            dispatcher: Dispatcher::new(ctx.clone()),
            lifecycle: Lifecycle::new(ctx.clone()),
            reconciler: ExpiryReconciler::new(ctx),
            directory,
            notifications,
            metrics,
        }
    }
}
