#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use courier_dispatch::clock::ManualClock;
use courier_dispatch::code::SeededCodes;
use courier_dispatch::engine::{
    Dispatcher, EngineContext, ExpiryReconciler, Lifecycle, Policy, Ports,
};
use courier_dispatch::error::AppError;
use courier_dispatch::geo::{GeoDirectory, InMemoryGeoDirectory};
use courier_dispatch::models::courier::GeoPoint;
use courier_dispatch::notify::Notifier;
use courier_dispatch::observability::metrics::Metrics;
use courier_dispatch::store::InMemoryOrderStore;

pub const CODE_SEED: u64 = 2024;

pub const RESTAURANT_AT: GeoPoint = GeoPoint {
    lat: 52.5200,
    lng: 13.4050,
};

/// A point `km_north` kilometres north of the restaurant.
pub fn north_of_restaurant(km_north: f64) -> GeoPoint {
    GeoPoint {
        lat: RESTAURANT_AT.lat + km_north / 111.195,
        lng: RESTAURANT_AT.lng,
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub target_id: String,
    pub title: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    failing: AtomicBool,
    attempts: AtomicUsize,
}

impl RecordingNotifier {
    pub fn fail_deliveries(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, target_id: &str) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|sent| sent.target_id == target_id)
            .collect()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, target_id: &str, title: &str, body: &str) -> Result<(), AppError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::DeliveryFailed(format!("push to {target_id} bounced")));
        }

        self.sent.lock().unwrap().push(Sent {
            target_id: target_id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<InMemoryOrderStore>,
    pub directory: Arc<InMemoryGeoDirectory>,
    pub notifier: Arc<RecordingNotifier>,
    pub metrics: Metrics,
    pub policy: Policy,
    pub dispatcher: Dispatcher,
    pub lifecycle: Lifecycle,
    pub reconciler: ExpiryReconciler,
}

pub fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(start_time()));
    let store = Arc::new(InMemoryOrderStore::new(clock.clone()));
    let directory = Arc::new(InMemoryGeoDirectory::new(clock.clone()));
    let notifier = Arc::new(RecordingNotifier::default());
    let metrics = Metrics::new();
    let policy = Policy::default();

    let ports = Ports {
        store: store.clone(),
        directory: directory.clone(),
        notifier: notifier.clone(),
        clock: clock.clone(),
        codes: Arc::new(SeededCodes::new(CODE_SEED)),
    };
    let ctx = EngineContext::new(ports, policy.clone(), metrics.clone());

    Harness {
        clock,
        store,
        directory,
        notifier,
        metrics,
        policy,
        dispatcher: Dispatcher::new(ctx.clone()),
        lifecycle: Lifecycle::new(ctx.clone()),
        reconciler: ExpiryReconciler::new(ctx),
    }
}

impl Harness {
    pub async fn restaurant(&self, id: &str) {
        self.directory
            .register_restaurant(id, RESTAURANT_AT)
            .await
            .unwrap();
    }

    /// Registers a courier and moves the clock one second on, so couriers
    /// registered later are later in line.
    pub async fn courier(&self, id: &str, km_from_restaurant: f64, radius_km: f64) {
        self.directory
            .register_courier(id, north_of_restaurant(km_from_restaurant), radius_km)
            .await
            .unwrap();
        self.clock.advance(chrono::Duration::seconds(1));
    }
}
