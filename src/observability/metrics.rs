use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_dispatched_total: IntCounterVec,
    pub dispatch_latency_seconds: HistogramVec,
    pub order_transitions_total: IntCounterVec,
    pub orders_expired_total: IntCounter,
    pub couriers_deactivated_total: IntCounter,
    pub notifications_total: IntCounterVec,
    pub active_couriers: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_dispatched_total = IntCounterVec::new(
            Opts::new("orders_dispatched_total", "Dispatch attempts by outcome"),
            &["outcome"],
        )
        .expect("valid orders_dispatched_total metric");

        let dispatch_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "dispatch_latency_seconds",
                "Latency of courier selection and order creation in seconds",
            ),
            &["outcome"],
        )
        .expect("valid dispatch_latency_seconds metric");

        let order_transitions_total = IntCounterVec::new(
            Opts::new("order_transitions_total", "Order state transitions by target state"),
            &["state"],
        )
        .expect("valid order_transitions_total metric");

        let orders_expired_total =
            IntCounter::new("orders_expired_total", "Orders expired by the read-time sweep")
                .expect("valid orders_expired_total metric");

        let couriers_deactivated_total = IntCounter::new(
            "couriers_deactivated_total",
            "Couriers deactivated for letting an order expire",
        )
        .expect("valid couriers_deactivated_total metric");

        let notifications_total = IntCounterVec::new(
            Opts::new("notifications_total", "Notification deliveries by outcome"),
            &["outcome"],
        )
        .expect("valid notifications_total metric");

        let active_couriers = IntGauge::new("active_couriers", "Couriers currently accepting orders")
            .expect("valid active_couriers metric");

        registry
            .register(Box::new(orders_dispatched_total.clone()))
            .expect("register orders_dispatched_total");
        registry
            .register(Box::new(dispatch_latency_seconds.clone()))
            .expect("register dispatch_latency_seconds");
        registry
            .register(Box::new(order_transitions_total.clone()))
            .expect("register order_transitions_total");
        registry
            .register(Box::new(orders_expired_total.clone()))
            .expect("register orders_expired_total");
        registry
            .register(Box::new(couriers_deactivated_total.clone()))
            .expect("register couriers_deactivated_total");
        registry
            .register(Box::new(notifications_total.clone()))
            .expect("register notifications_total");
        registry
            .register(Box::new(active_couriers.clone()))
            .expect("register active_couriers");

        Self {
            registry,
            orders_dispatched_total,
            dispatch_latency_seconds,
            order_transitions_total,
            orders_expired_total,
            couriers_deactivated_total,
            notifications_total,
            active_couriers,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
