use std::time::Instant;

use tracing::{info, instrument, warn};

use crate::engine::lifecycle::Lifecycle;
use crate::engine::EngineContext;
use crate::error::AppError;
use crate::models::order::{NewOrder, Order, OrderId, Owner};

/// Creates orders and hands each one to the eligible courier that has waited
/// longest for work.
#[derive(Clone)]
pub struct Dispatcher {
    ctx: EngineContext,
    lifecycle: Lifecycle,
}

impl Dispatcher {
    pub fn new(ctx: EngineContext) -> Self {
        let lifecycle = Lifecycle::new(ctx.clone());
        Self { ctx, lifecycle }
    }

    #[instrument(skip(self, description))]
    pub async fn create_order(
        &self,
        restaurant_id: &str,
        description: Option<String>,
    ) -> Result<Order, AppError> {
        let start = Instant::now();
        let result = self.dispatch(restaurant_id, description).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(AppError::NoCourierAvailable) => "no_courier",
            Err(_) => "error",
        };
        self.ctx
            .metrics
            .dispatch_latency_seconds
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());
        self.ctx
            .metrics
            .orders_dispatched_total
            .with_label_values(&[outcome])
            .inc();

        if let Err(err) = &result {
            warn!(restaurant_id, error = %err, "order not dispatched");
        }
        result
    }

    /// Closes the order and dispatches a fresh copy of it to the next courier
    /// in line. The closed order stays behind as history.
    #[instrument(skip(self))]
    pub async fn reassign_order(
        &self,
        order_id: OrderId,
        restaurant_id: &str,
    ) -> Result<Order, AppError> {
        self.lifecycle
            .close_order(order_id, restaurant_id)
            .await
            .map_err(|err| err.context("reassign order"))?;

        let previous = self
            .ctx
            .ports
            .store
            .get(order_id, &Owner::Restaurant(restaurant_id.to_string()))
            .await
            .map_err(|err| err.context("reassign order"))?;

        let order = self
            .create_order(restaurant_id, previous.description.clone())
            .await
            .map_err(|err| err.context("reassign order"))?;

        info!(
            previous_order_id = previous.id,
            order_id = order.id,
            previous_courier_id = previous.courier_id.as_deref().unwrap_or_default(),
            courier_id = order.courier_id.as_deref().unwrap_or_default(),
            "order reassigned"
        );
        Ok(order)
    }

    async fn dispatch(
        &self,
        restaurant_id: &str,
        description: Option<String>,
    ) -> Result<Order, AppError> {
        let ports = &self.ctx.ports;
        let code = ports.codes.next_code();

        let location = ports
            .directory
            .restaurant_location(restaurant_id)
            .await
            .map_err(|err| err.context("create order"))?;

        // Selection and the fairness-key bump happen together in the directory.
        let courier_id = ports
            .directory
            .claim_eligible_courier(location, ports.clock.now())
            .await
            .map_err(|err| err.context("create order"))?
            .ok_or(AppError::NoCourierAvailable)?;

        let order = ports
            .store
            .insert(NewOrder {
                courier_id: courier_id.clone(),
                restaurant_id: restaurant_id.to_string(),
                code,
                description,
            })
            .await
            .map_err(|err| err.context("create order"))?;

        ports
            .directory
            .advance_courier_service(&courier_id, order.created_at)
            .await
            .map_err(|err| err.context("create order"))?;

        info!(
            order_id = order.id,
            courier_id = %courier_id,
            restaurant_id,
            code = %order.code,
            "order dispatched"
        );

        let body = format!("Order #{} from {} is waiting for you", order.id, restaurant_id);
        self.ctx.deliver(&courier_id, "New order", &body).await;

        Ok(order)
    }
}
