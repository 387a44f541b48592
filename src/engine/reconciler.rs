use tracing::{error, info, instrument};

use crate::engine::EngineContext;
use crate::error::AppError;
use crate::models::order::{Order, OrderState, Owner};

/// Expires overdue PENDING orders whenever somebody reads an order list.
///
/// There is no timer. An order is only seen as EXPIRED once a list that
/// contains it has been read, and the read itself applies the change.
#[derive(Clone)]
pub struct ExpiryReconciler {
    ctx: EngineContext,
}

impl ExpiryReconciler {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// The courier's open orders (PENDING or ACCEPTED).
    #[instrument(skip(self))]
    pub async fn courier_orders(&self, courier_id: &str) -> Result<Vec<Order>, AppError> {
        let store = &self.ctx.ports.store;
        let orders = store
            .list_by_courier(courier_id)
            .await
            .map_err(|err| err.context("list courier orders"))?;

        let orders = if self.sweep(&orders).await > 0 {
            store
                .list_by_courier(courier_id)
                .await
                .map_err(|err| err.context("list courier orders"))?
        } else {
            orders
        };

        Ok(orders
            .into_iter()
            .filter(|order| !order.state.is_terminal())
            .collect())
    }

    /// Every order the restaurant has placed, in creation order.
    #[instrument(skip(self))]
    pub async fn restaurant_orders(&self, restaurant_id: &str) -> Result<Vec<Order>, AppError> {
        let store = &self.ctx.ports.store;
        let orders = store
            .list_by_restaurant(restaurant_id)
            .await
            .map_err(|err| err.context("list restaurant orders"))?;

        if self.sweep(&orders).await > 0 {
            return store
                .list_by_restaurant(restaurant_id)
                .await
                .map_err(|err| err.context("list restaurant orders"));
        }

        Ok(orders)
    }

    /// Expires every overdue order in `orders`. Returns how many were overdue.
    async fn sweep(&self, orders: &[Order]) -> usize {
        let now = self.ctx.ports.clock.now();
        let mut overdue = 0;

        for order in orders.iter().filter(|order| self.ctx.policy.is_overdue(order, now)) {
            overdue += 1;
            if let Err(err) = self.expire(order).await {
                error!(order_id = order.id, error = %err, "failed to expire order");
            }
        }

        overdue
    }

    /// Moves `order` from PENDING to EXPIRED and takes its courier out of
    /// rotation. Returns `false` when the order already left PENDING.
    pub(crate) async fn expire(&self, order: &Order) -> Result<bool, AppError> {
        let owner = Owner::Restaurant(order.restaurant_id.clone());
        let expired = self
            .ctx
            .ports
            .store
            .compare_and_set_state(order.id, &owner, &[OrderState::Pending], OrderState::Expired)
            .await;

        match expired {
            Ok(_) => {}
            Err(AppError::PreconditionFailed(_)) => return Ok(false),
            Err(err) => return Err(err.context("expire order")),
        }

        self.ctx.metrics.orders_expired_total.inc();
        self.ctx.record_transition(OrderState::Expired);
        info!(
            order_id = order.id,
            courier_id = order.courier_id.as_deref().unwrap_or_default(),
            "order expired without a courier response"
        );

        if let Some(courier_id) = order.courier_id.as_deref() {
            match self.ctx.ports.directory.deactivate_courier(courier_id).await {
                Ok(()) => {
                    self.ctx.metrics.couriers_deactivated_total.inc();
                    info!(courier_id, "courier deactivated after missed order");
                }
                Err(err) => {
                    error!(courier_id, error = %err, "failed to deactivate courier");
                }
            }
        }

        Ok(true)
    }
}
