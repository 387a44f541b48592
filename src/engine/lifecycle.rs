//! Order state machine.
//!
//! ```text
//! PENDING ──accept──▶ ACCEPTED ──fulfill──▶ FULFILLED
//!    │                    │
//!    ├──reject──▶ REJECTED └──cancel──▶ CANCELLED
//!    └──expire──▶ EXPIRED
//! ```
//!
//! Couriers act on orders assigned to them, restaurants on orders they
//! placed. Every transition is a single conditional write, so a caller that
//! loses a race gets `PreconditionFailed` rather than a silent no-op.

use tracing::{info, instrument, warn};

use crate::engine::reconciler::ExpiryReconciler;
use crate::engine::EngineContext;
use crate::error::AppError;
use crate::models::order::{Order, OrderId, OrderState, Owner};

const CLOSE_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct Lifecycle {
    ctx: EngineContext,
}

impl Lifecycle {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self))]
    pub async fn accept_order(&self, order_id: OrderId, courier_id: &str) -> Result<Order, AppError> {
        self.courier_transition(order_id, courier_id, OrderState::Accepted)
            .await
            .map_err(|err| err.context("accept order"))
    }

    #[instrument(skip(self))]
    pub async fn reject_order(&self, order_id: OrderId, courier_id: &str) -> Result<Order, AppError> {
        self.courier_transition(order_id, courier_id, OrderState::Rejected)
            .await
            .map_err(|err| err.context("reject order"))
    }

    #[instrument(skip(self))]
    pub async fn fulfill_order(
        &self,
        order_id: OrderId,
        restaurant_id: &str,
    ) -> Result<Order, AppError> {
        let owner = Owner::Restaurant(restaurant_id.to_string());
        let order = self
            .transition(order_id, &owner, &[OrderState::Accepted], OrderState::Fulfilled)
            .await
            .map_err(|err| err.context("fulfill order"))?;

        info!(order_id, restaurant_id, "order fulfilled");
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        restaurant_id: &str,
    ) -> Result<Order, AppError> {
        let owner = Owner::Restaurant(restaurant_id.to_string());
        let order = self
            .transition(order_id, &owner, &[OrderState::Accepted], OrderState::Cancelled)
            .await
            .map_err(|err| err.context("cancel order"))?;

        info!(order_id, restaurant_id, "order cancelled");
        self.notify_cancelled(&order).await;
        Ok(order)
    }

    /// Closes an order so it can be dispatched again.
    ///
    /// PENDING becomes EXPIRED and ACCEPTED becomes CANCELLED. A PENDING order
    /// already past its deadline is expired the same way a list read would,
    /// which also takes its courier out of rotation. Orders that are
    /// already REJECTED or EXPIRED are returned as they are. FULFILLED and
    /// CANCELLED orders cannot be reopened.
    #[instrument(skip(self))]
    pub async fn close_order(
        &self,
        order_id: OrderId,
        restaurant_id: &str,
    ) -> Result<Order, AppError> {
        let owner = Owner::Restaurant(restaurant_id.to_string());

        for _ in 0..CLOSE_ATTEMPTS {
            let order = self
                .ctx
                .ports
                .store
                .get(order_id, &owner)
                .await
                .map_err(|err| err.context("close order"))?;

            let closed = match order.state {
                OrderState::Rejected | OrderState::Expired => return Ok(order),
                OrderState::Fulfilled | OrderState::Cancelled => {
                    return Err(AppError::PreconditionFailed(format!(
                        "close order: order {order_id} is {} and cannot be reassigned",
                        order.state
                    )));
                }
                OrderState::Pending
                    if self.ctx.policy.is_overdue(&order, self.ctx.ports.clock.now()) =>
                {
                    // Past the deadline this is a missed order, not an early close.
                    ExpiryReconciler::new(self.ctx.clone())
                        .expire(&order)
                        .await
                        .map_err(|err| err.context("close order"))?;
                    continue;
                }
                OrderState::Pending => {
                    self.transition(order_id, &owner, &[OrderState::Pending], OrderState::Expired)
                        .await
                }
                OrderState::Accepted => {
                    self.transition(order_id, &owner, &[OrderState::Accepted], OrderState::Cancelled)
                        .await
                }
            };

            match closed {
                Ok(closed) => {
                    if closed.state == OrderState::Cancelled {
                        self.notify_cancelled(&closed).await;
                    }
                    info!(order_id, restaurant_id, state = %closed.state, "order closed");
                    return Ok(closed);
                }
                // The courier acted between our read and write; look again.
                Err(AppError::PreconditionFailed(_)) => continue,
                Err(err) => return Err(err.context("close order")),
            }
        }

        Err(AppError::PreconditionFailed(format!(
            "close order: order {order_id} kept changing state"
        )))
    }

    async fn courier_transition(
        &self,
        order_id: OrderId,
        courier_id: &str,
        next: OrderState,
    ) -> Result<Order, AppError> {
        let owner = Owner::Courier(courier_id.to_string());
        let current = self.ctx.ports.store.get(order_id, &owner).await?;

        // A late answer must not win over the deadline, even if no list read
        // has swept the order yet.
        if self.ctx.policy.is_overdue(&current, self.ctx.ports.clock.now()) {
            ExpiryReconciler::new(self.ctx.clone()).expire(&current).await?;
            warn!(order_id, courier_id, "courier answered after the deadline");
            return Err(AppError::PreconditionFailed(format!(
                "order {order_id} expired before it was answered"
            )));
        }

        let order = self
            .transition(order_id, &owner, &[OrderState::Pending], next)
            .await?;
        info!(order_id, courier_id, state = %order.state, "courier answered order");
        Ok(order)
    }

    async fn transition(
        &self,
        order_id: OrderId,
        owner: &Owner,
        expected: &[OrderState],
        next: OrderState,
    ) -> Result<Order, AppError> {
        let order = self
            .ctx
            .ports
            .store
            .compare_and_set_state(order_id, owner, expected, next)
            .await?;
        self.ctx.record_transition(next);
        Ok(order)
    }

    async fn notify_cancelled(&self, order: &Order) {
        if let Some(courier_id) = order.courier_id.as_deref() {
            let body = format!("Order #{} ({}) was cancelled by the restaurant", order.id, order.code);
            self.ctx.deliver(courier_id, "Order cancelled", &body).await;
        }
    }
}
