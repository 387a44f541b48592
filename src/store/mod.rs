//! Durable record of orders.
//!
//! Every state change goes through [`OrderStore::compare_and_set_state`], which
//! checks ownership and the current state and writes in one step per order.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::clock::Clock;
use crate::error::AppError;
use crate::models::order::{NewOrder, Order, OrderId, OrderState, Owner};

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new PENDING order, assigning its id and timestamps.
    async fn insert(&self, order: NewOrder) -> Result<Order, AppError>;

    /// Fails with `NotFound` when the order is missing or not owned by `owner`.
    async fn get(&self, order_id: OrderId, owner: &Owner) -> Result<Order, AppError>;

    async fn list_by_courier(&self, courier_id: &str) -> Result<Vec<Order>, AppError>;

    async fn list_by_restaurant(&self, restaurant_id: &str) -> Result<Vec<Order>, AppError>;

    /// Moves the order to `next` if `owner` owns it and its current state is
    /// one of `expected`. Returns the updated order.
    async fn compare_and_set_state(
        &self,
        order_id: OrderId,
        owner: &Owner,
        expected: &[OrderState],
        next: OrderState,
    ) -> Result<Order, AppError>;

    /// Administrative removal. Actors never delete orders.
    async fn delete(&self, order_id: OrderId) -> Result<(), AppError>;
}

pub struct InMemoryOrderStore {
    orders: DashMap<OrderId, Order>,
    next_id: AtomicI64,
    clock: Arc<dyn Clock>,
}

impl InMemoryOrderStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            orders: DashMap::new(),
            next_id: AtomicI64::new(1),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    fn collect_where<F>(&self, keep: F) -> Vec<Order>
    where
        F: Fn(&Order) -> bool,
    {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by_key(|order| order.id);
        orders
    }
}

fn not_found(order_id: OrderId, owner: &Owner) -> AppError {
    AppError::NotFound(format!("order {order_id} not found for {owner}"))
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order, AppError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let now = self.clock.now();

        let order = Order {
            id,
            courier_id: Some(order.courier_id),
            restaurant_id: order.restaurant_id,
            code: order.code,
            description: order.description,
            state: OrderState::Pending,
            created_at: now,
            updated_at: now,
        };

        self.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn get(&self, order_id: OrderId, owner: &Owner) -> Result<Order, AppError> {
        self.orders
            .get(&order_id)
            .filter(|order| owner.owns(order))
            .map(|order| order.clone())
            .ok_or_else(|| not_found(order_id, owner))
    }

    async fn list_by_courier(&self, courier_id: &str) -> Result<Vec<Order>, AppError> {
        Ok(self.collect_where(|order| order.courier_id.as_deref() == Some(courier_id)))
    }

    async fn list_by_restaurant(&self, restaurant_id: &str) -> Result<Vec<Order>, AppError> {
        Ok(self.collect_where(|order| order.restaurant_id == restaurant_id))
    }

    async fn compare_and_set_state(
        &self,
        order_id: OrderId,
        owner: &Owner,
        expected: &[OrderState],
        next: OrderState,
    ) -> Result<Order, AppError> {
        let mut order = self
            .orders
            .get_mut(&order_id)
            .filter(|order| owner.owns(order))
            .ok_or_else(|| not_found(order_id, owner))?;

        if !expected.contains(&order.state) {
            return Err(AppError::PreconditionFailed(format!(
                "order {order_id} is {}, cannot move to {next}",
                order.state
            )));
        }
        if !order.state.can_transition_to(next) {
            return Err(AppError::PreconditionFailed(format!(
                "order {order_id} cannot move from {} to {next}",
                order.state
            )));
        }

        order.state = next;
        order.updated_at = self.clock.now();
        Ok(order.clone())
    }

    async fn delete(&self, order_id: OrderId) -> Result<(), AppError> {
        self.orders
            .remove(&order_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))
    }
}
